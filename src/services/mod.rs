pub mod affiliate;
pub mod analytics;
pub mod chatbot;
pub mod dispatch;
pub mod flow;
pub mod itinerary;
pub mod llm;
pub mod prompt;
pub mod session_manager;
pub mod telegram;
