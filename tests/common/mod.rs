#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicI64, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use trip_planner_bot::{
    error::{GenerationError, TransportError},
    message::{Command, InboundEvent, Keyboard},
    services::{
        analytics::AnalyticsTracker, chatbot::ConversationController, llm::CompletionModel,
        session_manager::SessionManager, telegram::ChatTransport,
    },
};

#[derive(Debug, Clone)]
pub struct Sent {
    pub message_id: i64,
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

#[derive(Debug, Clone)]
pub struct Edit {
    pub message_id: i64,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

/// Chat transport that records every call instead of talking to a platform.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<Sent>>,
    pub edits: Mutex<Vec<Edit>>,
    pub deleted: Mutex<Vec<i64>>,
    pub callbacks: Mutex<Vec<(String, Option<String>)>>,
    next_id: AtomicI64,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|s| s.text).collect()
    }

    pub fn last_sent(&self) -> Sent {
        self.sent().last().cloned().expect("nothing was sent")
    }

    pub fn edits(&self) -> Vec<Edit> {
        self.edits.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
        self.edits.lock().unwrap().clear();
        self.deleted.lock().unwrap().clear();
        self.callbacks.lock().unwrap().clear();
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<i64, TransportError> {
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.sent.lock().unwrap().push(Sent {
            message_id,
            chat_id,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(message_id)
    }

    async fn edit_message(
        &self,
        _chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError> {
        self.edits.lock().unwrap().push(Edit {
            message_id,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn delete_message(&self, _chat_id: i64, message_id: i64) -> Result<(), TransportError> {
        self.deleted.lock().unwrap().push(message_id);
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<(), TransportError> {
        self.callbacks
            .lock()
            .unwrap()
            .push((callback_id.to_string(), text.map(str::to_string)));
        Ok(())
    }
}

/// Model that returns a fixed reply, or fails when none is set.
pub struct ScriptedModel {
    reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().ok_or(GenerationError::Status {
            status: 503,
            body: "overloaded".to_string(),
        })
    }
}

pub const MODEL_REPLY: &str = r#"Sure! Here is your itinerary:
{
  "title": "Bangkok Food & Temples",
  "highlights": ["Street food in Chinatown", "Sunrise at Wat Arun", "Chao Phraya boat ride"],
  "bestTimeToVisit": "July is rainy season, expect short afternoon showers.",
  "transportation": "Fly into BKK, then use the BTS Skytrain and river boats.",
  "dailyPlan": [
    "Day 1: Grand Palace and Wat Pho",
    "Day 2: Chinatown food tour",
    "Day 3: Floating market day trip",
    "Day 4: Chatuchak weekend market",
    "Day 5: Spa and departure"
  ],
  "locations": ["Wat Arun", "Grand Palace"],
  "budget": {
    "accommodation": 400,
    "food": "150 USD",
    "activities": "200 USD",
    "transportation": "100 USD",
    "miscellaneous": "50 USD",
    "total": "900 USD",
    "insufficientBudget": true
  }
}
Have a great trip!"#;

pub fn fixed_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

pub struct Harness {
    pub controller: Arc<ConversationController>,
    pub transport: Arc<RecordingTransport>,
    pub model: Arc<ScriptedModel>,
}

impl Harness {
    pub fn new(model: ScriptedModel) -> Self {
        let transport = Arc::new(RecordingTransport::default());
        let model = Arc::new(model);
        let controller = ConversationController::new(
            SessionManager::new(Duration::from_secs(60)),
            transport.clone(),
            model.clone(),
            AnalyticsTracker::new(),
            "1844104",
        )
        .with_today(fixed_today);
        Self {
            controller: Arc::new(controller),
            transport,
            model,
        }
    }

    pub async fn command(&self, chat_id: i64, command: Command) {
        self.controller
            .handle_event(InboundEvent::Command { chat_id, command })
            .await;
    }

    pub async fn text(&self, chat_id: i64, text: &str) {
        self.controller
            .handle_event(InboundEvent::Text {
                chat_id,
                text: text.to_string(),
            })
            .await;
    }

    /// Click `payload` on the most recent message sent to the chat.
    pub async fn click(&self, chat_id: i64, payload: &str) {
        let message_id = self
            .transport
            .sent()
            .iter()
            .rev()
            .find(|s| s.chat_id == chat_id)
            .map(|s| s.message_id)
            .unwrap_or(0);
        self.controller
            .handle_event(InboundEvent::Button {
                chat_id,
                message_id,
                callback_id: format!("cb-{payload}"),
                payload: payload.to_string(),
            })
            .await;
    }

    /// Walk the Bangkok example up to (not including) the confirmation answer.
    pub async fn answer_until_confirmation(&self, chat_id: i64) {
        self.command(chat_id, Command::Plan).await;
        self.text(chat_id, "Bangkok").await;
        self.click(chat_id, "duration_5").await;
        self.click(chat_id, "month_7").await;
        self.click(chat_id, "style_food").await;
        self.click(chat_id, "style_culture").await;
        self.click(chat_id, "style_done").await;
        self.text(chat_id, "Singapore").await;
        self.click(chat_id, "currency_USD").await;
        self.text(chat_id, "2").await;
        self.click(chat_id, "kids_0").await;
        self.click(chat_id, "luxury_4").await;
        self.text(chat_id, "$1,500").await;
    }
}
