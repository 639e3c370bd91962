// src/state.rs
use std::sync::Arc;

use crate::services::{
    chatbot::ConversationController,
    dispatch::{ChatQueue, DEFAULT_WORKER_IDLE},
};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub controller: Arc<ConversationController>,
    /// Orders webhook deliveries per chat.
    pub queue: ChatQueue,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` header, when configured.
    pub webhook_secret: Option<String>,
    /// Key for `/admin` routes. Unset means the routes always refuse.
    pub admin_key: Option<String>,
}

impl AppState {
    pub fn new(
        controller: Arc<ConversationController>,
        webhook_secret: Option<String>,
        admin_key: Option<String>,
    ) -> Self {
        Self {
            queue: ChatQueue::new(controller.clone(), DEFAULT_WORKER_IDLE),
            controller,
            webhook_secret,
            admin_key,
        }
    }
}
