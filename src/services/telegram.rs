// src/services/telegram.rs
use std::sync::Arc;

use async_trait::async_trait;
use teloxide::{
    dispatching::{Dispatcher, UpdateHandler},
    dptree,
    payloads::{
        AnswerCallbackQuerySetters, EditMessageTextSetters, SendMessageSetters, SetWebhookSetters,
    },
    prelude::{Requester, respond},
    types::{AllowedUpdate, ChatId, InlineKeyboardMarkup, MessageId, ParseMode, Update},
    utils::command::BotCommands,
    Bot, RequestError,
};
use tracing::info;

use crate::{
    error::TransportError,
    message::{Command, Keyboard},
    services::chatbot::ConversationController,
};

/// Outbound side of the chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send an HTML message and return its id.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<i64, TransportError>;

    /// Replace the text (and keyboard) of a message the bot sent earlier.
    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), TransportError>;

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<(), TransportError>;
}

fn to_message_id(id: i64) -> Result<MessageId, TransportError> {
    i32::try_from(id)
        .map(MessageId)
        .map_err(|_| TransportError::MessageId(id))
}

/// `ChatTransport` backed by a teloxide `Bot`.
#[derive(Debug, Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<i64, TransportError> {
        let mut request = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(InlineKeyboardMarkup::from(keyboard));
        }
        let sent = request.await?;
        Ok(i64::from(sent.id.0))
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError> {
        let mut request = self
            .bot
            .edit_message_text(ChatId(chat_id), to_message_id(message_id)?, text)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(InlineKeyboardMarkup::from(keyboard));
        }
        request.await?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), TransportError> {
        self.bot
            .delete_message(ChatId(chat_id), to_message_id(message_id)?)
            .await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<(), TransportError> {
        let mut request = self.bot.answer_callback_query(callback_id.to_string());
        if let Some(text) = text {
            request = request.text(text);
        }
        request.await?;
        Ok(())
    }
}

/// Register the command menu shown by Telegram clients.
pub async fn register_commands(bot: &Bot) -> Result<(), TransportError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}

/// Point Telegram at `url`, optionally requiring `secret` on every delivery.
pub async fn register_webhook(bot: &Bot, url: &str, secret: Option<&str>) -> Result<(), TransportError> {
    let url = url
        .parse()
        .map_err(|_| TransportError::WebhookUrl(url.to_string()))?;
    let mut request = bot
        .set_webhook(url)
        .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery]);
    if let Some(secret) = secret {
        request = request.secret_token(secret);
    }
    request.await?;
    Ok(())
}

fn update_handler() -> UpdateHandler<RequestError> {
    dptree::endpoint(|update: Update, controller: Arc<ConversationController>| async move {
        controller.handle_update(update).await;
        respond(())
    })
}

/// Long-poll for updates until the process exits. The dispatcher runs one
/// worker per chat, so a chat's updates are handled in arrival order.
pub async fn run_polling(bot: Bot, controller: Arc<ConversationController>) {
    info!("polling for updates");
    Dispatcher::builder(bot, update_handler())
        .dependencies(dptree::deps![controller])
        .build()
        .dispatch()
        .await;
}
