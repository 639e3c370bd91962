// src/message.rs
use teloxide::{
    types::{CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Message, Update, UpdateKind},
    utils::command::BotCommands,
};

#[derive(BotCommands, Debug, Clone, Copy, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "I can plan a trip for you.")]
pub enum Command {
    #[command(description = "show the welcome message and start planning")]
    Start,
    #[command(description = "start planning a new trip")]
    Plan,
    #[command(description = "show this message")]
    Help,
    #[command(description = "stop the current plan")]
    Cancel,
    #[command(hide)]
    Unknown,
}

/// Parse a slash command, tolerating `@BotName` suffixes and arguments.
/// Unrecognised commands map to `Command::Unknown`.
pub fn parse_command(text: &str) -> Option<Command> {
    let word = text.split_whitespace().next()?;
    if !word.starts_with('/') {
        return None;
    }
    let name = word.split('@').next().unwrap_or(word).to_ascii_lowercase();
    Some(Command::parse(&name, "").unwrap_or(Command::Unknown))
}

/// What the controller reacts to, stripped of transport details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Command {
        chat_id: i64,
        command: Command,
    },
    Text {
        chat_id: i64,
        text: String,
    },
    Button {
        chat_id: i64,
        message_id: i64,
        callback_id: String,
        payload: String,
    },
}

impl InboundEvent {
    pub fn chat_id(&self) -> i64 {
        match self {
            Self::Command { chat_id, .. } | Self::Text { chat_id, .. } | Self::Button { chat_id, .. } => {
                *chat_id
            }
        }
    }
}

/// Updates without text or callback data (stickers, joins, ...) yield `None`.
pub fn event_from_update(update: Update) -> Option<InboundEvent> {
    match update.kind {
        UpdateKind::Message(message) => event_from_message(&message),
        UpdateKind::CallbackQuery(query) => event_from_callback(query),
        _ => None,
    }
}

fn event_from_message(message: &Message) -> Option<InboundEvent> {
    let text = message.text()?;
    let chat_id = message.chat.id.0;
    Some(match parse_command(text) {
        Some(command) => InboundEvent::Command { chat_id, command },
        None => InboundEvent::Text {
            chat_id,
            text: text.to_string(),
        },
    })
}

fn event_from_callback(query: CallbackQuery) -> Option<InboundEvent> {
    let message = query.message.as_ref()?;
    Some(InboundEvent::Button {
        chat_id: message.chat().id.0,
        message_id: i64::from(message.id().0),
        callback_id: query.id,
        payload: query.data.unwrap_or_default(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// Inline button grid attached to an outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

impl From<&Keyboard> for InlineKeyboardMarkup {
    fn from(keyboard: &Keyboard) -> Self {
        InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
            row.iter()
                .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.payload.clone()))
                .collect::<Vec<_>>()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(value: serde_json::Value) -> Update {
        // teloxide's `Update` only deserializes correctly from text, not from a `Value`.
        serde_json::from_str(&value.to_string()).unwrap()
    }

    #[test]
    fn parses_commands_with_bot_suffix() {
        assert_eq!(parse_command("/plan@TripBot"), Some(Command::Plan));
        assert_eq!(parse_command(" /START now"), Some(Command::Start));
        assert_eq!(parse_command("/weather"), Some(Command::Unknown));
        assert_eq!(parse_command("Bangkok"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn help_lists_visible_commands_only() {
        let help = Command::descriptions().to_string();
        assert!(help.contains("/plan"));
        assert!(help.contains("/cancel"));
        assert!(!help.contains("/unknown"));
    }

    #[test]
    fn text_message_becomes_event() {
        let update = update(json!({
            "update_id": 10,
            "message": {
                "message_id": 1,
                "date": 1700000000,
                "chat": { "id": 42, "type": "private", "first_name": "Ann" },
                "text": "/plan"
            }
        }));
        assert_eq!(
            event_from_update(update),
            Some(InboundEvent::Command {
                chat_id: 42,
                command: Command::Plan,
            })
        );
    }

    #[test]
    fn keyboard_converts_to_inline_markup() {
        let keyboard = Keyboard::new(vec![vec![Button::new("5 days", "duration_5")]]);
        let markup = serde_json::to_value(InlineKeyboardMarkup::from(&keyboard)).unwrap();
        let button = &markup["inline_keyboard"][0][0];
        assert_eq!(button["text"], "5 days");
        assert_eq!(button["callback_data"], "duration_5");
    }
}
