// src/error.rs
use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Startup configuration problems. Any of these aborts the process before it
/// serves traffic.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// A user's answer failed the local check for the current question. The
/// message is shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    #[error("Please type an answer.")]
    Empty,
    #[error("Please enter a number.")]
    NotANumber,
    #[error("Please enter a number between {min} and {max}.")]
    OutOfRange { min: i64, max: i64 },
    #[error("Please pick one of the options below.")]
    UnknownOption,
    #[error("Please enter a three-letter currency code such as USD.")]
    InvalidCurrency,
    #[error("Please enter a positive amount, or tap Skip.")]
    InvalidBudget,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion request timed out after {0:?}")]
    Timeout(Duration),
    #[error("completion reply had no content")]
    EmptyReply,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no JSON object found in reply")]
    NoJsonObject,
    #[error("reply contains invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("chat platform request failed: {0}")]
    Request(#[from] teloxide::RequestError),
    #[error("message id {0} is out of range")]
    MessageId(i64),
    #[error("invalid webhook url {0:?}")]
    WebhookUrl(String),
}

/// Errors surfaced by the HTTP routes.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
}

#[derive(Serialize)]
struct ErrorPayload {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        };
        let payload = ErrorPayload {
            error: self.to_string(),
        };
        (status, Json(payload)).into_response()
    }
}
