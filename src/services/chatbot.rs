// src/services/chatbot.rs
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use html_escape::encode_text;
use teloxide::{types::Update, utils::command::BotCommands};
use tracing::{error, info, instrument, warn};

use crate::{
    message::{Command, InboundEvent, Keyboard, event_from_update},
    services::{
        affiliate,
        analytics::{AnalyticsEvent, AnalyticsTracker},
        flow::{self, Input, Step, Transition},
        itinerary::{self, ItinerarySource, MAX_MESSAGE_LEN},
        llm::CompletionModel,
        prompt,
        session_manager::SessionManager,
        telegram::ChatTransport,
    },
    trip::TripParameters,
};

pub const WELCOME_TEXT: &str = "👋 Hi! I'm your trip planner. Answer a few quick questions and \
I'll put together a day-by-day itinerary with booking links.";


pub const NO_SESSION_TEXT: &str = "Send /plan to start planning a trip.";
pub const CANCELLED_TEXT: &str = "Trip planning cancelled. Send /plan whenever you want to start again.";
pub const GENERATING_TEXT: &str = "🧳 Planning your trip... this can take up to a minute.";
pub const APOLOGY_TEXT: &str = "😔 Sorry, I couldn't create your itinerary right now. \
Please try again later with /plan.";
pub const EXPIRED_TEXT: &str = "This plan has expired. Send /plan to start again.";

/// Drives one chat through the intake form and hands the result to the model.
pub struct ConversationController {
    sessions: SessionManager,
    transport: Arc<dyn ChatTransport>,
    model: Arc<dyn CompletionModel>,
    analytics: AnalyticsTracker,
    affiliate_id: String,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl ConversationController {
    pub fn new(
        sessions: SessionManager,
        transport: Arc<dyn ChatTransport>,
        model: Arc<dyn CompletionModel>,
        analytics: AnalyticsTracker,
        affiliate_id: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            transport,
            model,
            analytics,
            affiliate_id: affiliate_id.into(),
            today: local_today,
        }
    }

    /// Override the date used for booking links.
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn analytics(&self) -> &AnalyticsTracker {
        &self.analytics
    }

    pub async fn handle_update(&self, update: Update) {
        if let Some(event) = event_from_update(update) {
            self.handle_event(event).await;
        }
    }

    #[instrument(skip(self, event), fields(chat_id = event.chat_id()))]
    pub async fn handle_event(&self, event: InboundEvent) {
        match event {
            InboundEvent::Command { chat_id, command } => self.handle_command(chat_id, command).await,
            InboundEvent::Text { chat_id, text } => {
                self.handle_answer(chat_id, Input::Text(&text), None).await
            }
            InboundEvent::Button {
                chat_id,
                message_id,
                callback_id,
                payload,
            } => {
                let has_session = self.sessions.get(chat_id).await.is_some();
                let ack = (!has_session).then_some(EXPIRED_TEXT);
                if let Err(err) = self.transport.answer_callback(&callback_id, ack).await {
                    warn!(error = %err, "failed to acknowledge callback");
                }
                if has_session {
                    self.handle_answer(chat_id, Input::Button(&payload), Some(message_id))
                        .await;
                }
            }
        }
    }

    async fn handle_command(&self, chat_id: i64, command: Command) {
        match command {
            Command::Start | Command::Plan => self.start_session(chat_id).await,
            Command::Cancel => {
                if self.sessions.remove(chat_id).await.is_some() {
                    self.analytics.track(AnalyticsEvent::SessionCancelled, chat_id).await;
                    self.send(chat_id, CANCELLED_TEXT, None).await;
                } else {
                    self.send(chat_id, NO_SESSION_TEXT, None).await;
                }
            }
            Command::Help | Command::Unknown => {
                let help = Command::descriptions().to_string();
                self.send(chat_id, &encode_text(&help), None).await;
            }
        }
    }

    async fn start_session(&self, chat_id: i64) {
        if self.sessions.start(chat_id).await {
            info!("discarded previous session");
        }
        self.analytics.track(AnalyticsEvent::SessionStarted, chat_id).await;
        self.send(chat_id, WELCOME_TEXT, None).await;
        self.ask(chat_id, Step::FIRST, &TripParameters::default(), None)
            .await;
    }

    /// Send the question for `step`, optionally prefixed by a correction hint,
    /// and remember the message id on the session.
    async fn ask(&self, chat_id: i64, step: Step, params: &TripParameters, hint: Option<&str>) {
        let question = flow::question(step, params);
        let text = match hint {
            Some(hint) => format!("⚠️ {}\n\n{}", encode_text(hint), encode_text(&question.text)),
            None => encode_text(&question.text).into_owned(),
        };
        if let Some(message_id) = self.send(chat_id, &text, question.keyboard.as_ref()).await {
            self.sessions.record_message(chat_id, message_id).await;
        }
    }

    async fn handle_answer(&self, chat_id: i64, input: Input<'_>, origin: Option<i64>) {
        let Some(mut session) = self.sessions.get(chat_id).await else {
            self.send(chat_id, NO_SESSION_TEXT, None).await;
            return;
        };

        let step = session.step;
        let transition = flow::apply(step, &mut session.params, input);
        match transition {
            Transition::Advance { answer, next } => {
                session.step = next;
                let params = session.params.clone();
                self.sessions.save(session).await;
                info!(step = step.name(), next = next.name(), "step completed");
                self.analytics.track(AnalyticsEvent::StepCompleted, chat_id).await;
                if step == Step::VacationStyle {
                    self.analytics.record_styles(&params.vacation_styles).await;
                }
                if let Some(message_id) = origin {
                    self.mark_answered(chat_id, message_id, step, &params, &answer)
                        .await;
                }
                self.ask(chat_id, next, &params, None).await;
            }
            Transition::Toggled => {
                let params = session.params.clone();
                self.sessions.save(session).await;
                match origin {
                    Some(message_id) => {
                        let question = flow::question(step, &params);
                        if let Err(err) = self
                            .transport
                            .edit_message(
                                chat_id,
                                message_id,
                                &encode_text(&question.text),
                                question.keyboard.as_ref(),
                            )
                            .await
                        {
                            warn!(error = %err, "failed to refresh style keyboard");
                        }
                    }
                    None => self.ask(chat_id, step, &params, None).await,
                }
            }
            Transition::Reprompt(err) => {
                info!(step = step.name(), reason = %err, "answer rejected");
                let params = session.params.clone();
                self.sessions.save(session).await;
                self.ask(chat_id, step, &params, Some(&err.to_string())).await;
            }
            Transition::Generate => {
                self.sessions.remove(chat_id).await;
                if let Some(message_id) = origin {
                    self.mark_answered(chat_id, message_id, step, &session.params, "YES")
                        .await;
                }
                self.generate(chat_id, session.params).await;
            }
            Transition::Cancel => {
                self.sessions.remove(chat_id).await;
                self.analytics.track(AnalyticsEvent::SessionCancelled, chat_id).await;
                self.send(chat_id, CANCELLED_TEXT, None).await;
            }
        }
    }

    /// Replace a question's keyboard with the chosen answer.
    async fn mark_answered(
        &self,
        chat_id: i64,
        message_id: i64,
        step: Step,
        params: &TripParameters,
        answer: &str,
    ) {
        let question = flow::question(step, params);
        let text = format!(
            "{}\n\n✅ <b>{}</b>",
            encode_text(&question.text),
            encode_text(answer)
        );
        if let Err(err) = self
            .transport
            .edit_message(chat_id, message_id, &text, None)
            .await
        {
            warn!(error = %err, "failed to mark question answered");
        }
    }

    /// Ask the model for an itinerary and deliver it. The session is already
    /// gone by the time this runs.
    async fn generate(&self, chat_id: i64, params: TripParameters) {
        let status_id = self.send(chat_id, GENERATING_TEXT, None).await;
        let prompt = prompt::build_prompt(&params);

        match self.model.complete(&prompt).await {
            Ok(reply) => {
                let rendered = itinerary::render_reply(&reply, &params);
                let event = match rendered.source {
                    ItinerarySource::Model => AnalyticsEvent::ItineraryGenerated,
                    ItinerarySource::Fallback | ItinerarySource::Minimal => {
                        AnalyticsEvent::FallbackItinerary
                    }
                };
                self.analytics.track(event, chat_id).await;

                let links = affiliate::build_links(&params, &self.affiliate_id, (self.today)());
                let text = format!(
                    "{}\n{}",
                    rendered.text,
                    affiliate::format_links(&links, &params)
                );
                for chunk in itinerary::split_message(&text, MAX_MESSAGE_LEN) {
                    self.send(chat_id, &chunk, None).await;
                }
            }
            Err(err) => {
                error!(error = %err, "itinerary generation failed");
                self.analytics.track(AnalyticsEvent::GenerationFailed, chat_id).await;
                self.send(chat_id, APOLOGY_TEXT, None).await;
            }
        }

        if let Some(message_id) = status_id {
            if let Err(err) = self.transport.delete_message(chat_id, message_id).await {
                warn!(error = %err, "failed to delete status message");
            }
        }
    }

    /// Send and log failures; the platform being unreachable never aborts a
    /// flow.
    async fn send(&self, chat_id: i64, text: &str, keyboard: Option<&Keyboard>) -> Option<i64> {
        match self.transport.send_message(chat_id, text, keyboard).await {
            Ok(message_id) => Some(message_id),
            Err(err) => {
                warn!(error = %err, "failed to send message");
                None
            }
        }
    }
}
