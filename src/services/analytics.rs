// src/services/analytics.rs
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalyticsEvent {
    SessionStarted,
    StepCompleted,
    SessionCancelled,
    ItineraryGenerated,
    FallbackItinerary,
    GenerationFailed,
}

impl AnalyticsEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionStarted => "session_started",
            Self::StepCompleted => "step_completed",
            Self::SessionCancelled => "session_cancelled",
            Self::ItineraryGenerated => "itinerary_generated",
            Self::FallbackItinerary => "fallback_itinerary",
            Self::GenerationFailed => "generation_failed",
        }
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct AnalyticsData {
    pub events: HashMap<String, u64>,
    pub vacation_styles: HashMap<String, u64>,
}

/// Event counters, also emitted as structured log lines.
#[derive(Debug, Clone)]
pub struct AnalyticsTracker {
    inner: Arc<RwLock<AnalyticsData>>,
}

impl Default for AnalyticsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(AnalyticsData::default())),
        }
    }

    pub async fn track(&self, event: AnalyticsEvent, chat_id: i64) {
        info!(
            event_id = %Uuid::new_v4(),
            event = event.as_str(),
            chat_id,
            "analytics"
        );
        let mut data = self.inner.write().await;
        *data.events.entry(event.as_str().to_string()).or_insert(0) += 1;
    }

    pub async fn record_styles(&self, styles: &[String]) {
        let mut data = self.inner.write().await;
        for style in styles {
            *data.vacation_styles.entry(style.clone()).or_insert(0) += 1;
        }
    }

    pub async fn count(&self, event: AnalyticsEvent) -> u64 {
        let data = self.inner.read().await;
        data.events.get(event.as_str()).copied().unwrap_or(0)
    }

    pub async fn snapshot(&self) -> AnalyticsData {
        self.inner.read().await.clone()
    }
}
