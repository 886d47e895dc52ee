//! Application state for API handlers

use super::caller::RequestVerifier;
use crate::counters::CounterHost;
use crate::llm::LanguageModel;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Identity-keyed counters
    pub counters: Arc<CounterHost>,

    /// Upstream language model
    pub llm: Arc<dyn LanguageModel>,

    /// Signed-request verifier
    pub verifier: Arc<RequestVerifier>,

    /// Largest request body the caller middleware will buffer
    pub max_body_size: usize,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        counters: Arc<CounterHost>,
        llm: Arc<dyn LanguageModel>,
        verifier: Arc<RequestVerifier>,
        max_body_size: usize,
    ) -> Self {
        Self {
            counters,
            llm,
            verifier,
            max_body_size,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let duration = chrono::Utc::now() - self.started_at;
        let secs = duration.num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else if secs < 86400 {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        } else {
            format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
        }
    }
}
