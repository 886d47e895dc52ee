//! Tally Daemon library
//!
//! This crate hosts the identity-scoped counter service:
//! - REST API with caller derivation from signed requests
//! - Counter store hosting with load at boot and snapshot at shutdown
//! - Greeting and language model passthrough
//! - Server lifecycle management

pub mod api;
pub mod config;
pub mod counters;
pub mod error;
pub mod llm;
pub mod server;

pub use config::DaemonConfig;
pub use counters::CounterHost;
pub use error::{ApiError, DaemonError};
pub use llm::{HttpLanguageModel, LanguageModel, LlmError};
pub use server::Server;
