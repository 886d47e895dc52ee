//! Capability classification.
//!
//! Every call a client can make is either public (served for any caller,
//! through the anonymous context) or identity-scoped (served only through a
//! context that carries a proven identity). The split lives in the type
//! system: a value of [`IdentityScopedCapability`] can never be handed to the
//! public dispatch path, and vice versa.

use crate::wire::ChatMessage;
use std::fmt;

/// Prefix shared by every HTTP route.
pub const API_PREFIX: &str = "/api/v1";

pub mod paths {
    pub const HEALTH: &str = "/health";
    pub const WHOAMI: &str = "/whoami";
    pub const GREET: &str = "/greet";
    pub const LLM_PROMPT: &str = "/llm/prompt";
    pub const LLM_CHAT: &str = "/llm/chat";
    pub const COUNTER: &str = "/counter";
    pub const COUNTER_INCREMENT: &str = "/counter/increment";
}

/// HTTP verb of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Method and path (relative to [`API_PREFIX`]) serving a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub method: HttpMethod,
    pub path: &'static str,
}

impl Route {
    pub const fn new(method: HttpMethod, path: &'static str) -> Self {
        Self { method, path }
    }

    /// Absolute path including [`API_PREFIX`].
    pub fn full_path(&self) -> String {
        format!("{}{}", API_PREFIX, self.path)
    }
}

/// Calls with no per-identity partitioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicCapability {
    /// Greeting echo; an empty name greets "World".
    Greet { name: String },
    /// Single-shot LLM prompt.
    Prompt { prompt: String },
    /// Multi-turn LLM chat.
    Chat { messages: Vec<ChatMessage> },
}

impl PublicCapability {
    pub fn name(&self) -> &'static str {
        match self {
            PublicCapability::Greet { .. } => "greet",
            PublicCapability::Prompt { .. } => "send_prompt",
            PublicCapability::Chat { .. } => "chat",
        }
    }

    pub fn route(&self) -> Route {
        match self {
            PublicCapability::Greet { .. } => Route::new(HttpMethod::Post, paths::GREET),
            PublicCapability::Prompt { .. } => Route::new(HttpMethod::Post, paths::LLM_PROMPT),
            PublicCapability::Chat { .. } => Route::new(HttpMethod::Post, paths::LLM_CHAT),
        }
    }
}

/// Calls whose result is partitioned by the caller's identity.
///
/// None of these carry an identity: the server keys the counter by the
/// caller it derives from the request signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityScopedCapability {
    ReadCounter,
    IncrementCounter,
    SetCounter { value: u64 },
}

impl IdentityScopedCapability {
    pub fn name(&self) -> &'static str {
        match self {
            IdentityScopedCapability::ReadCounter => "read_counter",
            IdentityScopedCapability::IncrementCounter => "increment_counter",
            IdentityScopedCapability::SetCounter { .. } => "set_counter",
        }
    }

    pub fn route(&self) -> Route {
        match self {
            IdentityScopedCapability::ReadCounter => Route::new(HttpMethod::Get, paths::COUNTER),
            IdentityScopedCapability::IncrementCounter => {
                Route::new(HttpMethod::Post, paths::COUNTER_INCREMENT)
            }
            IdentityScopedCapability::SetCounter { .. } => {
                Route::new(HttpMethod::Put, paths::COUNTER)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_routes() {
        let greet = PublicCapability::Greet {
            name: String::new(),
        };
        let prompt = PublicCapability::Prompt {
            prompt: "hi".to_string(),
        };
        assert_eq!(greet.route().full_path(), "/api/v1/greet");
        assert_eq!(prompt.route().full_path(), "/api/v1/llm/prompt");
        assert_eq!(prompt.name(), "send_prompt");
    }

    #[test]
    fn test_routes() {
        assert_eq!(
            IdentityScopedCapability::ReadCounter.route().full_path(),
            "/api/v1/counter"
        );
        assert_eq!(
            IdentityScopedCapability::SetCounter { value: 1 }.route().method,
            HttpMethod::Put
        );
        assert_eq!(
            IdentityScopedCapability::IncrementCounter.route().full_path(),
            "/api/v1/counter/increment"
        );
    }
}
