//! Tally Types - shared vocabulary for the Tally service and its clients.
//!
//! This crate holds everything both sides of the wire must agree on:
//!
//! - [`Identity`]: the self-certifying caller token that keys every counter
//! - [`PublicCapability`] / [`IdentityScopedCapability`]: the static split
//!   between calls that run without an identity and calls that need one
//! - request/response bodies and the [`ErrorCode`] table
//! - the canonical payload signed by authenticated callers

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod capability;
pub mod identity;
pub mod signing;
pub mod wire;

pub use capability::{HttpMethod, IdentityScopedCapability, PublicCapability, Route, API_PREFIX};
pub use identity::{Identity, IdentityParseError};
pub use wire::{
    ChatMessage, ChatRequest, ChatRole, CounterResponse, ErrorCode, ErrorResponse, GreetRequest,
    GreetResponse, HealthResponse, LlmResponse, PromptRequest, SetCounterRequest, StoreStatus,
    WhoAmIResponse,
};
