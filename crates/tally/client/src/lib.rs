//! Tally Client - dual-context access to the Tally daemon.
//!
//! [`DualContextRouter`] keeps an anonymous connection for public
//! capabilities and, after sign-in, an authenticated one for
//! identity-scoped capabilities:
//!
//! ```no_run
//! use tally_client::{ClientConfig, DualContextRouter, KeyFileProvider};
//!
//! # async fn run() -> tally_client::ClientResult<()> {
//! let router = DualContextRouter::over_http(ClientConfig::new("http://127.0.0.1:4943"));
//! router.bootstrap().await?;
//! println!("{}", router.greet("Ada").await?);
//!
//! router
//!     .sign_in(&KeyFileProvider::new("identity.key").create_if_missing(true))
//!     .await?;
//! println!("count = {}", router.increment_counter().await?);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod router;

pub use agent::{Agent, Connector, HttpAgent, HttpConnector};
pub use config::ClientConfig;
pub use context::ConnectionContext;
pub use error::{ClientError, ClientResult};
pub use identity::{
    AuthenticatedIdentity, EphemeralProvider, IdentityError, IdentityProvider, KeyFileProvider,
    SignedHeaders,
};
pub use router::{AuthStatus, DualContextRouter};
