//! Dual-context router.
//!
//! Two connection contexts live side by side:
//!
//! - the anonymous context, set up once by [`DualContextRouter::bootstrap`]
//!   and never torn down; public capabilities run through it
//! - the authenticated context, present only between a successful
//!   [`DualContextRouter::sign_in`] and the next
//!   [`DualContextRouter::sign_out`]; identity-scoped capabilities run
//!   through it and fail fast while it is absent
//!
//! Which context a call uses is decided by the capability's type, so a
//! counter call can never fall back to the anonymous identity.

use crate::agent::{Connector, HttpConnector};
use crate::config::ClientConfig;
use crate::context::ConnectionContext;
use crate::error::{ClientError, ClientResult};
use crate::identity::IdentityProvider;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tally_types::{ChatMessage, Identity, IdentityScopedCapability, PublicCapability};
use tokio::sync::{watch, OnceCell};

/// Sign-in state published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    SignedOut,
    SignedIn(Identity),
}

enum AuthState {
    Absent,
    Ready(Arc<ConnectionContext>),
}

/// Routes capability calls to the anonymous or the authenticated context.
pub struct DualContextRouter {
    connector: Arc<dyn Connector>,
    anonymous: OnceCell<ConnectionContext>,
    authenticated: RwLock<AuthState>,
    /// Bumped by every sign-out; a handshake that started under an older
    /// value is discarded.
    epoch: AtomicU64,
    status_tx: watch::Sender<AuthStatus>,
}

impl DualContextRouter {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        let (status_tx, _) = watch::channel(AuthStatus::SignedOut);
        Self {
            connector,
            anonymous: OnceCell::new(),
            authenticated: RwLock::new(AuthState::Absent),
            epoch: AtomicU64::new(0),
            status_tx,
        }
    }

    /// Router talking HTTP to the daemon at `config.endpoint`.
    pub fn over_http(config: ClientConfig) -> Self {
        Self::new(Arc::new(HttpConnector::new(config)))
    }

    /// Create the anonymous context and check the service through it.
    ///
    /// Concurrent callers share one attempt. A failed status check leaves the
    /// context unset so a later call can try again.
    pub async fn bootstrap(&self) -> ClientResult<()> {
        self.anonymous
            .get_or_try_init(|| async {
                let agent = self.connector.anonymous()?;
                let health = agent.status().await?;
                tracing::info!(
                    version = %health.version,
                    store = ?health.store,
                    "Anonymous context ready"
                );
                Ok::<_, ClientError>(ConnectionContext::new(agent))
            })
            .await?;
        Ok(())
    }

    /// Prove an identity and install the authenticated context.
    ///
    /// No lock is held while the provider runs. If [`sign_out`] is called
    /// before the handshake completes, the result is dropped and
    /// [`ClientError::SignInSuperseded`] is returned.
    ///
    /// [`sign_out`]: DualContextRouter::sign_out
    pub async fn sign_in(&self, provider: &dyn IdentityProvider) -> ClientResult<Identity> {
        let epoch = self.epoch.load(Ordering::SeqCst);

        let proof = provider.authenticate().await?;
        let agent = self.connector.authenticated(proof)?;
        let context = Arc::new(ConnectionContext::new(agent));
        let identity = context.identity().clone();

        let mut state = self.write_state();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::info!(identity = %identity, "Sign-in discarded, signed out while in flight");
            return Err(ClientError::SignInSuperseded);
        }
        *state = AuthState::Ready(context);
        self.status_tx
            .send_replace(AuthStatus::SignedIn(identity.clone()));
        drop(state);

        tracing::info!(identity = %identity, "Authenticated context ready");
        Ok(identity)
    }

    /// Drop the authenticated context.
    ///
    /// Calls already dispatched keep their context and finish under the
    /// identity they started with.
    pub fn sign_out(&self) {
        let mut state = self.write_state();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let previous = std::mem::replace(&mut *state, AuthState::Absent);
        self.status_tx.send_replace(AuthStatus::SignedOut);
        drop(state);

        if let AuthState::Ready(context) = previous {
            tracing::info!(identity = %context.identity(), "Signed out");
        }
    }

    pub async fn dispatch_public(&self, capability: &PublicCapability) -> ClientResult<String> {
        let Some(context) = self.anonymous.get() else {
            tracing::debug!(capability = capability.name(), "Refused, service not ready");
            return Err(ClientError::ServiceNotReady);
        };
        context.agent().call_public(capability).await
    }

    pub async fn dispatch_scoped(&self, capability: &IdentityScopedCapability) -> ClientResult<u64> {
        let Some(context) = self.authenticated_context() else {
            tracing::debug!(capability = capability.name(), "Refused, not signed in");
            return Err(ClientError::AuthenticationRequired {
                capability: capability.name(),
            });
        };
        context.agent().call_scoped(capability).await
    }

    pub async fn greet(&self, name: impl Into<String>) -> ClientResult<String> {
        self.dispatch_public(&PublicCapability::Greet { name: name.into() })
            .await
    }

    pub async fn send_prompt(&self, prompt: impl Into<String>) -> ClientResult<String> {
        self.dispatch_public(&PublicCapability::Prompt {
            prompt: prompt.into(),
        })
        .await
    }

    pub async fn chat(&self, messages: Vec<ChatMessage>) -> ClientResult<String> {
        self.dispatch_public(&PublicCapability::Chat { messages })
            .await
    }

    pub async fn read_counter(&self) -> ClientResult<u64> {
        self.dispatch_scoped(&IdentityScopedCapability::ReadCounter)
            .await
    }

    pub async fn increment_counter(&self) -> ClientResult<u64> {
        self.dispatch_scoped(&IdentityScopedCapability::IncrementCounter)
            .await
    }

    pub async fn set_counter(&self, value: u64) -> ClientResult<u64> {
        self.dispatch_scoped(&IdentityScopedCapability::SetCounter { value })
            .await
    }

    /// Whether the anonymous context is up.
    pub fn is_ready(&self) -> bool {
        self.anonymous.initialized()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(&*self.read_state(), AuthState::Ready(_))
    }

    /// The signed-in identity, if any.
    pub fn identity(&self) -> Option<Identity> {
        self.authenticated_context()
            .map(|context| context.identity().clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthStatus> {
        self.status_tx.subscribe()
    }

    fn authenticated_context(&self) -> Option<Arc<ConnectionContext>> {
        match &*self.read_state() {
            AuthState::Ready(context) => Some(context.clone()),
            AuthState::Absent => None,
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, AuthState> {
        self.authenticated
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, AuthState> {
        self.authenticated
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
