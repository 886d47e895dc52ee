//! Identity proof.
//!
//! Possession of an Ed25519 signing key is the proof of an identity. An
//! [`IdentityProvider`] produces an [`AuthenticatedIdentity`] holding that
//! key; the router only ever builds an authenticated context from one of
//! these, never from a bare [`Identity`].

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tally_types::signing::signing_payload;
use tally_types::Identity;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

const PEER_WRITE_ATTEMPTS: usize = 10;
const PEER_WRITE_BACKOFF: Duration = Duration::from_millis(20);

/// Identity provider failures
#[derive(Debug, Error)]
pub enum IdentityError {
    /// No key at the configured path and creation was not requested
    #[error("key file {} not found", .0.display())]
    KeyFileMissing(PathBuf),

    /// Key file exists but does not hold a hex Ed25519 seed
    #[error("invalid key file {}: {reason}", .path.display())]
    InvalidKeyFile { path: PathBuf, reason: String },

    /// Provider-specific handshake failure
    #[error("identity handshake failed: {0}")]
    Handshake(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Signature headers for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub public_key: String,
    pub timestamp: String,
    pub signature: String,
}

/// A proven identity: the signing key and the identity derived from it.
#[derive(Clone)]
pub struct AuthenticatedIdentity {
    signing_key: SigningKey,
    identity: Identity,
}

impl AuthenticatedIdentity {
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let identity = Identity::self_authenticating(signing_key.verifying_key().as_bytes());
        Self {
            signing_key,
            identity,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().as_bytes())
    }

    /// Sign one request for the daemon's caller derivation.
    pub fn sign_request(&self, method: &str, path: &str, body: &[u8], timestamp: i64) -> SignedHeaders {
        let signature = self
            .signing_key
            .sign(&signing_payload(method, path, timestamp, body));

        SignedHeaders {
            public_key: self.public_key_hex(),
            timestamp: timestamp.to_string(),
            signature: hex::encode(signature.to_bytes()),
        }
    }
}

impl fmt::Debug for AuthenticatedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedIdentity")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Source of identity proofs.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self) -> Result<AuthenticatedIdentity, IdentityError>;
}

/// Keeps a hex-encoded Ed25519 seed in a file.
#[derive(Debug, Clone)]
pub struct KeyFileProvider {
    path: PathBuf,
    create_if_missing: bool,
}

impl KeyFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create_if_missing: false,
        }
    }

    /// Generate and store a fresh key when the file does not exist.
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, contents: &str) -> Result<SigningKey, IdentityError> {
        let invalid = |reason: String| IdentityError::InvalidKeyFile {
            path: self.path.clone(),
            reason,
        };

        let bytes = hex::decode(contents.trim()).map_err(|e| invalid(e.to_string()))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| invalid(format!("expected 32 bytes, found {}", b.len())))?;

        Ok(SigningKey::from_bytes(&seed))
    }

    async fn create(&self) -> Result<SigningKey, IdentityError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = match options.open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                tracing::debug!(path = %self.path.display(), "Key file created concurrently");
                return self.read_peer_key().await;
            }
            Err(e) => return Err(e.into()),
        };

        let key = SigningKey::generate(&mut OsRng);
        file.write_all(format!("{}\n", hex::encode(key.to_bytes())).as_bytes())
            .await?;
        file.sync_all().await?;

        tracing::info!(path = %self.path.display(), "Generated new identity key");
        Ok(key)
    }

    /// Read a key another process is writing; the trailing newline marks it complete.
    async fn read_peer_key(&self) -> Result<SigningKey, IdentityError> {
        for _ in 0..PEER_WRITE_ATTEMPTS {
            let contents = tokio::fs::read_to_string(&self.path).await?;
            if contents.ends_with('\n') {
                return self.parse(&contents);
            }
            tokio::time::sleep(PEER_WRITE_BACKOFF).await;
        }
        let contents = tokio::fs::read_to_string(&self.path).await?;
        self.parse(&contents)
    }
}

#[async_trait]
impl IdentityProvider for KeyFileProvider {
    async fn authenticate(&self) -> Result<AuthenticatedIdentity, IdentityError> {
        let key = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if self.create_if_missing && !contents.ends_with('\n') => {
                self.read_peer_key().await?
            }
            Ok(contents) => self.parse(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if !self.create_if_missing {
                    return Err(IdentityError::KeyFileMissing(self.path.clone()));
                }
                self.create().await?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(AuthenticatedIdentity::from_signing_key(key))
    }
}

/// Fresh random key on every sign-in. Counters do not survive across
/// sign-ins; meant for development.
#[derive(Debug, Clone, Copy, Default)]
pub struct EphemeralProvider;

#[async_trait]
impl IdentityProvider for EphemeralProvider {
    async fn authenticate(&self) -> Result<AuthenticatedIdentity, IdentityError> {
        Ok(AuthenticatedIdentity::from_signing_key(SigningKey::generate(
            &mut OsRng,
        )))
    }
}
