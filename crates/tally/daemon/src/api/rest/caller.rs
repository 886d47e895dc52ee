//! Caller derivation.
//!
//! Every request passes through [`authenticate`] before reaching a handler.
//! The middleware buffers the body, checks the signed-request headers and
//! attaches the resulting [`Caller`]. Handlers key counters by that value
//! only; no request payload ever names an identity.

use super::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    body::Body,
    extract::{FromRequestParts, OriginalUri, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use ed25519_dalek::{Signature, VerifyingKey};
use tally_types::signing::{
    signing_payload, PUBLIC_KEY_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
use tally_types::Identity;

/// Identity the server derived for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub Identity);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .ok_or_else(|| ApiError::Internal("caller was not derived for this route".to_string()))
    }
}

/// Checks signed-request headers and maps them to an [`Identity`].
#[derive(Debug, Clone)]
pub struct RequestVerifier {
    clock_skew_secs: u64,
}

impl RequestVerifier {
    pub fn new(clock_skew_secs: u64) -> Self {
        Self { clock_skew_secs }
    }

    /// Derive the caller of a request.
    ///
    /// No signature headers at all is the anonymous caller. Anything else
    /// must be a complete, fresh and valid signature.
    pub fn derive_caller(
        &self,
        method: &str,
        path: &str,
        headers: &HeaderMap,
        body: &[u8],
        now: i64,
    ) -> ApiResult<Identity> {
        let public_key = header(headers, PUBLIC_KEY_HEADER)?;
        let timestamp = header(headers, TIMESTAMP_HEADER)?;
        let signature = header(headers, SIGNATURE_HEADER)?;

        let (public_key, timestamp, signature) = match (public_key, timestamp, signature) {
            (None, None, None) => return Ok(Identity::anonymous()),
            (Some(k), Some(t), Some(s)) => (k, t, s),
            _ => {
                return Err(ApiError::InvalidSignature(
                    "incomplete signature headers".to_string(),
                ))
            }
        };

        let key_bytes: [u8; 32] = decode_fixed(public_key, "public key")?;
        let verifying_key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|_| ApiError::InvalidSignature("public key is not a valid point".to_string()))?;

        let timestamp: i64 = timestamp
            .parse()
            .map_err(|_| ApiError::InvalidSignature("timestamp is not an integer".to_string()))?;
        if now.abs_diff(timestamp) > self.clock_skew_secs {
            return Err(ApiError::InvalidSignature(format!(
                "timestamp {} outside the accepted window of {}s",
                timestamp, self.clock_skew_secs
            )));
        }

        let signature_bytes: [u8; 64] = decode_fixed(signature, "signature")?;
        let signature = Signature::from_bytes(&signature_bytes);

        let payload = signing_payload(method, path, timestamp, body);
        verifying_key
            .verify_strict(&payload, &signature)
            .map_err(|_| ApiError::InvalidSignature("signature verification failed".to_string()))?;

        Ok(Identity::self_authenticating(verifying_key.as_bytes()))
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> ApiResult<Option<&'a str>> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| ApiError::InvalidSignature(format!("{} is not valid text", name)))
        })
        .transpose()
}

fn decode_fixed<const N: usize>(text: &str, what: &str) -> ApiResult<[u8; N]> {
    let bytes = hex::decode(text.trim())
        .map_err(|_| ApiError::InvalidSignature(format!("{} is not valid hex", what)))?;
    bytes
        .try_into()
        .map_err(|_| ApiError::InvalidSignature(format!("{} must be {} bytes", what, N)))
}

/// Middleware deriving the [`Caller`] of every request.
pub async fn authenticate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, state.max_body_size)
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable request body: {}", e)))?;

    let path = parts
        .extensions
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let caller = state.verifier.derive_caller(
        parts.method.as_str(),
        &path,
        &parts.headers,
        &bytes,
        chrono::Utc::now().timestamp(),
    )?;

    tracing::debug!(caller = %caller, method = %parts.method, %path, "caller derived");
    parts.extensions.insert(Caller(caller));

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
