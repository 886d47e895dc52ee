//! Transport agents.
//!
//! An [`Agent`] is bound to exactly one identity for its whole life. The
//! HTTP agent signs every request when it was built from an
//! [`AuthenticatedIdentity`] and sends unsigned requests otherwise, which
//! the daemon serves as the anonymous caller.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::identity::AuthenticatedIdentity;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tally_types::signing::{PUBLIC_KEY_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use tally_types::{
    ChatRequest, CounterResponse, ErrorCode, ErrorResponse, GreetRequest, GreetResponse,
    HealthResponse, HttpMethod, Identity, IdentityScopedCapability, LlmResponse, PromptRequest,
    PublicCapability, Route, SetCounterRequest,
};
use tally_types::capability::paths;

/// Issues capability calls on behalf of one identity.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Identity every call of this agent is attributed to.
    fn identity(&self) -> &Identity;

    /// Check that the service is up.
    async fn status(&self) -> ClientResult<HealthResponse>;

    async fn call_public(&self, capability: &PublicCapability) -> ClientResult<String>;

    async fn call_scoped(&self, capability: &IdentityScopedCapability) -> ClientResult<u64>;
}

/// Builds agents for the two contexts.
pub trait Connector: Send + Sync {
    fn anonymous(&self) -> ClientResult<Arc<dyn Agent>>;

    fn authenticated(&self, proof: AuthenticatedIdentity) -> ClientResult<Arc<dyn Agent>>;
}

/// HTTP agent for the tally daemon
pub struct HttpAgent {
    client: Client,
    base_url: String,
    identity: Identity,
    signer: Option<AuthenticatedIdentity>,
}

impl HttpAgent {
    /// Create an agent; `signer` of `None` makes it anonymous.
    pub fn new(config: &ClientConfig, signer: Option<AuthenticatedIdentity>) -> ClientResult<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        let allow_system_proxy = std::env::var("TALLY_USE_SYSTEM_PROXY")
            .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        if !allow_system_proxy {
            builder = builder.no_proxy();
        }

        let identity = signer
            .as_ref()
            .map(|proof| proof.identity().clone())
            .unwrap_or_else(Identity::anonymous);

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url().to_string(),
            identity,
            signer,
        })
    }

    async fn send<T: DeserializeOwned>(&self, route: Route, body: Option<Vec<u8>>) -> ClientResult<T> {
        let path = route.full_path();
        let method = match route.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
        };

        let mut request = self
            .client
            .request(method, format!("{}{}", self.base_url, path));

        let bytes = body.unwrap_or_default();
        if let Some(signer) = &self.signer {
            let headers = signer.sign_request(
                route.method.as_str(),
                &path,
                &bytes,
                chrono::Utc::now().timestamp(),
            );
            request = request
                .header(PUBLIC_KEY_HEADER, headers.public_key)
                .header(TIMESTAMP_HEADER, headers.timestamp)
                .header(SIGNATURE_HEADER, headers.signature);
        }
        if !bytes.is_empty() {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(bytes);
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        Err(classify(status, &text))
    }

    fn check_owner(&self, response: &CounterResponse) -> ClientResult<()> {
        if response.owner != self.identity {
            tracing::warn!(
                expected = %self.identity,
                actual = %response.owner,
                "Daemon attributed the call to a different identity"
            );
            return Err(ClientError::OwnerMismatch {
                expected: self.identity.clone(),
                actual: response.owner.clone(),
            });
        }
        Ok(())
    }
}

/// Map a daemon error response back to the client taxonomy.
fn classify(status: StatusCode, text: &str) -> ClientError {
    let Ok(body) = serde_json::from_str::<ErrorResponse>(text) else {
        return ClientError::Rejected {
            status: status.as_u16(),
            code: ErrorCode::Unknown,
            message: text.to_string(),
        };
    };

    match body.code {
        ErrorCode::CounterOverflow => ClientError::CounterOverflow(body.error),
        ErrorCode::StateUnavailable => ClientError::StateUnavailable(body.error),
        ErrorCode::UpstreamLlm => ClientError::Upstream(body.error),
        code => ClientError::Rejected {
            status: status.as_u16(),
            code,
            message: body.error,
        },
    }
}

fn encode<B: Serialize>(body: &B) -> ClientResult<Option<Vec<u8>>> {
    Ok(Some(serde_json::to_vec(body)?))
}

#[async_trait]
impl Agent for HttpAgent {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    async fn status(&self) -> ClientResult<HealthResponse> {
        self.send(Route::new(HttpMethod::Get, paths::HEALTH), None)
            .await
    }

    async fn call_public(&self, capability: &PublicCapability) -> ClientResult<String> {
        let route = capability.route();
        match capability {
            PublicCapability::Greet { name } => {
                let body = encode(&GreetRequest { name: name.clone() })?;
                let response: GreetResponse = self.send(route, body).await?;
                Ok(response.message)
            }
            PublicCapability::Prompt { prompt } => {
                let body = encode(&PromptRequest {
                    prompt: prompt.clone(),
                })?;
                let response: LlmResponse = self.send(route, body).await?;
                Ok(response.response)
            }
            PublicCapability::Chat { messages } => {
                let body = encode(&ChatRequest {
                    messages: messages.clone(),
                })?;
                let response: LlmResponse = self.send(route, body).await?;
                Ok(response.response)
            }
        }
    }

    async fn call_scoped(&self, capability: &IdentityScopedCapability) -> ClientResult<u64> {
        let body = match capability {
            IdentityScopedCapability::SetCounter { value } => {
                encode(&SetCounterRequest { value: *value })?
            }
            IdentityScopedCapability::ReadCounter | IdentityScopedCapability::IncrementCounter => {
                None
            }
        };

        let response: CounterResponse = self.send(capability.route(), body).await?;
        self.check_owner(&response)?;
        Ok(response.value)
    }
}

/// Builds [`HttpAgent`]s against one daemon endpoint.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    config: ClientConfig,
}

impl HttpConnector {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

impl Connector for HttpConnector {
    fn anonymous(&self) -> ClientResult<Arc<dyn Agent>> {
        Ok(Arc::new(HttpAgent::new(&self.config, None)?))
    }

    fn authenticated(&self, proof: AuthenticatedIdentity) -> ClientResult<Arc<dyn Agent>> {
        Ok(Arc::new(HttpAgent::new(&self.config, Some(proof))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_codes() {
        let body = r#"{"error":"Counter overflow for 04","code":"COUNTER_OVERFLOW"}"#;
        assert!(matches!(
            classify(StatusCode::CONFLICT, body),
            ClientError::CounterOverflow(_)
        ));

        let body = r#"{"error":"ollama error 500: boom","code":"UPSTREAM_LLM"}"#;
        assert!(matches!(
            classify(StatusCode::BAD_GATEWAY, body),
            ClientError::Upstream(ref m) if m == "ollama error 500: boom"
        ));

        let body = r#"{"error":"Invalid signature: stale","code":"INVALID_SIGNATURE"}"#;
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, body),
            ClientError::Rejected { status: 401, code: ErrorCode::InvalidSignature, .. }
        ));
    }

    #[test]
    fn test_classify_unstructured_body() {
        assert!(matches!(
            classify(StatusCode::NOT_FOUND, "no route"),
            ClientError::Rejected { status: 404, code: ErrorCode::Unknown, ref message } if message == "no route"
        ));
    }
}
