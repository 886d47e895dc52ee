//! A real daemon on a loopback port driven through `DualContextRouter`.

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use std::sync::Arc;
use tally_client::{
    AuthenticatedIdentity, ClientConfig, ClientError, DualContextRouter, IdentityError,
    IdentityProvider,
};
use tally_daemon::config::StoreConfig;
use tally_daemon::{CounterHost, DaemonConfig, LanguageModel, LlmError, Server};
use tally_types::ChatMessage;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct SilentModel;

#[async_trait]
impl LanguageModel for SilentModel {
    async fn prompt(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError("no model configured".to_string()))
    }

    async fn chat(&self, _messages: &[ChatMessage]) -> Result<String, LlmError> {
        Ok(String::new())
    }
}

struct SeededProvider(u8);

#[async_trait]
impl IdentityProvider for SeededProvider {
    async fn authenticate(&self) -> Result<AuthenticatedIdentity, IdentityError> {
        Ok(AuthenticatedIdentity::from_signing_key(SigningKey::from_bytes(
            &[self.0; 32],
        )))
    }
}

struct Running {
    endpoint: String,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<tally_daemon::error::DaemonResult<()>>,
}

impl Running {
    async fn stop(self) {
        let _ = self.shutdown.send(());
        self.handle.await.unwrap().unwrap();
    }
}

async fn start(store: StoreConfig) -> Running {
    let mut config = DaemonConfig::ephemeral();
    config.store = store;

    let counters = Arc::new(CounterHost::boot(&config.store).unwrap());
    let server = Server::with_components(config, counters, Arc::new(SilentModel));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    let (shutdown, rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(server.serve(listener, async move {
        let _ = rx.await;
    }));

    Running {
        endpoint,
        shutdown,
        handle,
    }
}

async fn signed_in(endpoint: &str, seed: u8) -> DualContextRouter {
    let router = DualContextRouter::over_http(ClientConfig::new(endpoint));
    router.bootstrap().await.unwrap();
    router.sign_in(&SeededProvider(seed)).await.unwrap();
    router
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn identities_stay_isolated_under_concurrency() {
    let daemon = start(StoreConfig {
        persistence: false,
        ..Default::default()
    })
    .await;

    let mut tasks = Vec::new();
    for seed in 1..=4u8 {
        let endpoint = daemon.endpoint.clone();
        tasks.push(tokio::spawn(async move {
            let router = signed_in(&endpoint, seed).await;
            for _ in 0..(seed as usize * 5) {
                router.increment_counter().await.unwrap();
            }
            router.read_counter().await.unwrap()
        }));
    }

    for (seed, task) in (1..=4u64).zip(tasks) {
        assert_eq!(task.await.unwrap(), seed * 5);
    }

    daemon.stop().await;
}

#[tokio::test]
async fn scoped_calls_gate_on_sign_in() {
    let daemon = start(StoreConfig {
        persistence: false,
        ..Default::default()
    })
    .await;

    let router = DualContextRouter::over_http(ClientConfig::new(daemon.endpoint.clone()));
    assert!(matches!(
        router.greet("Ada").await,
        Err(ClientError::ServiceNotReady)
    ));

    router.bootstrap().await.unwrap();
    assert_eq!(router.greet("Ada").await.unwrap(), "Hello, Ada!");
    assert_eq!(router.greet("").await.unwrap(), "Hello, World!");
    assert_eq!(router.chat(vec![ChatMessage::user("hi")]).await.unwrap(), "");
    assert!(matches!(
        router.send_prompt("hi").await,
        Err(ClientError::Upstream(ref m)) if m == "no model configured"
    ));

    assert!(matches!(
        router.read_counter().await,
        Err(ClientError::AuthenticationRequired { .. })
    ));

    router.sign_in(&SeededProvider(7)).await.unwrap();
    assert_eq!(router.set_counter(42).await.unwrap(), 42);
    assert_eq!(router.read_counter().await.unwrap(), 42);
    assert_eq!(router.increment_counter().await.unwrap(), 43);
    assert_eq!(router.increment_counter().await.unwrap(), 44);

    router.set_counter(u64::MAX).await.unwrap();
    assert!(matches!(
        router.increment_counter().await,
        Err(ClientError::CounterOverflow(_))
    ));
    assert_eq!(router.read_counter().await.unwrap(), u64::MAX);

    router.sign_out();
    assert!(matches!(
        router.increment_counter().await,
        Err(ClientError::AuthenticationRequired { .. })
    ));

    router.sign_in(&SeededProvider(7)).await.unwrap();
    assert_eq!(router.read_counter().await.unwrap(), u64::MAX);

    daemon.stop().await;
}

#[tokio::test]
async fn counters_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let store = StoreConfig {
        persistence: true,
        snapshot_path: dir.path().join("tally-state.json"),
        ..Default::default()
    };

    let daemon = start(store.clone()).await;
    let router = signed_in(&daemon.endpoint, 11).await;
    router.increment_counter().await.unwrap();
    router.increment_counter().await.unwrap();
    daemon.stop().await;

    let daemon = start(store).await;
    let router = signed_in(&daemon.endpoint, 11).await;
    assert_eq!(router.read_counter().await.unwrap(), 2);

    let other = signed_in(&daemon.endpoint, 12).await;
    assert_eq!(other.read_counter().await.unwrap(), 0);

    daemon.stop().await;
}
