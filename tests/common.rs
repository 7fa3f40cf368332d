#![allow(dead_code, clippy::unwrap_used, clippy::missing_panics_doc, unreachable_pub)]
use async_trait::async_trait;
use msg_gateway::AppBuilder;
use msg_gateway::adapters::chat::{ChatClient, LogChatClient};
use msg_gateway::api::MgmtState;
use msg_gateway::config::Config;
use msg_gateway::domain::delivery::{SendError, SendReceipt, SessionStatus};
use msg_gateway::domain::payload::Payload;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::watch;

pub fn get_test_config(upload_dir: PathBuf) -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.server.mgmt_port = 0;
    config.server.trusted_proxies = vec!["127.0.0.1/32".parse().unwrap(), "::1/128".parse().unwrap()];
    config.rate_limit.per_second = 10_000;
    config.rate_limit.burst = 10_000;
    config.uploads.dir = upload_dir;
    config.uploads.max_size_bytes = 1024 * 1024;
    config
}

/// One call observed by [`RecordingChatClient`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub destination: String,
    pub kind: &'static str,
    pub text: Option<String>,
    pub file_len: Option<usize>,
}

/// Records every send; destinations listed in `failures` fail with the given error.
#[derive(Debug, Default)]
pub struct RecordingChatClient {
    pub sent: Mutex<Vec<SentMessage>>,
    pub failures: HashMap<String, SendError>,
    pub session: Option<SessionStatus>,
}

impl RecordingChatClient {
    pub fn failing(destinations: &[(&str, SendError)]) -> Self {
        Self {
            failures: destinations.iter().map(|(d, e)| ((*d).to_string(), e.clone())).collect(),
            ..Self::default()
        }
    }

    pub fn with_session(session: SessionStatus) -> Self {
        Self { session: Some(session), ..Self::default() }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for RecordingChatClient {
    async fn send(&self, destination: &str, payload: &Payload) -> Result<SendReceipt, SendError> {
        let (text, file_len) = match payload {
            Payload::Text(t) => (Some(t.clone()), None),
            Payload::File(f) => (None, Some(f.data.len())),
        };
        self.sent.lock().unwrap().push(SentMessage {
            destination: destination.to_string(),
            kind: payload.kind(),
            text,
            file_len,
        });

        if let Some(err) = self.failures.get(destination) {
            return Err(err.clone());
        }
        Ok(SendReceipt { id: format!("msg-{destination}"), timestamp: 1_700_000_000 })
    }

    async fn session_status(&self) -> SessionStatus {
        self.session.unwrap_or(SessionStatus::Ready)
    }
}

#[derive(Debug)]
pub struct TestApp {
    pub server_url: String,
    pub mgmt_url: String,
    pub client: reqwest::Client,
    pub config: Config,
    pub upload_dir: TempDir,
    pub shutdown_tx: watch::Sender<bool>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_chat_client(Arc::new(LogChatClient)).await
    }

    pub async fn spawn_with_chat_client(chat_client: Arc<dyn ChatClient>) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let config = get_test_config(upload_dir.path().to_path_buf());
        Self::spawn_with(config, upload_dir, chat_client).await
    }

    pub async fn spawn_with_config(config: Config) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let mut config = config;
        config.uploads.dir = upload_dir.path().to_path_buf();
        Self::spawn_with(config, upload_dir, Arc::new(LogChatClient)).await
    }

    async fn spawn_with(config: Config, upload_dir: TempDir, chat_client: Arc<dyn ChatClient>) -> Self {
        msg_gateway::telemetry::init_test_telemetry();

        let app = AppBuilder::new(config.clone()).with_chat_client(chat_client).build().await.unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let app_router = msg_gateway::api::app_router(config.clone(), app.services);
        let mgmt_router = msg_gateway::api::mgmt_router(MgmtState { health_service: app.health_service });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mgmt_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_url = format!("http://{}", listener.local_addr().unwrap());
        let mgmt_url = format!("http://{}", mgmt_listener.local_addr().unwrap());

        let mut rx = shutdown_rx.clone();
        tokio::spawn(async move {
            axum::serve(listener, app_router.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move {
                    let _ = rx.wait_for(|&s| s).await;
                })
                .await
                .unwrap();
        });

        let mut rx = shutdown_rx;
        tokio::spawn(async move {
            axum::serve(mgmt_listener, mgmt_router.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move {
                    let _ = rx.wait_for(|&s| s).await;
                })
                .await
                .unwrap();
        });

        Self { server_url, mgmt_url, client: reqwest::Client::new(), config, upload_dir, shutdown_tx }
    }

    /// Number of files left in the upload directory.
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path()).unwrap().count()
    }
}
