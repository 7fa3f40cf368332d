#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use crate::adapters::chat::{BridgeChatClient, ChatClient, LogChatClient};
use crate::adapters::storage::{LocalUploadStore, UploadStore};
use crate::api::ServiceContainer;
use crate::config::{ChatBackend, ChatConfig, Config};
use crate::services::dispatcher::FanOutDispatcher;
use crate::services::health_service::HealthService;
use crate::services::messaging_service::MessagingService;
use crate::services::rate_limit_service::RateLimitService;
use crate::workers::UploadSweeper;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;
pub mod workers;

/// Everything the binary needs to start serving: router services, probes and background work.
#[derive(Debug)]
pub struct App {
    pub services: ServiceContainer,
    pub health_service: HealthService,
    pub workers: Workers,
}

/// Background tasks that run for the lifetime of the process.
#[derive(Debug)]
pub struct Workers {
    pub upload_sweeper: UploadSweeper,
}

impl Workers {
    #[must_use]
    pub fn spawn_all(self, shutdown_rx: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        vec![tokio::spawn(self.upload_sweeper.run(shutdown_rx))]
    }
}

/// Wires adapters into services. Adapters left unset fall back to the configured defaults.
#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    chat_client: Option<Arc<dyn ChatClient>>,
    upload_store: Option<Arc<dyn UploadStore>>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, chat_client: None, upload_store: None }
    }

    #[must_use]
    pub fn with_chat_client(mut self, chat_client: Arc<dyn ChatClient>) -> Self {
        self.chat_client = Some(chat_client);
        self
    }

    #[must_use]
    pub fn with_upload_store(mut self, upload_store: Arc<dyn UploadStore>) -> Self {
        self.upload_store = Some(upload_store);
        self
    }

    /// # Errors
    /// Returns an error if the chat client cannot be configured or the upload directory cannot be created.
    pub async fn build(self) -> anyhow::Result<App> {
        let config = self.config;

        let chat_client = match self.chat_client {
            Some(client) => client,
            None => build_chat_client(&config.chat)?,
        };
        let upload_store: Arc<dyn UploadStore> = match self.upload_store {
            Some(store) => store,
            None => Arc::new(LocalUploadStore::open(&config.uploads.dir).await?),
        };

        let dispatcher = FanOutDispatcher::new(Arc::clone(&chat_client), &config.messaging);
        let messaging_service = MessagingService::new(dispatcher, Arc::clone(&upload_store), config.uploads.clone());
        let rate_limit_service = RateLimitService::new(config.server.trusted_proxies.clone());
        let health_service = HealthService::new(chat_client, Arc::clone(&upload_store), config.health.clone());

        let upload_sweeper = UploadSweeper::new(upload_store, config.uploads.clone());

        Ok(App {
            services: ServiceContainer { messaging_service, rate_limit_service },
            health_service,
            workers: Workers { upload_sweeper },
        })
    }
}

/// Builds the chat client selected by configuration.
///
/// # Errors
/// Returns an error if the bridge backend is selected without a bridge URL.
pub fn build_chat_client(config: &ChatConfig) -> anyhow::Result<Arc<dyn ChatClient>> {
    match config.backend {
        ChatBackend::Log => {
            tracing::warn!("Using the log chat backend; messages are not delivered");
            Ok(Arc::new(LogChatClient))
        }
        ChatBackend::Bridge => {
            let url = config
                .bridge_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("GATEWAY_CHAT_BRIDGE_URL is required for the bridge backend"))?;
            let client =
                BridgeChatClient::new(url, config.bridge_token.clone(), Duration::from_millis(config.send_timeout_ms))?;
            Ok(Arc::new(client))
        }
    }
}

/// Routes panics through tracing so they reach the configured log sinks.
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "Box<Any>".to_string());
        let location = panic_info.location().map(ToString::to_string).unwrap_or_default();

        tracing::error!(panic.payload = %payload, panic.location = %location, "Application panicked");
    }));
}

/// Flips the shutdown channel on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });
}
