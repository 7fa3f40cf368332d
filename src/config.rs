use clap::{Args, Parser, ValueEnum};
use ipnetwork::IpNetwork;
use std::path::PathBuf;

#[derive(Clone, Debug, Default, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub rate_limit: RateLimitConfig,

    #[command(flatten)]
    pub messaging: MessagingConfig,

    #[command(flatten)]
    pub chat: ChatConfig,

    #[command(flatten)]
    pub uploads: UploadConfig,

    #[command(flatten)]
    pub health: HealthConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long = "host", env = "GATEWAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the public messaging API
    #[arg(long = "port", env = "GATEWAY_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for the management API (health probes)
    #[arg(long = "mgmt-port", env = "GATEWAY_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// Comma-separated list of CIDRs to trust for X-Forwarded-For IP extraction
    #[arg(
        long = "trusted-proxies",
        env = "GATEWAY_TRUSTED_PROXIES",
        default_value = "10.0.0.0/8,172.16.0.0/12,192.168.0.0/16,127.0.0.1/32",
        value_delimiter = ','
    )]
    pub trusted_proxies: Vec<IpNetwork>,

    /// Upper bound on the time a single API request may take
    #[arg(long = "request-timeout-secs", env = "GATEWAY_REQUEST_TIMEOUT_SECS", default_value_t = 120)]
    pub request_timeout_secs: u64,

    /// How long to wait for background workers during shutdown
    #[arg(long = "shutdown-timeout-secs", env = "GATEWAY_SHUTDOWN_TIMEOUT_SECS", default_value_t = 5)]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            mgmt_port: 9090,
            trusted_proxies: vec![],
            request_timeout_secs: 120,
            shutdown_timeout_secs: 5,
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct RateLimitConfig {
    /// Requests per second allowed per client IP
    #[arg(long = "rate-limit-per-second", env = "GATEWAY_RATE_LIMIT_PER_SECOND", default_value_t = 10)]
    pub per_second: u32,

    /// Burst allowance per client IP
    #[arg(long = "rate-limit-burst", env = "GATEWAY_RATE_LIMIT_BURST", default_value_t = 20)]
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { per_second: 10, burst: 20 }
    }
}

#[derive(Clone, Debug, Args)]
pub struct MessagingConfig {
    /// Suffix appended to a normalized number to form a chat address
    #[arg(long = "destination-suffix", env = "GATEWAY_DESTINATION_SUFFIX", default_value = "@c.us")]
    pub destination_suffix: String,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self { destination_suffix: "@c.us".to_string() }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ChatBackend {
    /// Log every send and report success without contacting a chat network
    #[default]
    Log,
    /// Forward sends to an HTTP bridge that owns the chat session
    Bridge,
}

#[derive(Clone, Debug, Args)]
pub struct ChatConfig {
    /// Which chat client implementation to use
    #[arg(long = "chat-backend", env = "GATEWAY_CHAT_BACKEND", value_enum, default_value_t = ChatBackend::Log)]
    pub backend: ChatBackend,

    /// Base URL of the chat bridge (required for the bridge backend)
    #[arg(long = "chat-bridge-url", env = "GATEWAY_CHAT_BRIDGE_URL")]
    pub bridge_url: Option<String>,

    /// Bearer token presented to the chat bridge
    #[arg(long = "chat-bridge-token", env = "GATEWAY_CHAT_BRIDGE_TOKEN")]
    pub bridge_token: Option<String>,

    /// Timeout for a single send to the chat bridge
    #[arg(long = "chat-send-timeout-ms", env = "GATEWAY_CHAT_SEND_TIMEOUT_MS", default_value_t = 30_000)]
    pub send_timeout_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { backend: ChatBackend::Log, bridge_url: None, bridge_token: None, send_timeout_ms: 30_000 }
    }
}

#[derive(Clone, Debug, Args)]
pub struct UploadConfig {
    /// Directory where uploaded files are staged until they are sent
    #[arg(long = "upload-dir", env = "GATEWAY_UPLOAD_DIR", default_value = "./uploads")]
    pub dir: PathBuf,

    /// Max upload size in bytes (Default: 64MB)
    #[arg(long = "upload-max-size-bytes", env = "GATEWAY_UPLOAD_MAX_SIZE_BYTES", default_value_t = 67_108_864)]
    pub max_size_bytes: usize,

    /// How often to sweep orphaned uploads
    #[arg(long = "upload-sweep-interval-secs", env = "GATEWAY_UPLOAD_SWEEP_INTERVAL_SECS", default_value_t = 300)]
    pub sweep_interval_secs: u64,

    /// Age after which a staged upload is considered orphaned
    #[arg(long = "upload-max-age-secs", env = "GATEWAY_UPLOAD_MAX_AGE_SECS", default_value_t = 3600)]
    pub max_age_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./uploads"),
            max_size_bytes: 67_108_864,
            sweep_interval_secs: 300,
            max_age_secs: 3600,
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct HealthConfig {
    /// Timeout for the chat session readiness check
    #[arg(long = "health-session-timeout-ms", env = "GATEWAY_HEALTH_SESSION_TIMEOUT_MS", default_value_t = 2000)]
    pub session_timeout_ms: u64,

    /// Timeout for the upload storage readiness check
    #[arg(long = "health-storage-timeout-ms", env = "GATEWAY_HEALTH_STORAGE_TIMEOUT_MS", default_value_t = 2000)]
    pub storage_timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { session_timeout_ms: 2000, storage_timeout_ms: 2000 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Default, Args)]
pub struct TelemetryConfig {
    /// OTLP collector endpoint; traces, metrics and logs are exported when set
    #[arg(long = "otlp-endpoint", env = "GATEWAY_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log output format
    #[arg(long = "log-format", env = "GATEWAY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let config = Config::parse_from(["msg-gateway"]);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.messaging.destination_suffix, "@c.us");
        assert_eq!(config.chat.backend, ChatBackend::Log);
        assert_eq!(config.server.trusted_proxies.len(), 4);
    }

    #[test]
    fn test_parse_bridge_backend() {
        let config = Config::parse_from([
            "msg-gateway",
            "--chat-backend",
            "bridge",
            "--chat-bridge-url",
            "http://bridge:8080",
            "--trusted-proxies",
            "127.0.0.1/32,::1/128",
        ]);
        assert_eq!(config.chat.backend, ChatBackend::Bridge);
        assert_eq!(config.chat.bridge_url.as_deref(), Some("http://bridge:8080"));
        assert_eq!(config.server.trusted_proxies.len(), 2);
    }
}
