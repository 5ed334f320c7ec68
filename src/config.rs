use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, error};

pub const MIN_RECONCILE_INTERVAL_MS: u64 = 50;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Lifetime of a freshly created session
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Amount added to `expires_at` on join and on extend
    #[serde(default = "default_extend_secs")]
    pub extend_secs: u64,

    /// Distinct sessions this process tracks at once
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Live connections per session in this process
    #[serde(default = "default_max_connections_per_session")]
    pub max_connections_per_session: usize,

    /// Participants recorded in the stored session
    #[serde(default = "default_max_participants")]
    pub max_participants: usize,

    /// Wait on the session channel before falling back to a direct store read
    #[serde(default = "default_reconcile_interval_ms")]
    pub reconcile_interval_ms: u64,

    /// Frames buffered per connection before fan-out starts dropping
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,

    /// Delete the stored session once its last local connection leaves
    #[serde(default = "default_delete_when_empty")]
    pub delete_when_empty: bool,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        // Load from environment variables using envy
        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    /// Reconcile wait, never shorter than `MIN_RECONCILE_INTERVAL_MS`
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms.max(MIN_RECONCILE_INTERVAL_MS))
    }

    /// Filter used when `RUST_LOG` is unset: `log_level` for this crate,
    /// request tracing at debug and info for everything else
    pub fn default_log_filter(&self) -> String {
        format!(
            "menu_rooms={},tower_http=debug,axum::rejection=trace,info",
            self.log_level.trim().to_lowercase()
        )
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_ttl_secs as i64)
    }

    pub fn extend_by(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.extend_secs as i64)
    }

    /// Parsed CORS origins, empty when none are configured
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            session_ttl_secs: default_session_ttl_secs(),
            extend_secs: default_extend_secs(),
            max_sessions: default_max_sessions(),
            max_connections_per_session: default_max_connections_per_session(),
            max_participants: default_max_participants(),
            reconcile_interval_ms: default_reconcile_interval_ms(),
            outbound_buffer: default_outbound_buffer(),
            delete_when_empty: default_delete_when_empty(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_session_ttl_secs() -> u64 {
    600
}

fn default_extend_secs() -> u64 {
    600
}

fn default_max_sessions() -> usize {
    1000
}

fn default_max_connections_per_session() -> usize {
    10
}

fn default_max_participants() -> usize {
    10
}

fn default_reconcile_interval_ms() -> u64 {
    5000
}

fn default_outbound_buffer() -> usize {
    64
}

fn default_delete_when_empty() -> bool {
    true
}
