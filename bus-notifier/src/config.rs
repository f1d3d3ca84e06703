//! Application configuration.
//!
//! Every setting can come from a command-line flag or an environment
//! variable; flags win. [`Settings`] is the raw clap surface and
//! [`Settings::into_config`] checks it and assembles the per-component
//! configs.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};

use crate::cache::CacheConfig;
use crate::poll::PollConfig;
use crate::proximity::{Policy, ProximityConfig};
use crate::store::JsonFileStore;
use crate::tdx::TdxConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Errors from checking settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set unless a simulator file is given")]
    MissingCredential(&'static str),

    #[error("invalid {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

/// Raw settings from flags and environment.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// TDX OAuth client id
    #[arg(long, env = "TDX_CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,

    /// TDX OAuth client secret
    #[arg(long, env = "TDX_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// City whose routes are served
    #[arg(long, env = "TDX_CITY", default_value = "Taipei")]
    pub city: String,

    /// Seconds between poll cycles
    #[arg(long, env = "BUS_POLL_SECS", default_value_t = 60)]
    pub poll_secs: u64,

    /// Directory holding per-user subscription files
    #[arg(long, env = "BUS_PREFS_DIR", default_value = ".")]
    pub prefs_dir: PathBuf,

    /// Proximity policy: "time" or "index"
    #[arg(long, env = "BUS_POLICY", default_value = "time")]
    pub policy: Policy,

    /// Serve simulated data from this ETA file or directory instead of TDX
    #[arg(long, env = "BUS_SIMULATOR_FILE")]
    pub simulator: Option<PathBuf>,

    /// Address for the HTTP API
    #[arg(long, env = "BUS_HTTP_ADDR", default_value = "127.0.0.1:3000")]
    pub http_addr: SocketAddr,

    /// Log format
    #[arg(long, env = "BUS_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Where live data comes from.
#[derive(Debug, Clone)]
pub enum SourceMode {
    Tdx(TdxConfig),
    Simulator(PathBuf),
}

/// Checked application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source: SourceMode,
    pub poll: PollConfig,
    pub cache: CacheConfig,
    pub proximity: ProximityConfig,
    pub http_addr: SocketAddr,
}

impl Settings {
    /// The subscription store. Needs none of the source settings.
    pub fn store(&self) -> JsonFileStore {
        JsonFileStore::new(&self.prefs_dir)
    }

    /// Check the settings and build the application config.
    ///
    /// Credentials are only required when no simulator is configured.
    pub fn into_config(self) -> Result<AppConfig, ConfigError> {
        if self.poll_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "poll interval",
                message: "must be at least one second".into(),
            });
        }
        if self.city.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "city",
                message: "must not be empty".into(),
            });
        }

        let source = match self.simulator {
            Some(path) => SourceMode::Simulator(path),
            None => {
                let id = non_empty(self.client_id)
                    .ok_or(ConfigError::MissingCredential("TDX_CLIENT_ID"))?;
                let secret = non_empty(self.client_secret)
                    .ok_or(ConfigError::MissingCredential("TDX_CLIENT_SECRET"))?;
                SourceMode::Tdx(TdxConfig::new(id, secret).with_city(self.city.trim()))
            }
        };

        let interval = Duration::from_secs(self.poll_secs);
        let cache = CacheConfig {
            // Shorter than a cycle so each cycle sees a fresh snapshot
            ttl: interval / 2,
            ..CacheConfig::default()
        };

        Ok(AppConfig {
            source,
            poll: PollConfig::default().with_interval(interval),
            cache,
            proximity: ProximityConfig::with_policy(self.policy),
            http_addr: self.http_addr,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
