// Host configuration from REMORA_* environment variables

use remora_transport::Versioning;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_HOST_NAME: &str = "remora";
pub const DEFAULT_TCP_PORT: i64 = 8085;
pub const DEFAULT_SESSION_AGE_MINUTES: u32 = 30;
pub const DEFAULT_SESSION_SWEEP_SECS: u64 = 60;
pub const DEFAULT_ALGORITHM: &str = "AES-256-GCM";

const LOG_FORMAT_KEY: &str = "REMORA_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl LogFormat {
    /// Log format alone, for use before the subscriber exists.
    ///
    /// An invalid value silently yields the default here; the warning is
    /// emitted when `HostConfig` is read after logging is up.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(LOG_FORMAT_KEY)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub host_name: String,
    /// Kept signed so an out-of-range value reaches the protocol setup
    pub tcp_port: i64,
    pub session_age_minutes: u32,
    pub session_sweep_secs: u64,
    pub encryption: bool,
    pub algorithm: String,
    pub oaep: bool,
    pub versioning: Versioning,
    pub socket_caching: bool,
    pub log_format: LogFormat,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            host_name: DEFAULT_HOST_NAME.to_string(),
            tcp_port: DEFAULT_TCP_PORT,
            session_age_minutes: DEFAULT_SESSION_AGE_MINUTES,
            session_sweep_secs: DEFAULT_SESSION_SWEEP_SECS,
            encryption: true,
            algorithm: DEFAULT_ALGORITHM.to_string(),
            oaep: false,
            versioning: Versioning::Strict,
            socket_caching: true,
            log_format: LogFormat::Pretty,
        }
    }
}

impl HostConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparsable values fall back to the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            host_name: lookup("REMORA_HOST_NAME")
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(defaults.host_name),
            tcp_port: parsed(&lookup, "REMORA_TCP_PORT", defaults.tcp_port),
            session_age_minutes: parsed(
                &lookup,
                "REMORA_SESSION_AGE_MINUTES",
                defaults.session_age_minutes,
            ),
            session_sweep_secs: parsed(
                &lookup,
                "REMORA_SESSION_SWEEP_SECS",
                defaults.session_sweep_secs,
            )
            .max(1),
            encryption: parsed(&lookup, "REMORA_ENCRYPTION", defaults.encryption),
            algorithm: lookup("REMORA_ALGORITHM").unwrap_or(defaults.algorithm),
            oaep: parsed(&lookup, "REMORA_OAEP", defaults.oaep),
            versioning: parsed(&lookup, "REMORA_VERSIONING", defaults.versioning),
            socket_caching: parsed(&lookup, "REMORA_SOCKET_CACHING", defaults.socket_caching),
            log_format: parsed(&lookup, LOG_FORMAT_KEY, defaults.log_format),
        }
    }
}

fn parsed<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key = %key, value = %raw, fallback = ?default, "Invalid config value, using default");
                default
            }
        },
    }
}
