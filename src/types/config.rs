use serde::{Deserialize, Serialize};

/// Which store the application talks to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hosted backend-as-a-service (PostgREST + realtime + OAuth).
    Supabase,
    /// SQLite file on this machine with a fixed local principal.
    Local,
}

/// Top-level SmartMark configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SmartMarkConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Hosted backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub url: String,
    pub anon_key: String,
    pub table: String,
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Local,
            url: String::new(),
            anon_key: String::new(),
            table: "bookmarks".to_string(),
            request_timeout_secs: 15,
        }
    }
}

/// Local (SQLite) backend settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalConfig {
    /// Database file; `None` means `<data dir>/smartmark.db`.
    pub database_path: Option<String>,
    pub user_id: String,
    pub email: Option<String>,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            user_id: "local".to_string(),
            email: None,
        }
    }
}

/// OAuth sign-in settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthConfig {
    pub provider: String,
    pub callback_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
            callback_path: "/auth/callback".to_string(),
        }
    }
}

/// Change-notification channel settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RealtimeConfig {
    pub channel: String,
    pub heartbeat_interval_secs: u64,
    pub reconnect_delay_secs: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel: "realtime_bookmarks".to_string(),
            heartbeat_interval_secs: 30,
            reconnect_delay_secs: 5,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    /// Directory for a daily-rotated log file, if any.
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            directory: None,
        }
    }
}
