use crate::mcp::client::HttpTimeouts;
use crate::mcp::validate::ValidationMode;
use crate::render::OutputMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LOG_LEVEL: &str = "warn";

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    /// Upper bound on each remote step: connect, list, call, close.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// TCP/TLS connect bound for the HTTP client.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Also run full JSON Schema validation on tool arguments.
    #[serde(default)]
    pub strict_validation: bool,
    #[serde(default)]
    pub output: OutputMode,
    pub log_level: Option<String>,
    /// Server to connect to on startup when `--connect` is not given.
    pub default_url: Option<String>,
    pub default_token_env_var: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            strict_validation: false,
            output: OutputMode::default(),
            log_level: None,
            default_url: None,
            default_token_env_var: None,
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn http_timeouts(&self) -> HttpTimeouts {
        HttpTimeouts {
            connect: Duration::from_secs(self.connect_timeout_secs.max(1)),
            request: self.request_timeout(),
        }
    }

    pub fn validation_mode(&self) -> ValidationMode {
        ValidationMode {
            strict: self.strict_validation,
        }
    }

    pub fn log_level(&self) -> &str {
        self.log_level
            .as_deref()
            .map(str::trim)
            .filter(|level| !level.is_empty())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
