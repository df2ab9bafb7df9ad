//! Configuration loading for mcp-homectl.
//!
//! Every setting is resolved from three sources (highest wins):
//!
//! 1. **CLI flag or environment variable** — `--url` / `HOMECTL_URL`,
//!    `--user` / `HOMECTL_USER`, `--password` / `HOMECTL_PASSWORD`,
//!    `--timeout-secs` / `HOMECTL_TIMEOUT_SECS`,
//!    `--log-level` / `HOMECTL_LOG_LEVEL`
//! 2. **JSON file** via `--config <path>` or `HOMECTL_CONFIG`
//! 3. **Compiled defaults**
//!
//! ```json
//! {
//!   "url": "http://192.168.1.50:843",
//!   "username": "admin",
//!   "password": "secret",
//!   "timeout_secs": 5,
//!   "log_level": "info"
//! }
//! ```
//!
//! Only the URL is required. Empty credentials are passed through as-is; a
//! controller that requires auth will answer 401.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

/// Port the controller's web API listens on when the URL doesn't say.
pub const DEFAULT_PORT: u16 = 843;
/// Per-request timeout when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_LOG_LEVEL: &str = "info";

/// CLI arguments parsed by `clap`.
#[derive(Parser, Debug, Default)]
#[command(name = "mcp-homectl", version, about = "MCP server for a smart-home controller")]
pub struct Cli {
    /// Path to a JSON config file
    #[arg(long, env = "HOMECTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Controller base URL, e.g. http://192.168.1.50:843 (port 843 is
    /// assumed for http:// and bare hosts without one)
    #[arg(long, env = "HOMECTL_URL")]
    pub url: Option<String>,

    /// Basic-auth username
    #[arg(long, env = "HOMECTL_USER")]
    pub user: Option<String>,

    /// Basic-auth password
    #[arg(long, env = "HOMECTL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "HOMECTL_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Log filter when RUST_LOG is unset (e.g. "info", "mcp_homectl=debug")
    #[arg(long, env = "HOMECTL_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Raw JSON config file structure. Every field is optional.
#[derive(Deserialize, Debug, Default)]
pub struct FileConfig {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

/// Connection settings injected into the [`Adapter`](crate::adapter::Adapter).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Normalized base URL without trailing slash.
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl ControllerConfig {
    /// Config with empty credentials and the default timeout.
    pub fn new(url: &str) -> Self {
        Self {
            base_url: normalize_url(url),
            username: String::new(),
            password: String::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = username.to_string();
        self.password = password.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Fully resolved configuration.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub controller: ControllerConfig,
    pub log_level: String,
}

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("no controller URL configured (set --url, HOMECTL_URL, or \"url\" in the config file)")]
    MissingUrl,

    #[error("timeout must be at least one second")]
    ZeroTimeout,
}

/// Load and validate configuration from CLI args, env vars, and config file.
pub fn load_config(cli: &Cli) -> Result<ResolvedConfig, ConfigError> {
    let file = match &cli.config {
        Some(path) => load_file(&expand_tilde(path))?,
        None => FileConfig::default(),
    };
    resolve(cli, file)
}

fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge CLI/env values over file values.
pub fn resolve(cli: &Cli, file: FileConfig) -> Result<ResolvedConfig, ConfigError> {
    let url = cli
        .url
        .clone()
        .or(file.url)
        .filter(|u| !u.trim().is_empty())
        .ok_or(ConfigError::MissingUrl)?;

    let timeout_secs = cli
        .timeout_secs
        .or(file.timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(ConfigError::ZeroTimeout);
    }

    let username = cli.user.clone().or(file.username).unwrap_or_default();
    let password = cli.password.clone().or(file.password).unwrap_or_default();

    Ok(ResolvedConfig {
        controller: ControllerConfig::new(&url)
            .with_credentials(&username, &password)
            .with_timeout(Duration::from_secs(timeout_secs)),
        log_level: cli
            .log_level
            .clone()
            .or(file.log_level)
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
    })
}

/// Normalize a configured URL.
///
/// A bare `host` or `host:port` gets `http://`. A bare or `http://` host
/// without a port gets [`DEFAULT_PORT`]. Other schemes are used as given.
/// The trailing slash is stripped for consistent path joining.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    let url = url.strip_prefix("http://").unwrap_or(url);
    if url.contains("://") {
        return url.to_string();
    }
    let authority = url.split('/').next().unwrap_or(url);
    let has_port = match authority.rsplit_once(':') {
        Some((_, port)) => !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    };
    if has_port {
        format!("http://{url}")
    } else {
        let rest = &url[authority.len()..];
        format!("http://{authority}:{DEFAULT_PORT}{rest}")
    }
}

/// Expand a leading `~` to `$HOME`.
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_scheme_and_default_port() {
        assert_eq!(normalize_url("192.168.1.50"), "http://192.168.1.50:843");
        assert_eq!(normalize_url("controller.lan/"), "http://controller.lan:843");
    }

    #[test]
    fn bare_host_with_port_keeps_it() {
        assert_eq!(normalize_url("192.168.1.50:8080"), "http://192.168.1.50:8080");
    }

    #[test]
    fn explicit_port_or_other_scheme_is_kept() {
        assert_eq!(normalize_url("https://ctl.example.com/"), "https://ctl.example.com");
        assert_eq!(normalize_url(" http://10.0.0.2:843 "), "http://10.0.0.2:843");
        assert_eq!(normalize_url("http://10.0.0.2:8080/"), "http://10.0.0.2:8080");
    }

    #[test]
    fn http_url_without_port_gets_default_port() {
        assert_eq!(normalize_url("http://10.0.0.2"), "http://10.0.0.2:843");
        assert_eq!(normalize_url("http://ctl.lan/api/"), "http://ctl.lan:843/api");
    }

    #[test]
    fn cli_overrides_file() {
        let cli = Cli {
            url: Some("http://cli:843".into()),
            timeout_secs: Some(9),
            ..Cli::default()
        };
        let file = FileConfig {
            url: Some("http://file:843".into()),
            username: Some("admin".into()),
            password: Some("pw".into()),
            timeout_secs: Some(2),
            log_level: Some("debug".into()),
        };
        let resolved = resolve(&cli, file).unwrap();
        assert_eq!(resolved.controller.base_url, "http://cli:843");
        assert_eq!(resolved.controller.username, "admin");
        assert_eq!(resolved.controller.password, "pw");
        assert_eq!(resolved.controller.timeout, Duration::from_secs(9));
        assert_eq!(resolved.log_level, "debug");
    }

    #[test]
    fn defaults_apply() {
        let cli = Cli {
            url: Some("10.0.0.2".into()),
            ..Cli::default()
        };
        let resolved = resolve(&cli, FileConfig::default()).unwrap();
        assert_eq!(resolved.controller.base_url, "http://10.0.0.2:843");
        assert_eq!(resolved.controller.username, "");
        assert_eq!(resolved.controller.password, "");
        assert_eq!(
            resolved.controller.timeout,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
        assert_eq!(resolved.log_level, "info");
    }

    #[test]
    fn missing_url_is_an_error() {
        let cli = Cli {
            url: Some("   ".into()),
            ..Cli::default()
        };
        assert!(matches!(
            resolve(&cli, FileConfig::default()),
            Err(ConfigError::MissingUrl)
        ));
    }

    #[test]
    fn zero_timeout_is_an_error() {
        let cli = Cli {
            url: Some("10.0.0.2".into()),
            timeout_secs: Some(0),
            ..Cli::default()
        };
        assert!(matches!(
            resolve(&cli, FileConfig::default()),
            Err(ConfigError::ZeroTimeout)
        ));
    }

    #[test]
    fn file_config_parses_partial_json() {
        let file: FileConfig = serde_json::from_str(r#"{"url": "10.0.0.3"}"#).unwrap();
        assert_eq!(file.url.as_deref(), Some("10.0.0.3"));
        assert!(file.username.is_none());
    }

    #[test]
    fn unreadable_file_is_reported() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/homectl.json")),
            ..Cli::default()
        };
        assert!(matches!(load_config(&cli), Err(ConfigError::Read { .. })));
    }
}
