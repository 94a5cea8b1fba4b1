//! Shared configuration for the rollcall CLI and TUI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation into `rollcall_core::ClientConfig` / `ViewDefaults`. Both
//! binaries depend on this crate; the CLI layers its flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rollcall_api::{Credentials, CsrfSource, TlsMode};
use rollcall_core::{ClientConfig, FacetScope, ViewDefaults};

/// Keyring service name under which tokens are stored.
pub const KEYRING_SERVICE: &str = "rollcall";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{name}'")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration shared by CLI and TUI.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named service profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Profile `name`, or the default profile when `name` is `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }

    /// View behavior, with `profile` overriding the page size.
    pub fn view_defaults(&self, profile: Option<&Profile>) -> Result<ViewDefaults, ConfigError> {
        let debounce = humantime::parse_duration(&self.defaults.debounce).map_err(|e| {
            ConfigError::Validation {
                field: "defaults.debounce".into(),
                reason: e.to_string(),
            }
        })?;
        let page_size = profile
            .and_then(|p| p.page_size)
            .unwrap_or(self.defaults.page_size);
        if page_size == 0 {
            return Err(ConfigError::Validation {
                field: "page_size".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(ViewDefaults {
            page_size,
            debounce,
            facet_scope: self.defaults.facet_scope,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Quiet period before search input is applied, e.g. "300ms".
    #[serde(default = "default_debounce")]
    pub debounce: String,

    /// Facet counts over the whole collection or the current filter context.
    #[serde(default)]
    pub facet_scope: FacetScope,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            page_size: default_page_size(),
            debounce: default_debounce(),
            facet_scope: FacetScope::default(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_page_size() -> u32 {
    rollcall_core::query::DEFAULT_PAGE_SIZE
}
fn default_debounce() -> String {
    "300ms".into()
}

/// A named service profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Service base URL (e.g., "https://attendance.school.example/api").
    pub server: String,

    /// API token (plaintext; prefer keyring or env var).
    pub api_token: Option<String>,

    /// Environment variable name containing the API token.
    pub api_token_env: Option<String>,

    /// Endpoint returning a CSRF token, relative to `server`.
    pub csrf_path: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept invalid TLS certificates.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Override page size.
    pub page_size: Option<u32>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "rollcall", "rollcall")
}

/// Directory holding `config.toml` and saved views.
pub fn config_dir() -> PathBuf {
    project_dirs().map_or_else(dirs_fallback, |dirs| dirs.config_dir().to_path_buf())
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Directory for log files.
pub fn log_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("logs"),
        |dirs| dirs.data_local_dir().join("logs"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("rollcall");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path`, overlaid with `ROLLCALL_*` environment variables
/// (`__` separates nesting, e.g. `ROLLCALL_DEFAULTS__PAGE_SIZE=25`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ROLLCALL_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/api-token"),
    )?)
}

/// Resolve an API token: profile env var, then keyring, then plaintext.
/// `None` means the profile runs unauthenticated (session cookie only).
pub fn resolve_api_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's api_token_env → env var lookup
    if let Some(ref env_name) = profile.api_token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    profile
        .api_token
        .as_ref()
        .map(|token| SecretString::from(token.clone()))
}

/// Store a token in the system keyring.
pub fn store_api_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(token)?;
    Ok(())
}

/// Remove a token from the system keyring; missing entries are fine.
pub fn delete_api_token(profile_name: &str) -> Result<(), ConfigError> {
    match keyring_entry(profile_name)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// TLS mode for a profile: `insecure` wins over `ca_cert`.
pub fn tls_mode(profile: &Profile) -> TlsMode {
    if profile.insecure.unwrap_or(false) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    }
}

/// Build a `ClientConfig` from a profile, with no flag overrides.
pub fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    let base_url: url::Url = profile
        .server
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "server".into(),
            reason: format!("invalid URL: {}", profile.server),
        })?;

    let credentials = resolve_api_token(profile, profile_name)
        .map_or(Credentials::Anonymous, |token| Credentials::Bearer { token });

    let csrf = match profile.csrf_path {
        Some(ref path) => CsrfSource::default().with_endpoint(path.clone()),
        None => CsrfSource::default(),
    };

    Ok(ClientConfig {
        base_url,
        credentials,
        csrf,
        tls: tls_mode(profile),
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
default_profile = "school"

[defaults]
output = "json"
page_size = 25
debounce = "400ms"
facet_scope = "contextual"

[profiles.school]
server = "https://attendance.school.test/api"
api_token = "plain-token"
csrf_path = "auth/csrf"
timeout = 5
page_size = 50
"#;

    #[test]
    fn loads_profiles_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.defaults.output, "json");
        assert_eq!(cfg.defaults.color, "auto");
        let (name, profile) = cfg.profile(None).unwrap();
        assert_eq!(name, "school");
        assert_eq!(profile.timeout, Some(5));

        let view = cfg.view_defaults(Some(profile)).unwrap();
        assert_eq!(view.page_size, 50);
        assert_eq!(view.debounce, Duration::from_millis(400));
        assert_eq!(view.facet_scope, FacetScope::Contextual);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.defaults, Defaults::default());
        assert!(cfg.profiles.is_empty());
        assert!(matches!(
            cfg.profile(None),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                server: "http://localhost:8000/api".into(),
                page_size: Some(20),
                ..Profile::default()
            },
        );
        save_config_to(&cfg, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), cfg);
    }

    #[test]
    fn bad_debounce_is_a_validation_error() {
        let mut cfg = Config::default();
        cfg.defaults.debounce = "soon".into();
        assert!(matches!(
            cfg.view_defaults(None),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn insecure_wins_over_ca_cert() {
        let profile = Profile {
            server: "https://x.test".into(),
            insecure: Some(true),
            ca_cert: Some("/etc/ca.pem".into()),
            ..Profile::default()
        };
        assert!(matches!(tls_mode(&profile), TlsMode::DangerAcceptInvalid));
    }

    #[test]
    fn client_config_carries_token_and_csrf_endpoint() {
        let profile = Profile {
            server: "https://attendance.school.test/api".into(),
            api_token: Some("plain-token".into()),
            csrf_path: Some("auth/csrf".into()),
            ..Profile::default()
        };
        let cfg = profile_to_client_config(&profile, "rollcall-test-profile", &Defaults::default()).unwrap();
        assert!(matches!(cfg.credentials, Credentials::Bearer { .. }));
        assert_eq!(cfg.csrf.endpoint.as_deref(), Some("auth/csrf"));
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert_eq!(cfg.base_url.host_str(), Some("attendance.school.test"));
    }

    #[test]
    fn invalid_server_url_is_rejected() {
        let profile = Profile {
            server: "not a url".into(),
            ..Profile::default()
        };
        let err = profile_to_client_config(&profile, "t", &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "server"));
    }
}
