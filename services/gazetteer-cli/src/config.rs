//! Configuration types and loading
//!
//! Config precedence: CLI `--config` > GAZETTEER_CONFIG env var > default
//! path. Seed tokens come from env vars at login time and are never
//! stored in the TOML.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Place service connection settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_secs: u64,
}

/// Where the credential file lives
#[derive(Debug, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_credentials_path")]
    pub path: PathBuf,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: default_credentials_path(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_refresh_timeout() -> u64 {
    15
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("gazetteer-credentials.json")
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        if !config.api.base_url.starts_with("http://")
            && !config.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.api.base_url
            )));
        }

        if config.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if config.api.refresh_timeout_secs == 0 {
            return Err(common::Error::Config(
                "refresh_timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or GAZETTEER_CONFIG env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("GAZETTEER_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("gazetteer.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn valid_toml() -> &'static str {
        r#"
[api]
base_url = "https://places.example.com"
"#
    }

    #[test]
    fn test_load_valid_config_applies_defaults() {
        let dir = std::env::temp_dir().join("gazetteer-test-valid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, valid_toml()).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.base_url, "https://places.example.com");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.api.refresh_timeout_secs, 15);
        assert_eq!(
            config.credentials.path,
            PathBuf::from("gazetteer-credentials.json")
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_custom_values() {
        let toml_content = r#"
[api]
base_url = "http://localhost:3000"
timeout_secs = 5
refresh_timeout_secs = 3

[credentials]
path = "/var/lib/gazetteer/creds.json"
"#;
        let dir = std::env::temp_dir().join("gazetteer-test-custom");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, toml_content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.api.refresh_timeout_secs, 3);
        assert_eq!(
            config.credentials.path,
            PathBuf::from("/var/lib/gazetteer/creds.json")
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = std::env::temp_dir().join("gazetteer-test-invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(&path, "not valid {{{{ toml").unwrap();

        let result = Config::load(&path);
        assert!(result.is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let toml_content = r#"
[api]
base_url = "places.example.com"
"#;
        let dir = std::env::temp_dir().join("gazetteer-test-bad-url");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, toml_content).unwrap();

        let result = Config::load(&path);
        assert!(result.is_err(), "base_url without scheme must be rejected");
        let err = format!("{}", result.unwrap_err());
        assert!(
            err.contains("base_url must start with http"),
            "error message should explain the issue, got: {err}"
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let toml_content = r#"
[api]
base_url = "https://places.example.com"
timeout_secs = 0
"#;
        let dir = std::env::temp_dir().join("gazetteer-test-zero-timeout");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, toml_content).unwrap();

        let result = Config::load(&path);
        assert!(result.is_err(), "timeout_secs = 0 must be rejected");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_zero_refresh_timeout_rejected() {
        let toml_content = r#"
[api]
base_url = "https://places.example.com"
refresh_timeout_secs = 0
"#;
        let dir = std::env::temp_dir().join("gazetteer-test-zero-refresh");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, toml_content).unwrap();

        let result = Config::load(&path);
        assert!(result.is_err(), "refresh_timeout_secs = 0 must be rejected");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_resolve_path_cli_arg() {
        let path = Config::resolve_path(Some("/custom/path.toml"));
        assert_eq!(path, PathBuf::from("/custom/path.toml"));
    }

    #[test]
    fn test_resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("GAZETTEER_CONFIG", "/env/path.toml") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("/env/path.toml"));
        unsafe { remove_env("GAZETTEER_CONFIG") };
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("GAZETTEER_CONFIG") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("gazetteer.toml"));
    }

    #[test]
    fn test_resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("GAZETTEER_CONFIG", "/env/should-lose.toml") };
        let path = Config::resolve_path(Some("/cli/wins.toml"));
        assert_eq!(
            path,
            PathBuf::from("/cli/wins.toml"),
            "CLI arg must take precedence over GAZETTEER_CONFIG env var"
        );
        unsafe { remove_env("GAZETTEER_CONFIG") };
    }
}
