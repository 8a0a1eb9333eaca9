use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;
use crate::retry::{DEFAULT_INITIAL_WAIT, RetryPolicy};
use crate::search::{DEFAULT_BROWSER, DEFAULT_SEARCH_URL};

pub const CONFIG_FILE: &str = "kira-ef.json";
pub const DEFAULT_EFETCH: &str = "efetch";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub efetch: Option<String>,
    #[serde(default)]
    pub browser: Option<String>,
    #[serde(default)]
    pub search_url: Option<String>,
    #[serde(default)]
    pub retry: RetryEntry,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RetryEntry {
    #[serde(default)]
    pub initial_wait_secs: Option<u64>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub efetch: Option<String>,
    pub initial_wait_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub source: Option<PathBuf>,
    pub efetch: String,
    pub browser: String,
    pub search_url: String,
    pub retry: RetryPolicy,
    pub timeout: Option<Duration>,
}

impl ResolvedConfig {
    pub fn defaults() -> Self {
        Self {
            schema_version: 1,
            source: None,
            efetch: DEFAULT_EFETCH.to_string(),
            browser: DEFAULT_BROWSER.to_string(),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            retry: RetryPolicy::default(),
            timeout: None,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist; otherwise `./kira-ef.json`, then the
    /// user config directory, then built-in defaults.
    pub fn resolve(
        path: Option<&str>,
        overrides: &ConfigOverrides,
    ) -> Result<ResolvedConfig, KiraError> {
        let config_path = match path {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    return Err(KiraError::MissingConfig(path));
                }
                Some(path)
            }
            None => Self::discover(),
        };

        let (config, source) = match config_path {
            Some(path) => (Self::load(&path)?, Some(path)),
            None => (Config::default(), None),
        };
        tracing::debug!(source = ?source, "configuration loaded");

        Self::resolve_config(config, source, overrides)
    }

    /// Like [`ConfigLoader::resolve`], but an unreadable or invalid config
    /// falls back to the defaults. Used where only the browser settings
    /// matter.
    pub fn resolve_lenient(path: Option<&str>, overrides: &ConfigOverrides) -> ResolvedConfig {
        match Self::resolve(path, overrides) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring config, using defaults");
                ResolvedConfig::defaults()
            }
        }
    }

    pub fn load(path: &Path) -> Result<Config, KiraError> {
        let content =
            fs::read_to_string(path).map_err(|_| KiraError::ConfigRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| KiraError::ConfigParse(err.to_string()))
    }

    pub fn resolve_config(
        config: Config,
        source: Option<PathBuf>,
        overrides: &ConfigOverrides,
    ) -> Result<ResolvedConfig, KiraError> {
        let initial_wait_secs = overrides
            .initial_wait_secs
            .or(config.retry.initial_wait_secs);
        // A zero wait never grows, so failures would retry without pause.
        if initial_wait_secs == Some(0) {
            return Err(KiraError::InvalidConfig(
                "retry.initial_wait_secs must be at least 1".to_string(),
            ));
        }
        let timeout_secs = overrides.timeout_secs.or(config.timeout_secs);
        if timeout_secs == Some(0) {
            return Err(KiraError::InvalidConfig(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        let initial_wait = initial_wait_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_INITIAL_WAIT);

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            source,
            efetch: overrides
                .efetch
                .clone()
                .or(config.efetch)
                .unwrap_or_else(|| DEFAULT_EFETCH.to_string()),
            browser: config
                .browser
                .unwrap_or_else(|| DEFAULT_BROWSER.to_string()),
            search_url: config
                .search_url
                .unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string()),
            retry: RetryPolicy {
                initial_wait,
                max_attempts: overrides.max_attempts.or(config.retry.max_attempts),
            },
            timeout: timeout_secs.map(Duration::from_secs),
        })
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        ProjectDirs::from("dev", "kira", "kira-efetch")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
            .filter(|path| path.is_file())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults_without_file() {
        let resolved =
            ConfigLoader::resolve_config(Config::default(), None, &ConfigOverrides::default())
                .unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.efetch, "efetch");
        assert_eq!(resolved.browser, "firefox");
        assert_eq!(resolved.retry, RetryPolicy::default());
        assert_eq!(resolved.timeout, None);
    }

    #[test]
    fn overrides_win_over_file() {
        let config = Config {
            efetch: Some("/opt/edirect/efetch".to_string()),
            retry: RetryEntry {
                initial_wait_secs: Some(5),
                max_attempts: Some(10),
            },
            timeout_secs: Some(30),
            ..Config::default()
        };
        let overrides = ConfigOverrides {
            max_attempts: Some(3),
            ..ConfigOverrides::default()
        };
        let resolved = ConfigLoader::resolve_config(config, None, &overrides).unwrap();
        assert_eq!(resolved.efetch, "/opt/edirect/efetch");
        assert_eq!(resolved.retry.initial_wait, Duration::from_secs(5));
        assert_eq!(resolved.retry.max_attempts, Some(3));
        assert_eq!(resolved.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_initial_wait_is_rejected() {
        let config = Config {
            retry: RetryEntry {
                initial_wait_secs: Some(0),
                max_attempts: None,
            },
            ..Config::default()
        };
        let err =
            ConfigLoader::resolve_config(config, None, &ConfigOverrides::default()).unwrap_err();
        assert_matches!(err, KiraError::InvalidConfig(_));

        let overrides = ConfigOverrides {
            initial_wait_secs: Some(0),
            ..ConfigOverrides::default()
        };
        let err = ConfigLoader::resolve_config(Config::default(), None, &overrides).unwrap_err();
        assert_matches!(err, KiraError::InvalidConfig(_));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let overrides = ConfigOverrides {
            timeout_secs: Some(0),
            ..ConfigOverrides::default()
        };
        let err = ConfigLoader::resolve_config(Config::default(), None, &overrides).unwrap_err();
        assert_matches!(err, KiraError::InvalidConfig(_));
    }

    #[test]
    fn lenient_defaults_match_empty_config() {
        let strict =
            ConfigLoader::resolve_config(Config::default(), None, &ConfigOverrides::default())
                .unwrap();
        let defaults = ResolvedConfig::defaults();
        assert_eq!(defaults.browser, strict.browser);
        assert_eq!(defaults.search_url, strict.search_url);
        assert_eq!(defaults.retry, strict.retry);
    }
}
