//! Configuration management for Confluence.
//!
//! Configuration is read from `~/.config/confluence/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timeline: TimelineConfig,
    pub cache: CacheConfig,
    pub http: HttpConfig,
    pub fanfou: FanfouConfig,
    pub mastodon: MastodonConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Items requested per source per page
    pub page_size: usize,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Prefix shared by every store this app owns
    pub app: String,
    /// Generation tag. Bumping it evicts older stores on activation.
    pub version: String,
    /// Activate straight after install instead of waiting
    pub skip_waiting: bool,
    /// Base URL of the shell document. Without it nothing is precached.
    pub shell_url: Option<String>,
    /// Shell resources, relative to `shell_url`
    pub precache: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            app: "confluence".to_string(),
            version: "v2".to_string(),
            skip_waiting: true,
            shell_url: None,
            precache: vec![
                "./".to_string(),
                "./index.html".to_string(),
                "./manifest.json".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("confluence/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FanfouConfig {
    pub base_url: String,
    /// Pre-signed `Authorization` header value
    pub authorization: Option<String>,
}

impl Default for FanfouConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.fanfou.com/".to_string(),
            authorization: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MastodonConfig {
    /// Instance host, with or without scheme
    pub instance: String,
    pub access_token: Option<String>,
}

impl Default for MastodonConfig {
    fn default() -> Self {
        Self {
            instance: "nofan.xyz".to_string(),
            access_token: None,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/confluence/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("confluence").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })
    }

    fn default_config_content() -> String {
        r##"# Confluence Configuration
#
# Credentials are issued outside Confluence. Leave a backend's credential
# unset to keep it signed out; its timeline is then skipped.

[timeline]
# Posts requested per backend per page
page_size = 20

[cache]
# Every store named "<app>-..." belongs to this app
app = "confluence"

# Bump to evict all cached responses on next start
version = "v2"

# Activate a new generation right after install
skip_waiting = true

# Base URL of the shell document to precache (optional)
# shell_url = "https://example.com/confluence/"

precache = ["./", "./index.html", "./manifest.json"]

[http]
timeout_secs = 30

[fanfou]
base_url = "https://api.fanfou.com/"
# authorization = "OAuth oauth_consumer_key=..."

[mastodon]
# Host name; scheme and trailing slashes are ignored
instance = "nofan.xyz"
# access_token = "..."
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.timeline.page_size, 20);
        assert_eq!(config.cache.app, "confluence");
        assert_eq!(config.cache.precache.len(), 3);
        assert!(config.cache.shell_url.is_none());
        assert!(config.fanfou.authorization.is_none());
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[cache]
version = "v3"
skip_waiting = false

[mastodon]
access_token = "secret"
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.cache.version, "v3");
        assert!(!config.cache.skip_waiting);
        assert_eq!(config.cache.app, "confluence");
        assert_eq!(config.mastodon.access_token.as_deref(), Some("secret"));
        assert_eq!(config.mastodon.instance, "nofan.xyz");
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.http.timeout_secs, 30);
        assert!(config.cache.skip_waiting);
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.timeline.page_size, 20);

        // Second load parses the written file
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.cache.version, "v2");
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[timeline]\npage_size = \"many\"\n").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
