//! Configuration file parser for ~/.config/kindle-digest/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
//! Command-line flags always win over values read here.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Digest title, also used as the mail subject.
    pub title: String,

    /// Lookback window in days when `--period` is not given.
    pub period_days: u32,

    /// Output directory when `--out` is not given. Unset = current directory.
    pub output_dir: Option<PathBuf>,

    /// Output file name prefix; the file is `<prefix>_<YYYY-MM-DD>.html`.
    pub file_prefix: String,

    /// Program used to bundle articles into one HTML document.
    pub digest_command: String,

    /// Program used to mail the digest.
    pub mail_command: String,

    /// Number of feeds fetched at once. 1 = strictly sequential.
    pub fetch_concurrency: usize,

    /// User-Agent header for feed requests. Unset = `kindle-digest/<version>`.
    pub user_agent: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Kindle RSS".to_string(),
            period_days: 1,
            output_dir: None,
            file_prefix: "kindle_rss".to_string(),
            digest_command: "percollate".to_string(),
            mail_command: "mailx".to_string(),
            fetch_concurrency: 1,
            user_agent: None,
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 8] = [
        "title",
        "period_days",
        "output_dir",
        "file_prefix",
        "digest_command",
        "mail_command",
        "fetch_concurrency",
        "user_agent",
    ];

    /// Default location: `$HOME/.config/kindle-digest/config.toml`.
    ///
    /// `None` when `HOME` is not set.
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join("kindle-digest")
                .join("config.toml"),
        )
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    /// - Zero `period_days` or `fetch_concurrency` → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading to prevent memory exhaustion
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), ?config, "Loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.period_days == 0 {
            return Err(ConfigError::Invalid {
                key: "period_days",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.fetch_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "fetch_concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.file_prefix.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                key: "file_prefix",
                reason: "must not contain path separators".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.title, "Kindle RSS");
        assert_eq!(config.period_days, 1);
        assert!(config.output_dir.is_none());
        assert_eq!(config.file_prefix, "kindle_rss");
        assert_eq!(config.digest_command, "percollate");
        assert_eq!(config.mail_command, "mailx");
        assert_eq!(config.fetch_concurrency, 1);
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_empty_file_returns_default() {
        let (_dir, path) = write_config("");
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let (_dir, path) = write_config("   \n  \n  ");
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let (_dir, path) = write_config("title = \"Morning Paper\"\n");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.title, "Morning Paper");
        assert_eq!(config.period_days, 1);
        assert_eq!(config.mail_command, "mailx");
    }

    #[test]
    fn test_full_config() {
        let (_dir, path) = write_config(
            r#"
title = "Weekly"
period_days = 7
output_dir = "/var/digests"
file_prefix = "weekly"
digest_command = "/opt/bin/percollate"
mail_command = "s-nail"
fetch_concurrency = 4
user_agent = "my-reader/1.0"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.title, "Weekly");
        assert_eq!(config.period_days, 7);
        assert_eq!(config.output_dir, Some(PathBuf::from("/var/digests")));
        assert_eq!(config.file_prefix, "weekly");
        assert_eq!(config.digest_command, "/opt/bin/percollate");
        assert_eq!(config.mail_command, "s-nail");
        assert_eq!(config.fetch_concurrency, 4);
        assert_eq!(config.user_agent.as_deref(), Some("my-reader/1.0"));
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (_dir, path) = write_config("this is not [valid toml");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let (_dir, path) = write_config(
            r#"
title = "Digest"
totally_fake_key = "should not fail"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.title, "Digest");
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let (_dir, path) = write_config("period_days = \"seven\"\n");
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_period_rejected() {
        let (_dir, path) = write_config("period_days = 0\n");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "period_days", .. }));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let (_dir, path) = write_config("fetch_concurrency = 0\n");
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Invalid {
                key: "fetch_concurrency",
                ..
            })
        ));
    }

    #[test]
    fn test_prefix_with_separator_rejected() {
        let (_dir, path) = write_config("file_prefix = \"../escape\"\n");
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Invalid {
                key: "file_prefix",
                ..
            })
        ));
    }

    // SEC-014: File size limit
    #[test]
    fn test_too_large_file_rejected() {
        let (_dir, path) = write_config(&"a".repeat(1_048_577));

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
    }
}
