//! Settings resolution: CLI flag / env var, then config file, then defaults.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Service base URL without a trailing slash.
    pub base_url: String,
    pub request_timeout: Duration,
    /// Program that receives share text on stdin; `None` means the platform
    /// offers no native share.
    pub share_command: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            share_command: None,
        }
    }
}

/// On-disk `config.toml` layout. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    #[serde(default, with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
    pub share_command: Option<String>,
}

/// Values supplied on the command line (or through their env vars).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub request_timeout: Option<Duration>,
    pub share_command: Option<String>,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("review-bot").join("config.toml"))
}

/// Load the config file. An explicit path must exist; the default path is
/// optional.
pub fn load_file(explicit: Option<&Path>) -> Result<Option<FileConfig>, ConfigError> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return Ok(None),
        },
    };
    let contents = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(ConfigError::Read { path, source }),
    };
    let parsed = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(Some(parsed))
}

impl Settings {
    pub fn resolve(overrides: Overrides, file: Option<FileConfig>) -> Result<Self, ConfigError> {
        let file = file.unwrap_or_default();
        let defaults = Settings::default();
        let base_url = overrides
            .base_url
            .or(file.base_url)
            .unwrap_or(defaults.base_url);
        Ok(Self {
            base_url: normalize_base_url(&base_url)?,
            request_timeout: overrides
                .request_timeout
                .or(file.request_timeout)
                .unwrap_or(defaults.request_timeout),
            share_command: overrides
                .share_command
                .or(file.share_command)
                .filter(|c| !c.trim().is_empty()),
        })
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| ConfigError::BaseUrl {
        url: raw.to_string(),
        reason,
    };
    let url = reqwest::Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(invalid(format!("unsupported scheme {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let s = Settings::resolve(Overrides::default(), None).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn cli_beats_file_beats_default() {
        let file = FileConfig {
            base_url: Some("https://file.example".into()),
            request_timeout: Some(Duration::from_secs(5)),
            share_command: Some("wl-copy".into()),
        };
        let overrides = Overrides {
            base_url: Some("https://cli.example/".into()),
            ..Default::default()
        };
        let s = Settings::resolve(overrides, Some(file)).unwrap();
        assert_eq!(s.base_url, "https://cli.example");
        assert_eq!(s.request_timeout, Duration::from_secs(5));
        assert_eq!(s.share_command.as_deref(), Some("wl-copy"));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let overrides = Overrides {
            base_url: Some("ftp://example.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            Settings::resolve(overrides, None),
            Err(ConfigError::BaseUrl { .. })
        ));
    }

    #[test]
    fn reads_humantime_timeout_from_toml() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            "base_url = \"https://review.example\"\nrequest_timeout = \"45s\""
        )
        .unwrap();
        let file = load_file(Some(f.path())).unwrap().unwrap();
        assert_eq!(file.request_timeout, Some(Duration::from_secs(45)));
        assert_eq!(file.base_url.as_deref(), Some("https://review.example"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            load_file(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "base_url = ").unwrap();
        assert!(matches!(
            load_file(Some(f.path())),
            Err(ConfigError::Parse { .. })
        ));
    }
}
