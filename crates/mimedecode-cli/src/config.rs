//! Configuration file handling.

use std::path::{Path, PathBuf};

use anyhow::Context;
use mimedecode::DecodeOptions;
use serde::{Deserialize, Serialize};

/// Output format for the decoded message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The full tree as pretty-printed JSON.
    #[default]
    Json,
    /// Main headers followed by an outline of the parts.
    Summary,
}

/// Persistent settings, read from JSON.
///
/// Every field is optional in the file; missing ones take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Decoder flags.
    #[serde(flatten)]
    pub options: DecodeOptions,
    /// Default output format.
    pub format: OutputFormat,
}

impl Config {
    /// Parses a JSON configuration document.
    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        serde_json::from_str(contents).context("invalid configuration")
    }

    /// Loads the configuration.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used if present, else the built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let path = default_path();
                if !path.exists() {
                    tracing::debug!(path = %path.display(), "no configuration file, using defaults");
                    return Ok(Self::default());
                }
                path
            }
        };

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config =
            Self::from_json(&contents).with_context(|| format!("in {}", path.display()))?;
        tracing::debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }

    /// Writes the configuration as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("Configuration saved to {:?}", path);
        Ok(())
    }
}

/// Returns `<config dir>/mimedecode/config.json`.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mimedecode")
        .join("config.json")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.options.decode_bodies);
        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn test_partial_document() {
        let config =
            Config::from_json(r#"{"decode_headers": false, "format": "summary"}"#).unwrap();
        assert!(!config.options.decode_headers);
        assert!(config.options.include_bodies);
        assert_eq!(config.format, OutputFormat::Summary);
    }

    #[test]
    fn test_invalid_document() {
        assert!(Config::from_json(r#"{"format": "xml"}"#).is_err());
        assert!(Config::from_json("not json").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("mimedecode-config-{}", std::process::id()));
        let path = dir.join("config.json");
        let config = Config {
            options: DecodeOptions::new().with_rfc822_bodies(true),
            format: OutputFormat::Summary,
        };

        config.save(&path).unwrap();
        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let path = std::env::temp_dir().join("mimedecode-does-not-exist/config.json");
        assert!(Config::load(Some(&path)).is_err());
    }
}
