//! Pipeline configuration, loadable from RON, TOML or JSON.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default propagation budget for a top-level block change.
pub const DEFAULT_UPDATE_LIMIT: u32 = 512;

/// What to do when a pipeline runs on a thread that does not own the levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadPolicy {
    /// Log a diagnostic with a backtrace and keep going.
    #[default]
    Warn,
    /// Log the diagnostic and refuse the change.
    Deny,
}

/// Tunables shared by every pipeline run under a [`PhaseContext`](crate::context::PhaseContext).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Budget handed to top-level changes; nested changes get `limit - 1`.
    pub default_limit: u32,
    pub thread_policy: ThreadPolicy,
    /// Keep a ledger of game transactions for undo and replay.
    pub record_transactions: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_UPDATE_LIMIT,
            thread_policy: ThreadPolicy::Warn,
            record_transactions: true,
        }
    }
}

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    #[error("parse error ({format:?}): {detail}")]
    Parse { format: Format, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(ConfigError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

impl PipelineConfig {
    /// Parse a config from a string in the given format. Missing fields
    /// take their defaults.
    pub fn parse(content: &str, format: Format) -> Result<Self, ConfigError> {
        let parse_err = |detail: String| ConfigError::Parse { format, detail };
        match format {
            Format::Ron => ron::from_str(content).map_err(|e| parse_err(e.to_string())),
            Format::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
            Format::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        }
    }

    /// Read and parse a config file, choosing the format from its extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content, format)?;
        tracing::debug!(path = %path.display(), ?config, "loaded pipeline config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.default_limit, 512);
        assert_eq!(config.thread_policy, ThreadPolicy::Warn);
        assert!(config.record_transactions);
    }

    #[test]
    fn parse_toml_partial() {
        let config = PipelineConfig::parse("thread_policy = \"deny\"\n", Format::Toml).unwrap();
        assert_eq!(config.thread_policy, ThreadPolicy::Deny);
        assert_eq!(config.default_limit, DEFAULT_UPDATE_LIMIT);
    }

    #[test]
    fn parse_ron() {
        let config =
            PipelineConfig::parse("(default_limit: 8, record_transactions: false)", Format::Ron)
                .unwrap();
        assert_eq!(config.default_limit, 8);
        assert!(!config.record_transactions);
    }

    #[test]
    fn parse_json() {
        let config = PipelineConfig::parse(r#"{"default_limit": 3}"#, Format::Json).unwrap();
        assert_eq!(config.default_limit, 3);
    }

    #[test]
    fn parse_error_reports_format() {
        let err = PipelineConfig::parse("default_limit = [", Format::Toml).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: Format::Toml, .. }));
    }

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("a/pipeline.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("pipeline.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("pipeline.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("pipeline.yaml")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = std::env::temp_dir().join(format!("sponge-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pipeline.toml");
        std::fs::write(&path, "default_limit = 16\n").unwrap();
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.default_limit, 16);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = PipelineConfig::load(Path::new("/nonexistent/sponge/pipeline.ron")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
