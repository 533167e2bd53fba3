use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn one file's bytes into a [`ConfigValue`](super::ConfigValue).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error("read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid {encoding} content: {reason}")]
    Encoding {
        encoding: &'static str,
        reason: String,
    },

    #[error("unknown encoding label: {0}")]
    UnknownEncoding(String),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported structure: {0}")]
    Structure(String),
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to parse config file '{path}': {source}")]
    FileParsing {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("environment variable '{0}' is not set and no default was given")]
    MissingEnvVar(String),

    #[error("failed to deserialize config: {0}")]
    Deserialize(#[source] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn parsing(path: impl Into<PathBuf>, source: impl Into<ParseError>) -> Self {
        Self::FileParsing {
            path: path.into(),
            source: source.into(),
        }
    }
}
