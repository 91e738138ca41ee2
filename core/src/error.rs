use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading catalog files
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Broad class of a fatal playback failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Manifest or segments could not be retrieved
    Network,
    /// Format or codec not supported
    Media,
    /// Anything else the engine reports as fatal
    Fatal,
}

/// A fatal error reported by an adaptive-stream engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{class:?} error: {message}")]
pub struct PlaybackError {
    pub class: ErrorClass,
    pub message: String,
}

impl PlaybackError {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Network, message)
    }

    pub fn media(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Media, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Fatal, message)
    }

    /// Human readable text shown next to the retry control
    pub fn user_message(&self) -> &'static str {
        match self.class {
            ErrorClass::Network => {
                "Network problem: the video could not be loaded. Check your connection and retry."
            }
            ErrorClass::Media => "This video format is not supported.",
            ErrorClass::Fatal => "Something went wrong while playing this video.",
        }
    }
}
