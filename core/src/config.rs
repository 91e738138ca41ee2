use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pagination::ListOptions;
use crate::playback::EngineConfig;

/// Application configuration, read from `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub list: ListConfig,
    pub engine: EngineSettings,
    pub embed: EmbedConfig,
    pub catalog: CatalogConfig,
    /// Command used to hand a video off for playback (e.g. "mpv")
    pub external_player: Option<String>,
}

/// Course list behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    pub page_size: usize,
    /// Rows from the end of the list that trigger loading more
    pub scroll_threshold: usize,
    /// Skeleton delay before a batch appears, in milliseconds
    pub load_delay_ms: u64,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_size: 12,
            scroll_threshold: 3,
            load_delay_ms: 250,
        }
    }
}

/// Adaptive-stream engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Parse manifests on a blocking worker instead of the caller
    pub worker_parsing: bool,
    pub low_latency: bool,
    /// Seconds of already played media the engine keeps
    pub back_buffer_secs: u32,
    /// Whether the surface plays HLS itself, bypassing the engine
    pub native_adaptive: bool,
    pub request_timeout_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            worker_parsing: true,
            low_latency: false,
            back_buffer_secs: 90,
            native_adaptive: false,
            request_timeout_secs: 20,
        }
    }
}

/// Third-party embed settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Player url for id-in-path embeds, `{id}` is replaced
    pub player_url: String,
    /// Player url for archive items, `{id}` is replaced
    pub archive_url: String,
    /// Helper program that makes embed urls playable
    pub helper: String,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            player_url: "https://www.dailymotion.com/embed/video/{id}".to_string(),
            archive_url: "https://archive.org/embed/{id}".to_string(),
            helper: "yt-dlp".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory holding `courses.json` and `categories.json`
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load the config file at `path`. A missing file gives the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.list.page_size == 0 {
            return Err(ConfigError::Invalid("list.page_size must be at least 1".into()));
        }
        for (key, template) in [
            ("embed.player_url", &self.embed.player_url),
            ("embed.archive_url", &self.embed.archive_url),
        ] {
            if !template.contains("{id}") {
                return Err(ConfigError::Invalid(format!("{key} must contain {{id}}")));
            }
        }
        Ok(())
    }

    pub fn list_options(&self) -> ListOptions {
        ListOptions {
            page_size: self.list.page_size.max(1),
            scroll_threshold: self.list.scroll_threshold,
            load_delay: Duration::from_millis(self.list.load_delay_ms),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            worker_parsing: self.engine.worker_parsing,
            low_latency: self.engine.low_latency,
            back_buffer_secs: self.engine.back_buffer_secs,
            request_timeout: Duration::from_secs(self.engine.request_timeout_secs),
        }
    }
}
