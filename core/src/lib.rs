pub mod analytics;
pub mod catalog;
pub mod config;
pub mod crawler;
pub mod error;
pub mod media;
pub mod navigation;
pub mod pagination;
pub mod playback;
pub mod player;

// Re-exports
pub use analytics::{AnalyticsEvent, AnalyticsSink, LogSink, MemorySink};
pub use catalog::{Catalog, Category, Course, Video, VideoType};
pub use config::Config;
pub use crawler::{RuntimeContext, Verdict, classify};
pub use error::{CatalogError, ConfigError, ErrorClass, PlaybackError};
pub use media::{HlsEngineFactory, Mechanism, Resolution, SdkLoader, resolve};
pub use navigation::{NavigationIntent, intent_for, page_route, parse_route, route_for};
pub use pagination::{ListMode, ListOptions, ListSession, ListView, ScrollPosition};
pub use playback::{EngineConfig, MediaSurface, PlaybackController, SessionState, SurfaceSource};
pub use player::{PlayerView, SurfaceView, VideoPlayer};
