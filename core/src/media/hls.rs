use std::time::Duration;

use log::{debug, info, warn};
use m3u8_rs::Playlist;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::PlaybackError;
use crate::playback::{
    AdaptiveEngine, EngineConfig, EngineEvents, EngineFactory, ManifestInfo, MediaSurface,
    SurfaceSource,
};

/// Builds [`HlsEngine`]s sharing one HTTP client
#[derive(Clone)]
pub struct HlsEngineFactory {
    client: reqwest::Client,
    runtime: Option<Handle>,
}

impl HlsEngineFactory {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("courseplayer/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            runtime: Handle::try_current().ok(),
        })
    }

    /// Spawn engine work on `runtime` instead of the ambient one
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }
}

impl EngineFactory for HlsEngineFactory {
    type Engine = HlsEngine;

    fn create(&mut self, config: &EngineConfig, events: EngineEvents) -> HlsEngine {
        debug!(
            "New HLS engine {} (worker parsing: {}, low latency: {}, back buffer: {}s)",
            events.handle(),
            config.worker_parsing,
            config.low_latency,
            config.back_buffer_secs
        );
        HlsEngine {
            client: self.client.clone(),
            runtime: self.runtime.clone(),
            config: config.clone(),
            events,
            task: None,
        }
    }
}

/// Loads and parses an HLS manifest in the background
pub struct HlsEngine {
    client: reqwest::Client,
    runtime: Option<Handle>,
    config: EngineConfig,
    events: EngineEvents,
    task: Option<JoinHandle<()>>,
}

impl AdaptiveEngine for HlsEngine {
    fn attach(&mut self, source: &str, surface: &mut dyn MediaSurface) {
        self.destroy();
        surface.set_source(Some(SurfaceSource::Engine {
            handle: self.events.handle(),
            url: source.to_string(),
        }));

        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            self.events
                .error(PlaybackError::fatal("no async runtime available for the stream engine"));
            return;
        };

        let client = self.client.clone();
        let config = self.config.clone();
        let events = self.events.clone();
        let url = source.to_string();
        self.task = Some(runtime.spawn(async move {
            match load_manifest(&client, &url, &config).await {
                Ok(info) => events.ready(info),
                Err(e) => events.error(e),
            }
        }));
    }

    fn destroy(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("Aborting manifest load of {}", self.events.handle());
            task.abort();
        }
    }
}

impl Drop for HlsEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

async fn load_manifest(
    client: &reqwest::Client,
    url: &str,
    config: &EngineConfig,
) -> Result<ManifestInfo, PlaybackError> {
    let body = fetch(client, url).await?;
    debug!("Fetched {} bytes of manifest from {}", body.len(), url);

    let info = if config.worker_parsing {
        let config = config.clone();
        tokio::task::spawn_blocking(move || parse_manifest(&body, &config))
            .await
            .map_err(|e| PlaybackError::fatal(format!("manifest worker failed: {e}")))??
    } else {
        parse_manifest(&body, config)?
    };
    info!("Manifest {} parsed", url);
    Ok(info)
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, PlaybackError> {
    let response = client.get(url).send().await.map_err(classify_request_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(PlaybackError::network(format!("manifest request returned {status}")));
    }
    let body = response.bytes().await.map_err(classify_request_error)?;
    Ok(body.to_vec())
}

fn classify_request_error(e: reqwest::Error) -> PlaybackError {
    if e.is_builder() {
        PlaybackError::fatal(format!("invalid manifest url: {e}"))
    } else {
        warn!("Manifest request failed: {}", e);
        PlaybackError::network(e.to_string())
    }
}

/// Parse an HLS playlist into the summary the player shows.
///
/// Anything that is not a playlist, or a finished playlist without
/// segments, is a media-class error.
pub fn parse_manifest(bytes: &[u8], config: &EngineConfig) -> Result<ManifestInfo, PlaybackError> {
    if !bytes.trim_ascii_start().starts_with(b"#EXTM3U") {
        return Err(PlaybackError::media("not an HLS playlist"));
    }

    match m3u8_rs::parse_playlist_res(bytes) {
        Ok(Playlist::MasterPlaylist(master)) => {
            if master.variants.is_empty() {
                return Err(PlaybackError::media("master playlist has no variants"));
            }
            Ok(ManifestInfo {
                variants: master.variants.len(),
                segments: 0,
                duration_secs: 0.0,
                retained_segments: 0,
                live: false,
            })
        }
        Ok(Playlist::MediaPlaylist(media)) => {
            let segments = media.segments.len();
            if segments == 0 && media.end_list {
                return Err(PlaybackError::media("media playlist has no segments"));
            }
            let duration_secs: f64 = media.segments.iter().map(|s| s.duration as f64).sum();
            Ok(ManifestInfo {
                variants: 0,
                segments,
                duration_secs,
                retained_segments: retained_segments(segments, duration_secs, config.back_buffer_secs),
                live: !media.end_list,
            })
        }
        Err(e) => {
            debug!("Playlist parse error: {:?}", e);
            Err(PlaybackError::media("unreadable HLS playlist"))
        }
    }
}

fn retained_segments(segments: usize, duration_secs: f64, back_buffer_secs: u32) -> usize {
    if segments == 0 || duration_secs <= 0.0 {
        return 0;
    }
    let average = duration_secs / segments as f64;
    let fit = (back_buffer_secs as f64 / average).ceil() as usize;
    fit.min(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;

    const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
low/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2000000,RESOLUTION=1280x720
mid/index.m3u8
";

    const VOD: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:10
#EXT-X-MEDIA-SEQUENCE:0
#EXTINF:10.0,
seg0.ts
#EXTINF:10.0,
seg1.ts
#EXTINF:10.0,
seg2.ts
#EXTINF:10.0,
seg3.ts
#EXT-X-ENDLIST
";

    const LIVE: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:6
#EXT-X-MEDIA-SEQUENCE:100
#EXTINF:6.0,
seg100.ts
#EXTINF:6.0,
seg101.ts
";

    #[test]
    fn test_master_playlist() {
        let info = parse_manifest(MASTER.as_bytes(), &EngineConfig::default()).unwrap();
        assert_eq!(info.variants, 2);
        assert!(!info.live);
    }

    #[test]
    fn test_vod_playlist_back_buffer() {
        let config = EngineConfig {
            back_buffer_secs: 15,
            ..EngineConfig::default()
        };
        let info = parse_manifest(VOD.as_bytes(), &config).unwrap();
        assert_eq!(info.segments, 4);
        assert!((info.duration_secs - 40.0).abs() < 1e-6);
        assert_eq!(info.retained_segments, 2);
        assert!(!info.live);

        let info = parse_manifest(VOD.as_bytes(), &EngineConfig::default()).unwrap();
        assert_eq!(info.retained_segments, 4);
    }

    #[test]
    fn test_live_playlist() {
        let info = parse_manifest(LIVE.as_bytes(), &EngineConfig::default()).unwrap();
        assert!(info.live);
        assert_eq!(info.segments, 2);
    }

    #[test]
    fn test_garbage_is_media_error() {
        for body in ["<html>404</html>", "", "\u{0}\u{1}binary"] {
            let err = parse_manifest(body.as_bytes(), &EngineConfig::default()).unwrap_err();
            assert_eq!(err.class, ErrorClass::Media, "{body:?}");
        }
    }

    #[test]
    fn test_attach_without_runtime_reports_fatal() {
        // built outside any runtime, so there is nothing to spawn on
        let factory = HlsEngineFactory::new(Duration::from_secs(1)).unwrap();
        let mut controller = crate::playback::PlaybackController::new(
            factory,
            NullSurface,
            EngineConfig::default(),
        );
        controller.load("https://cdn.invalid/a.m3u8");
        controller.poll_events();
        assert_eq!(controller.state(), crate::playback::SessionState::Error);
        assert_eq!(controller.last_error().unwrap().class, ErrorClass::Fatal);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let factory = HlsEngineFactory::new(Duration::from_secs(2)).unwrap();
        let mut controller = crate::playback::PlaybackController::new(
            factory,
            NullSurface,
            EngineConfig::default(),
        );
        controller.load("http://127.0.0.1:9/missing.m3u8");

        for _ in 0..100 {
            controller.poll_events();
            if controller.state() != crate::playback::SessionState::Attaching {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(controller.state(), crate::playback::SessionState::Error);
        assert_eq!(controller.last_error().unwrap().class, ErrorClass::Network);
    }

    struct NullSurface;

    impl MediaSurface for NullSurface {
        fn supports_native_adaptive(&self) -> bool {
            false
        }

        fn set_source(&mut self, _source: Option<SurfaceSource>) {}
    }
}
