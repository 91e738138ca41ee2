//! Lifecycle of the adaptive-stream engine behind a player.
//!
//! A [`PlaybackController`] owns the media surface and at most one engine
//! instance. Engines are created through an [`EngineFactory`] and report back
//! through an [`EngineEvents`] sink tagged with the [`HandleId`] they were
//! created with. The controller drains those events on [`poll_events`] and
//! drops anything coming from a handle that is no longer current, so a
//! destroyed engine can never move the session.
//!
//! ```text
//! Idle -> Attaching -> Attached
//!           |             |
//!           +--> Error <--+      (retry: Error -> Attaching)
//! any state --teardown--> Idle
//! ```
//!
//! [`poll_events`]: PlaybackController::poll_events

#[cfg(test)]
mod tests;

use std::fmt;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::error::PlaybackError;

/// Identity of one engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine#{}", self.0)
    }
}

/// Fixed configuration every engine instance is created with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Parse manifests on a background worker
    pub worker_parsing: bool,
    pub low_latency: bool,
    /// Seconds of played media retained behind the playhead
    pub back_buffer_secs: u32,
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_parsing: true,
            low_latency: false,
            back_buffer_secs: 90,
            request_timeout: Duration::from_secs(20),
        }
    }
}

/// What the engine learned from a parsed manifest
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestInfo {
    /// Bitrate variants of a master playlist, 0 for a media playlist
    pub variants: usize,
    pub segments: usize,
    pub duration_secs: f64,
    /// Segments the back buffer keeps once played
    pub retained_segments: usize,
    /// No end-list tag, the playlist keeps growing
    pub live: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEventKind {
    Ready(ManifestInfo),
    Error(PlaybackError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub handle: HandleId,
    pub kind: EngineEventKind,
}

/// Ready and error callbacks handed to an engine at creation
#[derive(Debug, Clone)]
pub struct EngineEvents {
    handle: HandleId,
    tx: UnboundedSender<EngineEvent>,
}

impl EngineEvents {
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    pub fn ready(&self, info: ManifestInfo) {
        self.emit(EngineEventKind::Ready(info));
    }

    pub fn error(&self, error: PlaybackError) {
        self.emit(EngineEventKind::Error(error));
    }

    fn emit(&self, kind: EngineEventKind) {
        // the controller may already be gone
        let _ = self.tx.send(EngineEvent {
            handle: self.handle,
            kind,
        });
    }
}

/// What currently feeds the media surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceSource {
    /// An engine instance streams `url` into the surface
    Engine { handle: HandleId, url: String },
    /// The surface plays the manifest on its own
    Native { url: String },
}

/// The visible playback area
pub trait MediaSurface {
    /// Can the surface play adaptive streams without an engine
    fn supports_native_adaptive(&self) -> bool;

    fn set_source(&mut self, source: Option<SurfaceSource>);
}

/// An adaptive-stream engine instance
pub trait AdaptiveEngine {
    /// Load the manifest at `source` and attach to `surface`. Results arrive
    /// asynchronously through the instance's [`EngineEvents`].
    fn attach(&mut self, source: &str, surface: &mut dyn MediaSurface);

    /// Stop all work and release resources. Must be idempotent.
    fn destroy(&mut self);
}

/// Creates engine instances
pub trait EngineFactory {
    type Engine: AdaptiveEngine;

    fn create(&mut self, config: &EngineConfig, events: EngineEvents) -> Self::Engine;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// Engine created, manifest not parsed yet
    Attaching,
    Attached,
    /// Surface plays the stream itself, no engine owned
    Native,
    /// Stopped on a fatal engine error, waiting for a retry
    Error,
}

/// Owns the media surface and the single active engine of one player
pub struct PlaybackController<F: EngineFactory, S: MediaSurface> {
    factory: F,
    surface: S,
    config: EngineConfig,
    engine: Option<(HandleId, F::Engine)>,
    state: SessionState,
    source: Option<String>,
    last_error: Option<PlaybackError>,
    manifest: Option<ManifestInfo>,
    next_handle: u64,
    tx: UnboundedSender<EngineEvent>,
    rx: UnboundedReceiver<EngineEvent>,
}

impl<F: EngineFactory, S: MediaSurface> PlaybackController<F, S> {
    pub fn new(factory: F, surface: S, config: EngineConfig) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            factory,
            surface,
            config,
            engine: None,
            state: SessionState::Idle,
            source: None,
            last_error: None,
            manifest: None,
            next_handle: 0,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn last_error(&self) -> Option<&PlaybackError> {
        self.last_error.as_ref()
    }

    pub fn manifest(&self) -> Option<&ManifestInfo> {
        self.manifest.as_ref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Handle of the engine currently owned, if any
    pub fn active_handle(&self) -> Option<HandleId> {
        self.engine.as_ref().map(|(handle, _)| *handle)
    }

    /// Start playing `source`, replacing whatever played before.
    ///
    /// The previous engine is always destroyed before a new one is created.
    pub fn load(&mut self, source: &str) {
        self.teardown();
        self.source = Some(source.to_string());
        self.attach();
    }

    /// Re-attach the current source after a fatal error. Only valid in the
    /// error state; returns whether a new attach started.
    pub fn retry(&mut self) -> bool {
        if self.state != SessionState::Error {
            debug!("Retry ignored in {:?} state", self.state);
            return false;
        }
        info!("Retrying playback of {:?}", self.source);
        self.teardown_engine();
        self.last_error = None;
        self.attach();
        true
    }

    /// Destroy the engine, clear the surface and go back to idle.
    /// Calling it on an idle session does nothing.
    pub fn teardown(&mut self) {
        self.teardown_engine();
        if self.state != SessionState::Idle {
            self.surface.set_source(None);
            debug!("Playback session back to idle");
        }
        self.state = SessionState::Idle;
        self.source = None;
        self.last_error = None;
        self.manifest = None;
    }

    /// Apply pending engine events. Events from stale handles are dropped.
    /// Returns the number of events applied.
    pub fn poll_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            if self.active_handle() != Some(event.handle) {
                debug!("Ignoring event from stale {}", event.handle);
                continue;
            }
            match event.kind {
                EngineEventKind::Ready(info) => {
                    if self.state == SessionState::Attaching {
                        info!(
                            "{} attached: {} variants, {} segments, live: {}",
                            event.handle, info.variants, info.segments, info.live
                        );
                        self.manifest = Some(info);
                        self.state = SessionState::Attached;
                    }
                }
                EngineEventKind::Error(error) => {
                    warn!("{} failed: {}", event.handle, error);
                    self.teardown_engine();
                    self.surface.set_source(None);
                    self.manifest = None;
                    self.last_error = Some(error);
                    self.state = SessionState::Error;
                }
            }
            applied += 1;
        }
        applied
    }

    fn attach(&mut self) {
        let Some(source) = self.source.clone() else {
            return;
        };

        if self.surface.supports_native_adaptive() {
            debug!("Surface plays {} natively, no engine", source);
            self.surface
                .set_source(Some(SurfaceSource::Native { url: source }));
            self.state = SessionState::Native;
            return;
        }

        let handle = HandleId(self.next_handle);
        self.next_handle += 1;
        let events = EngineEvents {
            handle,
            tx: self.tx.clone(),
        };

        debug!("Creating {} for {}", handle, source);
        let mut engine = self.factory.create(&self.config, events);
        engine.attach(&source, &mut self.surface);
        self.engine = Some((handle, engine));
        self.state = SessionState::Attaching;
    }

    fn teardown_engine(&mut self) {
        if let Some((handle, mut engine)) = self.engine.take() {
            debug!("Destroying {}", handle);
            engine.destroy();
        }
    }
}

impl<F: EngineFactory, S: MediaSurface> Drop for PlaybackController<F, S> {
    fn drop(&mut self) {
        self.teardown_engine();
    }
}
