use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{ErrorClass, PlaybackError};
use crate::playback::*;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Create(HandleId),
    Attach(HandleId, String),
    Destroy(HandleId),
}

type Log = Rc<RefCell<Vec<Call>>>;

#[derive(Default)]
struct FakeFactory {
    log: Log,
    sinks: Rc<RefCell<Vec<EngineEvents>>>,
}

struct FakeEngine {
    handle: HandleId,
    log: Log,
    destroyed: bool,
}

impl AdaptiveEngine for FakeEngine {
    fn attach(&mut self, source: &str, surface: &mut dyn MediaSurface) {
        self.log
            .borrow_mut()
            .push(Call::Attach(self.handle, source.to_string()));
        surface.set_source(Some(SurfaceSource::Engine {
            handle: self.handle,
            url: source.to_string(),
        }));
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            self.log.borrow_mut().push(Call::Destroy(self.handle));
        }
    }
}

impl EngineFactory for FakeFactory {
    type Engine = FakeEngine;

    fn create(&mut self, _config: &EngineConfig, events: EngineEvents) -> FakeEngine {
        let handle = events.handle();
        self.log.borrow_mut().push(Call::Create(handle));
        self.sinks.borrow_mut().push(events);
        FakeEngine {
            handle,
            log: Rc::clone(&self.log),
            destroyed: false,
        }
    }
}

#[derive(Default)]
struct FakeSurface {
    native: bool,
    source: Option<SurfaceSource>,
}

impl MediaSurface for FakeSurface {
    fn supports_native_adaptive(&self) -> bool {
        self.native
    }

    fn set_source(&mut self, source: Option<SurfaceSource>) {
        self.source = source;
    }
}

struct Harness {
    controller: PlaybackController<FakeFactory, FakeSurface>,
    log: Log,
    sinks: Rc<RefCell<Vec<EngineEvents>>>,
}

fn harness(native: bool) -> Harness {
    let factory = FakeFactory::default();
    let log = Rc::clone(&factory.log);
    let sinks = Rc::clone(&factory.sinks);
    let surface = FakeSurface {
        native,
        source: None,
    };
    Harness {
        controller: PlaybackController::new(factory, surface, EngineConfig::default()),
        log,
        sinks,
    }
}

fn manifest() -> ManifestInfo {
    ManifestInfo {
        variants: 3,
        segments: 0,
        duration_secs: 0.0,
        retained_segments: 0,
        live: false,
    }
}

impl Harness {
    fn sink(&self, i: usize) -> EngineEvents {
        self.sinks.borrow()[i].clone()
    }

    fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }
}

#[test]
fn test_attach_then_ready() {
    let mut h = harness(false);
    h.controller.load("https://cdn/a.m3u8");
    assert_eq!(h.controller.state(), SessionState::Attaching);
    assert!(matches!(
        h.controller.surface().source,
        Some(SurfaceSource::Engine { ref url, .. }) if url == "https://cdn/a.m3u8"
    ));

    h.sink(0).ready(manifest());
    assert_eq!(h.controller.poll_events(), 1);
    assert_eq!(h.controller.state(), SessionState::Attached);
    assert_eq!(h.controller.manifest().unwrap().variants, 3);
}

#[test]
fn test_switching_videos_alternates_teardown_and_attach() {
    let mut h = harness(false);
    h.controller.load("https://cdn/a.m3u8");
    h.controller.load("https://cdn/b.m3u8");
    h.controller.load("https://cdn/a.m3u8");

    let calls = h.calls();
    let ids: Vec<HandleId> = h.sinks.borrow().iter().map(|s| s.handle()).collect();
    assert_eq!(
        calls,
        vec![
            Call::Create(ids[0]),
            Call::Attach(ids[0], "https://cdn/a.m3u8".to_string()),
            Call::Destroy(ids[0]),
            Call::Create(ids[1]),
            Call::Attach(ids[1], "https://cdn/b.m3u8".to_string()),
            Call::Destroy(ids[1]),
            Call::Create(ids[2]),
            Call::Attach(ids[2], "https://cdn/a.m3u8".to_string()),
        ]
    );
}

#[test]
fn test_never_two_live_engines() {
    let mut h = harness(false);
    for i in 0..10 {
        h.controller.load(&format!("https://cdn/{i}.m3u8"));
        if i % 3 == 0 {
            h.controller.teardown();
        }
    }
    drop(h.controller);

    let mut live = 0i32;
    for call in h.log.borrow().iter() {
        match call {
            Call::Create(_) => {
                live += 1;
                assert_eq!(live, 1, "two engines alive at once");
            }
            Call::Destroy(_) => live -= 1,
            Call::Attach(..) => {}
        }
    }
    assert_eq!(live, 0, "engine leaked past drop");
}

#[test]
fn test_teardown_is_idempotent() {
    let mut h = harness(false);
    h.controller.teardown();
    assert!(h.calls().is_empty());

    h.controller.load("https://cdn/a.m3u8");
    h.controller.teardown();
    h.controller.teardown();
    let destroys = h
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::Destroy(_)))
        .count();
    assert_eq!(destroys, 1);
    assert_eq!(h.controller.state(), SessionState::Idle);
    assert!(h.controller.surface().source.is_none());
}

#[test]
fn test_late_events_from_destroyed_engine_are_ignored() {
    let mut h = harness(false);
    h.controller.load("https://cdn/a.m3u8");
    let stale = h.sink(0);
    h.controller.load("https://cdn/b.m3u8");

    stale.ready(manifest());
    stale.error(PlaybackError::network("late"));
    assert_eq!(h.controller.poll_events(), 0);
    assert_eq!(h.controller.state(), SessionState::Attaching);
    assert!(h.controller.last_error().is_none());

    h.controller.teardown();
    h.sink(1).ready(manifest());
    assert_eq!(h.controller.poll_events(), 0);
    assert_eq!(h.controller.state(), SessionState::Idle);
}

#[test]
fn test_fatal_error_stops_and_waits_for_retry() {
    let mut h = harness(false);
    h.controller.load("https://cdn/a.m3u8");
    h.sink(0).error(PlaybackError::media("codec"));
    h.controller.poll_events();

    assert_eq!(h.controller.state(), SessionState::Error);
    assert_eq!(h.controller.last_error().unwrap().class, ErrorClass::Media);
    assert!(h.controller.active_handle().is_none());
    assert!(h.controller.surface().source.is_none());
    assert_eq!(h.calls().last(), Some(&Call::Destroy(h.sink(0).handle())));

    assert!(h.controller.retry());
    assert_eq!(h.controller.state(), SessionState::Attaching);
    assert!(h.controller.last_error().is_none());
    assert_eq!(
        h.calls().last(),
        Some(&Call::Attach(h.sink(1).handle(), "https://cdn/a.m3u8".to_string()))
    );
}

#[test]
fn test_retry_only_from_error() {
    let mut h = harness(false);
    assert!(!h.controller.retry());
    h.controller.load("https://cdn/a.m3u8");
    assert!(!h.controller.retry());
    assert_eq!(h.sinks.borrow().len(), 1);
}

#[test]
fn test_error_classes_have_distinct_messages() {
    let network = PlaybackError::network("x").user_message();
    let media = PlaybackError::media("x").user_message();
    let fatal = PlaybackError::fatal("x").user_message();
    assert_ne!(network, media);
    assert_ne!(media, fatal);
    assert_ne!(network, fatal);
}

#[test]
fn test_native_surface_bypasses_engine() {
    let mut h = harness(true);
    h.controller.load("https://cdn/a.m3u8");
    assert_eq!(h.controller.state(), SessionState::Native);
    assert!(h.calls().is_empty());
    assert_eq!(
        h.controller.surface().source,
        Some(SurfaceSource::Native {
            url: "https://cdn/a.m3u8".to_string()
        })
    );

    h.controller.teardown();
    assert!(h.controller.surface().source.is_none());
}

#[test]
fn test_drop_destroys_engine() {
    let h = harness(false);
    let Harness {
        mut controller,
        log,
        ..
    } = h;
    controller.load("https://cdn/a.m3u8");
    drop(controller);
    assert!(matches!(log.borrow().last(), Some(Call::Destroy(_))));
}
