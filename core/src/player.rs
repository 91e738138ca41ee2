use log::{debug, warn};

use crate::analytics::{AnalyticsEvent, AnalyticsSink};
use crate::catalog::{Course, Video};
use crate::config::EmbedConfig;
use crate::error::PlaybackError;
use crate::media::{Mechanism, Resolution, resolve};
use crate::navigation::{NavigationIntent, route_for};
use crate::playback::{
    EngineConfig, EngineFactory, ManifestInfo, MediaSurface, PlaybackController, SessionState,
};

/// What the playback area shows for the active video
#[derive(Debug, PartialEq)]
pub enum SurfaceView<'a> {
    Adaptive {
        state: SessionState,
        error: Option<&'a PlaybackError>,
        manifest: Option<&'a ManifestInfo>,
    },
    Embed {
        provider: &'static str,
        id: &'a str,
        embed_url: &'a str,
    },
    Direct {
        url: &'a str,
    },
}

/// Render state of a [`VideoPlayer`]
#[derive(Debug, PartialEq)]
pub enum PlayerView<'a> {
    Unmounted,
    /// Redirect course, only an outbound link is shown
    Redirect { url: &'a str },
    NoVideos,
    Playing {
        course: &'a Course,
        videos: &'a [Video],
        active: usize,
        title: &'a str,
        surface: SurfaceView<'a>,
    },
}

/// Player for one mounted course: resolves the active video and drives the
/// playback controller for adaptive streams.
pub struct VideoPlayer<F: EngineFactory, S: MediaSurface> {
    controller: PlaybackController<F, S>,
    embed: EmbedConfig,
    analytics: Box<dyn AnalyticsSink>,
    course: Option<Course>,
    resolution: Option<Resolution>,
}

impl<F: EngineFactory, S: MediaSurface> VideoPlayer<F, S> {
    pub fn new(
        factory: F,
        surface: S,
        engine: EngineConfig,
        embed: EmbedConfig,
        analytics: Box<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            controller: PlaybackController::new(factory, surface, engine),
            embed,
            analytics,
            course: None,
            resolution: None,
        }
    }

    pub fn controller(&self) -> &PlaybackController<F, S> {
        &self.controller
    }

    pub fn course(&self) -> Option<&Course> {
        self.course.as_ref()
    }

    /// Index of the active video, if the course has a playable one
    pub fn active_index(&self) -> Option<usize> {
        match self.resolution {
            Some(Resolution::Video { index, .. }) => Some(index),
            _ => None,
        }
    }

    pub fn mechanism(&self) -> Option<&Mechanism> {
        match &self.resolution {
            Some(Resolution::Video { mechanism, .. }) => Some(mechanism),
            _ => None,
        }
    }

    /// Show `course`, starting at `index`
    pub fn mount(&mut self, course: Course, index: usize) {
        debug!(
            "Mounting '{}/{}' at video {}",
            course.course_category, course.course_name, index
        );
        self.resolution = Some(resolve(&course, index, &self.embed));
        self.course = Some(course);
        self.apply();
    }

    /// Switch to another video of the mounted course. Returns whether the
    /// active video changed.
    pub fn select_video(&mut self, index: usize) -> bool {
        let Some(course) = &self.course else {
            return false;
        };
        if index >= course.videos.len() {
            warn!(
                "Video {} out of range for '{}' ({} videos)",
                index,
                course.course_name,
                course.videos.len()
            );
            return false;
        }
        if !matches!(self.resolution, Some(Resolution::Video { .. }))
            || self.active_index() == Some(index)
        {
            return false;
        }

        self.analytics.record(&AnalyticsEvent::VideoSelected {
            category: course.course_category.clone(),
            course: course.course_name.clone(),
            index,
        });
        self.resolution = Some(resolve(course, index, &self.embed));
        self.apply();
        true
    }

    pub fn next_video(&mut self) -> bool {
        match self.active_index() {
            Some(index) => self.select_video(index + 1),
            None => false,
        }
    }

    pub fn prev_video(&mut self) -> bool {
        match self.active_index() {
            Some(index) if index > 0 => self.select_video(index - 1),
            _ => false,
        }
    }

    /// User retry after a playback error
    pub fn retry(&mut self) -> bool {
        self.controller.retry()
    }

    /// Apply pending engine events
    pub fn poll(&mut self) -> usize {
        self.controller.poll_events()
    }

    pub fn unmount(&mut self) {
        self.controller.teardown();
        self.course = None;
        self.resolution = None;
    }

    /// Where opening the mounted course leads
    pub fn navigation(&self) -> Option<NavigationIntent> {
        let course = self.course.as_ref()?;
        match self.resolution.as_ref()? {
            Resolution::Redirect { url } => Some(NavigationIntent::Outbound(url.clone())),
            Resolution::NoVideos => Some(NavigationIntent::Route(route_for(course, None))),
            Resolution::Video { index, .. } => {
                Some(NavigationIntent::Route(route_for(course, Some(*index))))
            }
        }
    }

    pub fn view(&self) -> PlayerView<'_> {
        let (Some(course), Some(resolution)) = (&self.course, &self.resolution) else {
            return PlayerView::Unmounted;
        };

        match resolution {
            Resolution::Redirect { url } => PlayerView::Redirect { url },
            Resolution::NoVideos => PlayerView::NoVideos,
            Resolution::Video {
                index,
                title,
                mechanism,
            } => {
                let surface = match mechanism {
                    Mechanism::AdaptiveStream { .. } => SurfaceView::Adaptive {
                        state: self.controller.state(),
                        error: self.controller.last_error(),
                        manifest: self.controller.manifest(),
                    },
                    Mechanism::Embed { id, embed_url } => SurfaceView::Embed {
                        provider: "Embedded player",
                        id,
                        embed_url,
                    },
                    Mechanism::Archive { id, embed_url } => SurfaceView::Embed {
                        provider: "Archive player",
                        id,
                        embed_url,
                    },
                    Mechanism::DirectFile { url } => SurfaceView::Direct { url },
                    Mechanism::ExternalRedirect { url } => SurfaceView::Direct { url },
                };
                PlayerView::Playing {
                    course,
                    videos: &course.videos,
                    active: *index,
                    title,
                    surface,
                }
            }
        }
    }

    /// Drive the controller from the current resolution
    fn apply(&mut self) {
        match &self.resolution {
            Some(Resolution::Video {
                mechanism: Mechanism::AdaptiveStream { manifest },
                ..
            }) => {
                let manifest = manifest.clone();
                self.controller.load(&manifest);
            }
            _ => self.controller.teardown(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    use super::*;
    use crate::analytics::MemorySink;
    use crate::catalog::VideoType;
    use crate::playback::{AdaptiveEngine, EngineEvents, SurfaceSource};

    #[derive(Default, Clone)]
    struct Counter {
        creates: Rc<RefCell<usize>>,
        destroys: Rc<RefCell<usize>>,
    }

    struct CountingEngine(Counter, bool);

    impl AdaptiveEngine for CountingEngine {
        fn attach(&mut self, _source: &str, _surface: &mut dyn MediaSurface) {}

        fn destroy(&mut self) {
            if !self.1 {
                self.1 = true;
                *self.0.destroys.borrow_mut() += 1;
            }
        }
    }

    impl EngineFactory for Counter {
        type Engine = CountingEngine;

        fn create(&mut self, _config: &EngineConfig, _events: EngineEvents) -> CountingEngine {
            *self.creates.borrow_mut() += 1;
            CountingEngine(self.clone(), false)
        }
    }

    struct Surface;

    impl MediaSurface for Surface {
        fn supports_native_adaptive(&self) -> bool {
            false
        }

        fn set_source(&mut self, _source: Option<SurfaceSource>) {}
    }

    fn course(video_type: VideoType, urls: &[&str]) -> Course {
        Course {
            course_name: "intro".to_string(),
            course_category: "dsa".to_string(),
            video_type,
            videos: urls
                .iter()
                .map(|url| Video {
                    title: url.to_string(),
                    url: url.to_string(),
                })
                .collect(),
            redirect_url: Some("https://partner.example/intro".to_string()),
            des: None,
            image_of_course: None,
            instructor_name: None,
            cost: None,
            audio: None,
            subsection: None,
            homepage: false,
        }
    }

    fn player(counter: &Counter, sink: Arc<MemorySink>) -> VideoPlayer<Counter, Surface> {
        VideoPlayer::new(
            counter.clone(),
            Surface,
            EngineConfig::default(),
            EmbedConfig::default(),
            Box::new(sink),
        )
    }

    #[test]
    fn test_adaptive_course_switches_engines() {
        let counter = Counter::default();
        let sink = Arc::new(MemorySink::default());
        let mut p = player(&counter, Arc::clone(&sink));

        p.mount(course(VideoType::Hls, &["https://cdn/a.m3u8", "https://cdn/b.m3u8"]), 0);
        assert_eq!(*counter.creates.borrow(), 1);

        assert!(p.select_video(1));
        assert!(p.select_video(0));
        assert_eq!(*counter.creates.borrow(), 3);
        assert_eq!(*counter.destroys.borrow(), 2);

        // same index again is not a change
        assert!(!p.select_video(0));
        assert_eq!(*counter.creates.borrow(), 3);
        assert_eq!(sink.events().len(), 2);

        p.unmount();
        assert_eq!(*counter.destroys.borrow(), 3);
        assert_eq!(p.view(), PlayerView::Unmounted);
    }

    #[test]
    fn test_redirect_course_has_no_surface() {
        let counter = Counter::default();
        let mut p = player(&counter, Arc::new(MemorySink::default()));
        p.mount(course(VideoType::Redirect, &["https://cdn/a.m3u8"]), 0);

        assert_eq!(
            p.view(),
            PlayerView::Redirect {
                url: "https://partner.example/intro"
            }
        );
        assert_eq!(
            p.navigation(),
            Some(NavigationIntent::Outbound("https://partner.example/intro".to_string()))
        );
        assert!(!p.select_video(0));
        assert_eq!(*counter.creates.borrow(), 0);
    }

    #[test]
    fn test_empty_course_shows_no_videos() {
        let counter = Counter::default();
        let mut p = player(&counter, Arc::new(MemorySink::default()));
        p.mount(course(VideoType::Hls, &[]), 0);
        assert_eq!(p.view(), PlayerView::NoVideos);
        assert!(!p.next_video());
        assert!(!p.retry());
        assert_eq!(*counter.creates.borrow(), 0);
    }

    #[test]
    fn test_switching_to_non_adaptive_course_tears_down() {
        let counter = Counter::default();
        let mut p = player(&counter, Arc::new(MemorySink::default()));
        p.mount(course(VideoType::Hls, &["https://cdn/a.m3u8"]), 0);
        p.mount(course(VideoType::Archive, &["https://archive.org/details/talk"]), 0);

        assert_eq!(*counter.destroys.borrow(), 1);
        match p.view() {
            PlayerView::Playing {
                surface: SurfaceView::Embed { id, .. },
                ..
            } => assert_eq!(id, "talk"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(p.navigation(), Some(NavigationIntent::Route("/dsa/intro/0".to_string())));
    }

    #[test]
    fn test_out_of_range_selection_is_ignored() {
        let counter = Counter::default();
        let mut p = player(&counter, Arc::new(MemorySink::default()));
        p.mount(course(VideoType::Mp4, &["https://cdn/a.mp4", "https://cdn/b.mp4"]), 0);
        assert!(!p.select_video(5));
        assert!(p.next_video());
        assert!(!p.next_video());
        assert_eq!(p.active_index(), Some(1));
        assert!(p.prev_video());
        assert_eq!(p.active_index(), Some(0));
        assert_eq!(*counter.creates.borrow(), 0);
    }
}
