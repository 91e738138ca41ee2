use log::info;
use parking_lot::Mutex;

use crate::pagination::ListMode;

/// Side-channel events; nothing depends on their delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsEvent {
    VideoSelected {
        category: String,
        course: String,
        index: usize,
    },
    PageViewed {
        page: usize,
        mode: ListMode,
    },
}

/// Receives analytics events, fire-and-forget
pub trait AnalyticsSink: Send {
    fn record(&self, event: &AnalyticsEvent);
}

/// Writes events to the `analytics` log target
#[derive(Debug, Default)]
pub struct LogSink;

impl AnalyticsSink for LogSink {
    fn record(&self, event: &AnalyticsEvent) {
        match event {
            AnalyticsEvent::VideoSelected {
                category,
                course,
                index,
            } => info!(target: "analytics", "video_selected {}/{} #{}", category, course, index),
            AnalyticsEvent::PageViewed { page, mode } => {
                info!(target: "analytics", "page_viewed {} ({:?})", page, mode)
            }
        }
    }
}

/// Keeps events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().clone()
    }
}

impl AnalyticsSink for MemorySink {
    fn record(&self, event: &AnalyticsEvent) {
        self.events.lock().push(event.clone());
    }
}

impl<T: AnalyticsSink + Sync> AnalyticsSink for std::sync::Arc<T> {
    fn record(&self, event: &AnalyticsEvent) {
        (**self).record(event);
    }
}
