
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::debug;

use crate::crawler::Verdict;

/// Maximum number of numbered page controls shown at once
pub const MAX_PAGE_BUTTONS: usize = 7;

/// How a list session presents its items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// Fully enumerated pages reachable by plain links
    Paginated,
    /// Growing window driven by scroll proximity or "load more"
    Infinite,
}

impl ListMode {
    pub fn from_verdict(verdict: Verdict) -> Self {
        if verdict.is_crawler_like {
            ListMode::Paginated
        } else {
            ListMode::Infinite
        }
    }
}

/// Tunables for a list session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub page_size: usize,
    /// Distance from the end of the rendered list that triggers a load
    pub scroll_threshold: usize,
    /// Synthetic latency of a load, zero completes loads immediately
    pub load_delay: Duration,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page_size: 12,
            scroll_threshold: 3,
            load_delay: Duration::from_millis(250),
        }
    }
}

/// Scroll state reported by the host, in rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollPosition {
    pub offset: usize,
    pub viewport: usize,
    pub content: usize,
}

impl ScrollPosition {
    pub fn distance_to_end(&self) -> usize {
        self.content.saturating_sub(self.offset + self.viewport)
    }
}

pub fn total_pages(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1))
}

/// Clamp a requested page into `[1, max(1, total_pages)]`
pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// Item indices shown on `page` (1-based)
pub fn page_range(page: usize, page_size: usize, total: usize) -> Range<usize> {
    let page_size = page_size.max(1);
    let page = clamp_page(page, total_pages(total, page_size));
    let start = ((page - 1) * page_size).min(total);
    let end = (start + page_size).min(total);
    start..end
}

/// Page numbers to show as controls.
///
/// All pages when there are at most [`MAX_PAGE_BUTTONS`], otherwise a window
/// of that size centered on `current`, pinned to the first or last pages
/// near either end.
pub fn page_window(current: usize, total_pages: usize) -> Vec<usize> {
    if total_pages <= MAX_PAGE_BUTTONS {
        return (1..=total_pages).collect();
    }

    let current = clamp_page(current, total_pages);
    let half = MAX_PAGE_BUTTONS / 2;
    let start = current
        .saturating_sub(half)
        .clamp(1, total_pages - MAX_PAGE_BUTTONS + 1);
    (start..start + MAX_PAGE_BUTTONS).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Paged { current: usize },
    Windowed { loaded: usize, pending: Option<Instant> },
}

/// Rendered state of a list session
#[derive(Debug, PartialEq, Eq)]
pub enum ListView<'a, T> {
    /// Nothing to show, no controls either
    Empty,
    Page {
        items: &'a [T],
        page: usize,
        total_pages: usize,
        window: Vec<usize>,
        has_prev: bool,
        has_next: bool,
    },
    Window {
        items: &'a [T],
        /// Placeholder cards to draw while a load is in flight
        skeletons: usize,
        complete: bool,
    },
}

/// Live scroll listener of a [`ListSession`]. Dropping it unsubscribes.
#[derive(Debug)]
pub struct ScrollSubscription {
    active: Arc<AtomicBool>,
}

impl ScrollSubscription {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for ScrollSubscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// One list-rendering session over a frozen snapshot of items.
///
/// The mode is decided once from the crawler verdict. The snapshot does not
/// follow later catalog changes; build a new session for that.
#[derive(Debug)]
pub struct ListSession<T> {
    items: Vec<T>,
    options: ListOptions,
    mode: ListMode,
    progress: Progress,
    listener: Arc<AtomicBool>,
}

impl<T> ListSession<T> {
    pub fn new(items: Vec<T>, verdict: Verdict, mut options: ListOptions) -> Self {
        options.page_size = options.page_size.max(1);
        let mode = ListMode::from_verdict(verdict);
        let progress = match mode {
            ListMode::Paginated => Progress::Paged { current: 1 },
            ListMode::Infinite => Progress::Windowed {
                loaded: options.page_size.min(items.len()),
                pending: None,
            },
        };
        debug!(
            "List session: {} items, {:?} mode, page size {}",
            items.len(),
            mode,
            options.page_size
        );

        Self {
            items,
            options,
            mode,
            progress,
            listener: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn mode(&self) -> ListMode {
        self.mode
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn page_size(&self) -> usize {
        self.options.page_size
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.total(), self.options.page_size)
    }

    /// Current page, always 1 in infinite mode
    pub fn current_page(&self) -> usize {
        match self.progress {
            Progress::Paged { current } => current,
            Progress::Windowed { .. } => 1,
        }
    }

    /// Number of items revealed so far; the whole current page in
    /// paginated mode.
    pub fn loaded_count(&self) -> usize {
        match self.progress {
            Progress::Paged { current } => {
                page_range(current, self.options.page_size, self.total()).len()
            }
            Progress::Windowed { loaded, .. } => loaded,
        }
    }

    /// Jump to a page, clamping out-of-range requests. Returns the page now
    /// shown.
    pub fn go_to_page(&mut self, page: usize) -> usize {
        let total_pages = self.total_pages();
        match &mut self.progress {
            Progress::Paged { current } => {
                let clamped = clamp_page(page, total_pages);
                if clamped != page {
                    debug!("Page {} out of range, clamped to {}", page, clamped);
                }
                *current = clamped;
                clamped
            }
            Progress::Windowed { .. } => 1,
        }
    }

    pub fn next_page(&mut self) -> usize {
        self.go_to_page(self.current_page() + 1)
    }

    pub fn prev_page(&mut self) -> usize {
        self.go_to_page(self.current_page().saturating_sub(1))
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.progress,
            Progress::Windowed {
                pending: Some(_),
                ..
            }
        )
    }

    /// True once every item is revealed
    pub fn is_complete(&self) -> bool {
        match self.progress {
            Progress::Paged { .. } => true,
            Progress::Windowed { loaded, .. } => loaded >= self.total(),
        }
    }

    /// Start loading the next batch. No-op in paginated mode, while a load
    /// is in flight, or once everything is loaded.
    pub fn load_more(&mut self, now: Instant) -> bool {
        let total = self.total();
        let delay = self.options.load_delay;
        let Progress::Windowed { loaded, pending } = &mut self.progress else {
            return false;
        };
        if pending.is_some() || *loaded >= total {
            return false;
        }

        *pending = Some(now + delay);
        debug!("Loading more items after {} of {}", loaded, total);
        if delay.is_zero() {
            self.tick(now);
        }
        true
    }

    /// Finish an in-flight load whose delay elapsed. Returns true when the
    /// window grew.
    pub fn tick(&mut self, now: Instant) -> bool {
        let total = self.total();
        let page_size = self.options.page_size;
        let Progress::Windowed { loaded, pending } = &mut self.progress else {
            return false;
        };
        match *pending {
            Some(ready_at) if now >= ready_at => {
                *loaded = (*loaded + page_size).min(total);
                *pending = None;
                if *loaded >= total {
                    debug!("All {} items loaded, scroll trigger suppressed", total);
                    self.listener.store(false, Ordering::Release);
                }
                true
            }
            _ => false,
        }
    }

    /// Attach the scroll-proximity listener for this session.
    ///
    /// Only one listener is live at a time; subscribing again replaces it.
    pub fn subscribe_scroll(&mut self) -> ScrollSubscription {
        self.listener.store(false, Ordering::Release);
        self.listener = Arc::new(AtomicBool::new(
            self.mode == ListMode::Infinite && !self.is_complete(),
        ));
        ScrollSubscription {
            active: Arc::clone(&self.listener),
        }
    }

    /// Feed a scroll event. Starts a load when the listener is live and the
    /// position is within the threshold of the end.
    pub fn on_scroll(&mut self, position: ScrollPosition, now: Instant) -> bool {
        if !self.listener.load(Ordering::Acquire) {
            return false;
        }
        if position.distance_to_end() > self.options.scroll_threshold {
            return false;
        }
        self.load_more(now)
    }

    pub fn view(&self) -> ListView<'_, T> {
        if self.items.is_empty() {
            return ListView::Empty;
        }

        match self.progress {
            Progress::Paged { current } => {
                let total_pages = self.total_pages();
                let range = page_range(current, self.options.page_size, self.total());
                ListView::Page {
                    items: &self.items[range],
                    page: current,
                    total_pages,
                    window: page_window(current, total_pages),
                    has_prev: current > 1,
                    has_next: current < total_pages,
                }
            }
            Progress::Windowed { loaded, pending } => ListView::Window {
                items: &self.items[..loaded],
                skeletons: if pending.is_some() {
                    self.options.page_size
                } else {
                    0
                },
                complete: loaded >= self.total(),
            },
        }
    }
}
