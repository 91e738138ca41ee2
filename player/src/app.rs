use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use courseplayer_core::media::{HelperStatus, SdkLoader, global_sdk_loader};
use courseplayer_core::pagination::ScrollSubscription;
use courseplayer_core::{
    AnalyticsEvent, AnalyticsSink, Catalog, Config, Course, HlsEngineFactory, ListMode,
    ListSession, ListView, LogSink, Mechanism, NavigationIntent, ScrollPosition, SessionState,
    Verdict, VideoPlayer, intent_for, parse_route,
};
use crossterm::event::{KeyCode, KeyEvent, MouseEvent};
use log::{debug, info, warn};
use ratatui::style::Color;
use tokio::runtime::Handle;

use crate::events::event_utils;
use crate::surface::TerminalSurface;

pub type Player = VideoPlayer<HlsEngineFactory, TerminalSurface>;

/// Application views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    /// Course list
    Catalog,
    /// Course player
    Player,
}

// App state
pub struct App {
    pub view: AppView,
    pub config: Config,
    pub catalog: Catalog,
    pub verdict: Verdict,
    /// Courses currently listed
    pub session: ListSession<Course>,
    /// Label of the active filter, if the list is not the whole catalog
    pub filter: Option<String>,
    scroll: Option<ScrollSubscription>,
    /// Cursor within the visible items
    pub selected: usize,
    /// First visible row of the course list
    pub scroll_offset: usize,
    /// Rows the course list had on the last draw
    pub viewport_rows: usize,
    pub player: Player,
    analytics: Arc<LogSink>,
    pub helper: &'static SdkLoader,
    pub status_message: Option<(String, Instant, Color)>,
    pub should_quit: bool,
    pub show_help: bool,
    pub command_mode: bool,
    pub command_buffer: String,
    /// Start of the app, drives the spinner
    pub started: Instant,
}

impl App {
    pub fn new(config: Config, catalog: Catalog, verdict: Verdict, runtime: Handle) -> Result<Self> {
        let engine = config.engine_config();
        let factory = HlsEngineFactory::new(engine.request_timeout)
            .context("Failed to build the stream client")?
            .with_runtime(runtime.clone());
        let surface = TerminalSurface::new(config.engine.native_adaptive);
        let analytics = Arc::new(LogSink);
        let player = VideoPlayer::new(
            factory,
            surface,
            engine,
            config.embed.clone(),
            Box::new(Arc::clone(&analytics)),
        );

        let helper = global_sdk_loader(&config.embed.helper);
        runtime.spawn(async move {
            helper.ensure_loaded().await;
        });

        let session = ListSession::new(catalog.courses().to_vec(), verdict, config.list_options());
        let mut app = Self {
            view: AppView::Catalog,
            config,
            catalog,
            verdict,
            session,
            filter: None,
            scroll: None,
            selected: 0,
            scroll_offset: 0,
            viewport_rows: 0,
            player,
            analytics,
            helper,
            status_message: None,
            should_quit: false,
            show_help: false,
            command_mode: false,
            command_buffer: String::new(),
            started: Instant::now(),
        };
        app.mount_list();
        Ok(app)
    }

    pub fn set_status(&mut self, message: impl Into<String>, color: Color) {
        self.status_message = Some((message.into(), Instant::now(), color));
    }

    pub fn is_command_mode(&self) -> bool {
        self.command_mode
    }

    pub fn enter_command_mode(&mut self, prefix: &str) {
        self.command_mode = true;
        self.command_buffer = prefix.to_string();
    }

    pub fn exit_command_mode(&mut self) {
        self.command_mode = false;
        self.command_buffer.clear();
    }

    pub fn get_command_buffer(&self) -> &str {
        &self.command_buffer
    }

    /// Courses visible in the list right now
    pub fn visible_courses(&self) -> &[Course] {
        match self.session.view() {
            ListView::Empty => &[],
            ListView::Page { items, .. } => items,
            ListView::Window { items, .. } => items,
        }
    }

    pub fn selected_course(&self) -> Option<&Course> {
        self.visible_courses().get(self.selected)
    }

    /// Replace the listed courses with a fresh session
    pub fn show_courses(&mut self, courses: Vec<Course>, filter: Option<String>) {
        info!(
            "Listing {} courses{}",
            courses.len(),
            filter
                .as_deref()
                .map(|f| format!(" ({f})"))
                .unwrap_or_default()
        );
        self.session = ListSession::new(courses, self.verdict, self.config.list_options());
        self.filter = filter;
        self.selected = 0;
        self.scroll_offset = 0;
        if self.view == AppView::Catalog {
            self.mount_list();
        }
    }

    pub fn go_to_page(&mut self, page: usize) -> Result<()> {
        if self.session.mode() != ListMode::Paginated {
            return Err(anyhow!("Pages are not used in this list, scroll or press m"));
        }
        let before = self.session.current_page();
        let shown = self.session.go_to_page(page);
        if shown != before {
            self.selected = 0;
            self.scroll_offset = 0;
            self.page_viewed();
        }
        if shown != page {
            self.set_status(format!("Showing page {}", shown), Color::Yellow);
        }
        Ok(())
    }

    pub fn load_more(&mut self) -> Result<()> {
        if self.session.mode() != ListMode::Infinite {
            return Err(anyhow!("Use the page controls to see more courses"));
        }
        if self.session.is_complete() {
            self.set_status("All courses loaded", Color::Blue);
        } else if !self.session.load_more(Instant::now()) {
            debug!("Load already in flight");
        }
        Ok(())
    }

    /// Open a course in the player, or announce its outbound link
    pub fn open_course(&mut self, course: Course, index: usize) {
        if let NavigationIntent::Outbound(url) = intent_for(&course) {
            self.set_status(format!("Opens outside the app: {}", url), Color::Cyan);
        }
        self.unmount_list();
        self.player.mount(course, index);
        self.view = AppView::Player;
    }

    pub fn open_selected(&mut self) {
        if let Some(course) = self.selected_course().cloned() {
            self.open_course(course, 0);
        }
    }

    /// Open a `/category/course[/video]` route
    pub fn open_route(&mut self, route: &str) -> Result<()> {
        let (category, name, index) =
            parse_route(route).ok_or_else(|| anyhow!("Not a course route: {}", route))?;
        let course = self
            .catalog
            .find(&category, &name)
            .cloned()
            .ok_or_else(|| anyhow!("No course '{}' in '{}'", name, category))?;
        self.open_course(course, index.unwrap_or(0));
        Ok(())
    }

    pub fn close_player(&mut self) {
        self.player.unmount();
        self.view = AppView::Catalog;
        self.mount_list();
    }

    pub fn select_video(&mut self, index: usize) -> Result<()> {
        let count = self.player.course().map_or(0, |c| c.videos.len());
        if index >= count {
            return Err(anyhow!("No video {} in this course", index + 1));
        }
        self.player.select_video(index);
        Ok(())
    }

    pub fn retry(&mut self) {
        if self.player.retry() {
            self.set_status("Retrying...", Color::Yellow);
        } else {
            self.set_status("Nothing to retry", Color::DarkGray);
        }
    }

    /// Hand the active video to the configured external player
    pub fn play_external(&mut self) -> Result<()> {
        let command = self
            .config
            .external_player
            .clone()
            .ok_or_else(|| anyhow!("No external_player configured"))?;
        let url = match self.player.mechanism() {
            Some(Mechanism::ExternalRedirect { .. }) | None => {
                return Err(anyhow!("Nothing playable selected"));
            }
            Some(mechanism) => mechanism.playable_url().to_string(),
        };
        if matches!(
            self.player.mechanism(),
            Some(Mechanism::Embed { .. } | Mechanism::Archive { .. })
        ) {
            if let Some(HelperStatus::Unavailable { reason }) = self.helper.status() {
                warn!("Embed helper unavailable: {}", reason);
            }
        }

        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| anyhow!("external_player is empty"))?;
        info!("Handing {} to {}", url, program);
        Command::new(program)
            .args(parts)
            .arg(&url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {}", program))?;
        self.set_status(format!("Opened in {}", program), Color::Green);
        Ok(())
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        if self.is_command_mode() {
            match key.code {
                KeyCode::Char(c) => self.command_buffer.push(c),
                KeyCode::Backspace => {
                    self.command_buffer.pop();
                }
                KeyCode::Esc => self.exit_command_mode(),
                _ => {}
            }
            return Ok(());
        }

        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('h')) {
                self.show_help = false;
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Char('?') | KeyCode::Char('h') => {
                self.show_help = true;
                return Ok(());
            }
            KeyCode::Char(':') => {
                self.enter_command_mode("");
                return Ok(());
            }
            _ => {}
        }

        match self.view {
            AppView::Catalog => self.handle_catalog_key(key),
            AppView::Player => self.handle_player_key(key),
        }
    }

    fn handle_catalog_key(&mut self, key: KeyEvent) -> Result<()> {
        if let Some(page) = event_utils::digit(&key) {
            if self.session.mode() == ListMode::Paginated && page > 0 {
                return self.go_to_page(page);
            }
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Home => self.move_selection(-(self.selected as isize)),
            KeyCode::End => self.move_selection(isize::MAX / 2),
            KeyCode::PageDown | KeyCode::Right | KeyCode::Char('n') => {
                if self.session.mode() == ListMode::Paginated {
                    self.go_to_page(self.session.current_page() + 1)?;
                } else {
                    self.move_selection(self.viewport_rows.max(1) as isize);
                }
            }
            KeyCode::PageUp | KeyCode::Left | KeyCode::Char('b') => {
                if self.session.mode() == ListMode::Paginated {
                    self.go_to_page(self.session.current_page().saturating_sub(1))?;
                } else {
                    self.move_selection(-(self.viewport_rows.max(1) as isize));
                }
            }
            KeyCode::Char('m') => self.load_more()?,
            KeyCode::Enter => self.open_selected(),
            KeyCode::Char('/') => self.enter_command_mode("search "),
            KeyCode::Esc => {
                if self.filter.is_some() {
                    self.show_courses(self.catalog.courses().to_vec(), None);
                }
            }
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
        Ok(())
    }

    fn handle_player_key(&mut self, key: KeyEvent) -> Result<()> {
        if let Some(n) = event_utils::digit(&key) {
            if n > 0 {
                return self.select_video(n - 1);
            }
        }

        match key.code {
            KeyCode::Down | KeyCode::Right | KeyCode::Char('j') => {
                self.player.next_video();
            }
            KeyCode::Up | KeyCode::Left | KeyCode::Char('k') => {
                self.player.prev_video();
            }
            KeyCode::Char('r') => self.retry(),
            KeyCode::Char('p') => self.play_external()?,
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('q') => self.close_player(),
            _ => {}
        }
        Ok(())
    }

    pub fn handle_mouse_event(&mut self, mouse: MouseEvent) {
        if self.view != AppView::Catalog || self.show_help {
            return;
        }
        if let Some(delta) = event_utils::wheel_delta(&mouse) {
            self.move_selection(delta);
        }
    }

    /// Move the list cursor and report the scroll position to the session
    fn move_selection(&mut self, delta: isize) {
        let len = self.visible_courses().len();
        if len == 0 {
            return;
        }
        self.selected = self.selected.saturating_add_signed(delta).min(len - 1);
        self.clamp_scroll(len);

        let position = ScrollPosition {
            offset: self.scroll_offset,
            viewport: self.viewport_rows,
            content: len,
        };
        let listening = self.scroll.as_ref().is_some_and(ScrollSubscription::is_active);
        if listening && self.session.on_scroll(position, Instant::now()) {
            debug!("Scroll near the end, loading more");
        }
    }

    fn clamp_scroll(&mut self, len: usize) {
        let rows = self.viewport_rows.max(1);
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + rows {
            self.scroll_offset = self.selected + 1 - rows;
        }
        self.scroll_offset = self.scroll_offset.min(len.saturating_sub(1));
    }

    /// Called by the renderer with the rows available to the course list
    pub fn set_viewport(&mut self, rows: usize) {
        self.viewport_rows = rows;
        self.clamp_scroll(self.visible_courses().len());
    }

    fn mount_list(&mut self) {
        self.scroll = Some(self.session.subscribe_scroll());
        self.page_viewed();
    }

    fn unmount_list(&mut self) {
        // dropping the subscription detaches the scroll listener
        self.scroll = None;
    }

    fn page_viewed(&self) {
        self.analytics.record(&AnalyticsEvent::PageViewed {
            page: self.session.current_page(),
            mode: self.session.mode(),
        });
    }

    /// Update application state
    pub fn update(&mut self) -> Result<()> {
        if let Some((_, time, _)) = &self.status_message {
            if time.elapsed() > Duration::from_secs(5) {
                self.status_message = None;
            }
        }

        if self.session.tick(Instant::now()) {
            debug!(
                "List grew to {} of {}",
                self.session.loaded_count(),
                self.session.total()
            );
        }

        if self.player.poll() > 0 && self.player.controller().state() == SessionState::Error {
            let message = self
                .player
                .controller()
                .last_error()
                .map(|e| e.user_message())
                .unwrap_or("Playback failed.");
            self.set_status(format!("{} Press r to retry.", message), Color::Red);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseplayer_core::config::ListConfig;
    use courseplayer_core::{Category, PlayerView, Video, VideoType};
    use crossterm::event::KeyModifiers;

    fn course(category: &str, name: &str, video_type: VideoType) -> Course {
        Course {
            course_name: name.to_string(),
            course_category: category.to_string(),
            video_type,
            videos: vec![Video {
                title: "Part 1".to_string(),
                url: format!("https://media.example.org/{name}.mp4"),
            }],
            redirect_url: Some("https://partner.example.com/cloud".to_string()),
            des: None,
            image_of_course: None,
            instructor_name: None,
            cost: None,
            audio: None,
            subsection: None,
            homepage: false,
        }
    }

    fn app(crawler: bool, n: usize) -> App {
        let config = Config {
            list: ListConfig {
                page_size: 12,
                scroll_threshold: 3,
                load_delay_ms: 0,
            },
            ..Config::default()
        };
        let mut courses: Vec<Course> = (0..n)
            .map(|i| course("dsa", &format!("course {i}"), VideoType::Mp4))
            .collect();
        courses.push(course("partners", "cloud", VideoType::Redirect));
        let verdict = Verdict {
            is_crawler_like: crawler,
        };
        App::new(config, Catalog::new(courses, Vec::new()), verdict, Handle::current()).unwrap()
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE)).unwrap();
    }

    #[tokio::test]
    async fn test_scrolling_near_the_end_loads_more() {
        let mut app = app(false, 29);
        app.set_viewport(5);
        assert_eq!(app.session.loaded_count(), 12);

        for _ in 0..11 {
            press(&mut app, KeyCode::Down);
        }
        assert_eq!(app.session.loaded_count(), 24);
        assert_eq!(app.selected, 11);
    }

    #[tokio::test]
    async fn test_player_view_detaches_scroll_listener() {
        let mut app = app(false, 29);
        app.set_viewport(5);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.view, AppView::Player);

        // wheel events are ignored outside the list
        for _ in 0..20 {
            app.handle_mouse_event(MouseEvent {
                kind: crossterm::event::MouseEventKind::ScrollDown,
                column: 0,
                row: 0,
                modifiers: KeyModifiers::NONE,
            });
        }
        assert_eq!(app.session.loaded_count(), 12);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.view, AppView::Catalog);
        assert_eq!(app.player.view(), PlayerView::Unmounted);
    }

    #[tokio::test]
    async fn test_crawler_gets_pages() {
        let mut app = app(true, 29);
        assert_eq!(app.session.mode(), ListMode::Paginated);
        assert_eq!(app.session.total_pages(), 3);

        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.session.current_page(), 3);
        assert_eq!(app.visible_courses().len(), 6);

        press(&mut app, KeyCode::Right);
        assert_eq!(app.session.current_page(), 3);
        assert!(app.load_more().is_err());
    }

    #[tokio::test]
    async fn test_page_zero_clamps_to_first_page() {
        let mut app = app(true, 24);
        crate::commands::handle_command(&mut app, "page 3").unwrap();
        assert_eq!(app.session.current_page(), 3);

        crate::commands::handle_command(&mut app, "page 0").unwrap();
        assert_eq!(app.session.current_page(), 1);
        crate::commands::handle_command(&mut app, "page 99").unwrap();
        assert_eq!(app.session.current_page(), 3);
    }

    #[tokio::test]
    async fn test_catalog_query_commands() {
        let mut basics = course("dsa", "arrays", VideoType::Mp4);
        basics.subsection = Some("basics".to_string());
        let courses = vec![
            basics,
            course("dsa", "graphs", VideoType::Mp4),
            course("ml", "graphs", VideoType::Mp4),
        ];
        let categories = vec![Category {
            category_name: "dsa".to_string(),
            des: None,
            image: None,
        }];
        let verdict = Verdict {
            is_crawler_like: false,
        };
        let mut app = App::new(
            Config::default(),
            Catalog::new(courses, categories),
            verdict,
            Handle::current(),
        )
        .unwrap();

        crate::commands::handle_command(&mut app, "categories").unwrap();
        let (msg, _, _) = app.status_message.clone().unwrap();
        assert_eq!(msg, "Categories: dsa");

        crate::commands::handle_command(&mut app, "course graphs").unwrap();
        assert_eq!(app.session.total(), 2);

        crate::commands::handle_command(&mut app, "category dsa / basics").unwrap();
        assert_eq!(app.session.total(), 1);
        assert_eq!(app.session.items()[0].course_name, "arrays");

        assert!(crate::commands::handle_command(&mut app, "course nothing").is_err());
    }

    #[tokio::test]
    async fn test_redirect_route_renders_link_only() {
        let mut app = app(false, 3);
        app.open_route("/partners/cloud").unwrap();
        assert_eq!(
            app.player.view(),
            PlayerView::Redirect {
                url: "https://partner.example.com/cloud"
            }
        );
        assert!(app.play_external().is_err());
        assert!(app.open_route("/nowhere/at-all").is_err());
    }

    #[tokio::test]
    async fn test_search_command_starts_new_session() {
        let mut app = app(false, 29);
        crate::commands::handle_command(&mut app, "search cloud").unwrap();
        assert!(app.filter.as_deref().is_some_and(|f| f.contains("cloud")));
        assert!(app.session.items().iter().any(|c| c.course_name == "cloud"));

        press(&mut app, KeyCode::Esc);
        assert!(app.filter.is_none());
        assert_eq!(app.session.total(), 30);
    }
}
