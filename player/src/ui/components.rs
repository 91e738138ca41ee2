use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

use crate::app::AppView;

/// Format seconds as HH:MM:SS, or MM:SS under an hour
pub fn format_duration(secs: f64) -> String {
    let total = secs.max(0.0).round() as u64;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Prev / numbered / next controls of a paginated list
pub struct PageControls<'a> {
    window: &'a [usize],
    current: usize,
    total_pages: usize,
    has_prev: bool,
    has_next: bool,
}

impl<'a> PageControls<'a> {
    /// Prev and next start disabled, see [`PageControls::with_nav`]
    pub fn new(window: &'a [usize], current: usize, total_pages: usize) -> Self {
        Self {
            window,
            current,
            total_pages,
            has_prev: false,
            has_next: false,
        }
    }

    pub fn with_nav(mut self, has_prev: bool, has_next: bool) -> Self {
        self.has_prev = has_prev;
        self.has_next = has_next;
        self
    }
}

impl Widget for PageControls<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let enabled = Style::default().fg(Color::White);
        let disabled = Style::default().fg(Color::DarkGray);

        let mut spans = vec![Span::styled(
            "« Prev ",
            if self.has_prev { enabled } else { disabled },
        )];
        if self.window.first().is_some_and(|&first| first > 1) {
            spans.push(Span::styled(" … ", disabled));
        }
        for &page in self.window {
            if page == self.current {
                spans.push(Span::styled(
                    format!(" {} ", page),
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ));
            } else {
                spans.push(Span::styled(format!(" {} ", page), enabled));
            }
        }
        if self.window.last().is_some_and(|&last| last < self.total_pages) {
            spans.push(Span::styled(" … ", disabled));
        }
        spans.push(Span::styled(
            " Next »",
            if self.has_next { enabled } else { disabled },
        ));

        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" Page {} of {} ", self.current, self.total_pages)),
            )
            .render(area, buf);
    }
}

/// Placeholder rows shown while a batch loads
pub fn skeleton_line(width: u16, elapsed_ms: u128) -> Line<'static> {
    let shade = if (elapsed_ms / 300) % 2 == 0 {
        Color::DarkGray
    } else {
        Color::Gray
    };
    let bar = "░".repeat(width.saturating_sub(6).min(48) as usize);
    Line::from(Span::styled(format!("   {}", bar), Style::default().fg(shade)))
}

/// Display a status message with fade effect
pub struct StatusMessage<'a> {
    message: &'a str,
    color: Color,
    age: Duration,
    max_age: Duration,
}

impl<'a> StatusMessage<'a> {
    pub fn new(message: &'a str, color: Color, age: Duration) -> Self {
        Self {
            message,
            color,
            age,
            max_age: Duration::from_secs(4),
        }
    }
}

impl Widget for StatusMessage<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.age > self.max_age {
            return;
        }
        let remaining = 1.0 - self.age.as_secs_f32() / self.max_age.as_secs_f32();
        let color = match self.color {
            // errors never fade
            Color::Red => Color::Red,
            c if remaining > 0.5 => c,
            _ => Color::DarkGray,
        };

        let width = (self.message.width() as u16 + 4).min(area.width);
        let message_area = Rect {
            x: area.x + area.width.saturating_sub(width) / 2,
            y: area.y + area.height.saturating_sub(6),
            width,
            height: 3.min(area.height),
        };

        Clear.render(message_area, buf);
        Paragraph::new(Text::from(self.message))
            .style(Style::default().fg(color))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color))
                    .style(Style::default().bg(Color::Black)),
            )
            .render(message_area, buf);
    }
}

/// Key reference for the current view
pub struct HelpOverlay {
    view: AppView,
}

impl HelpOverlay {
    pub fn new(view: AppView) -> Self {
        Self { view }
    }
}

fn key_line(key: &'static str, action: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<12}", key), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(action),
    ])
}

impl Widget for HelpOverlay {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let heading = Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        let mut lines = Vec::new();

        match self.view {
            AppView::Catalog => {
                lines.push(Line::from(Span::styled("Course list", heading)));
                lines.push(Line::from(""));
                lines.push(key_line("↑/↓ j/k", "Move selection"));
                lines.push(key_line("Enter", "Open course"));
                lines.push(key_line("←/→ n/b", "Previous / next page"));
                lines.push(key_line("1-9", "Jump to page"));
                lines.push(key_line("m", "Load more courses"));
                lines.push(key_line("/", "Search"));
                lines.push(key_line("Esc", "Clear filter"));
                lines.push(key_line("q", "Quit"));
            }
            AppView::Player => {
                lines.push(Line::from(Span::styled("Player", heading)));
                lines.push(Line::from(""));
                lines.push(key_line("↑/↓ ←/→", "Previous / next video"));
                lines.push(key_line("1-9", "Select video"));
                lines.push(key_line("r", "Retry after an error"));
                lines.push(key_line("p", "Open in external player"));
                lines.push(key_line("Esc q", "Back to courses"));
            }
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Commands", heading)));
        lines.push(key_line(":page N", "Go to page"));
        lines.push(key_line(":video N", "Select video"));
        lines.push(key_line(":open ROUTE", "Open /category/course[/video]"));
        lines.push(key_line(":search Q", "Fuzzy search"));
        lines.push(key_line(":category C", "Courses of a category (C/S: subsection)"));
        lines.push(key_line(":categories", "List categories"));
        lines.push(key_line(":course NAME", "Courses with this name"));
        lines.push(key_line(":home :all", "Featured / all courses"));
        lines.push(key_line(":quit", "Leave the view"));

        Clear.render(area, buf);
        Paragraph::new(Text::from(lines))
            .block(Block::default().title(" Help ").borders(Borders::ALL))
            .style(Style::default().fg(Color::White).bg(Color::Black))
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

/// Get a spinner frame for loading animations
pub fn get_spinner_frame(duration_ms: u128) -> &'static str {
    const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓"];
    let frame_idx = (duration_ms / 80) % SPINNER_FRAMES.len() as u128;
    SPINNER_FRAMES[frame_idx as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(65.4), "01:05");
        assert_eq!(format_duration(3725.0), "01:02:05");
        assert_eq!(format_duration(-3.0), "00:00");
    }

    #[test]
    fn test_page_controls_mark_current_page() {
        let window = [3, 4, 5, 6, 7, 8, 9];
        let area = Rect::new(0, 0, 60, 3);
        let mut buf = Buffer::empty(area);
        PageControls::new(&window, 5, 12)
            .with_nav(true, true)
            .render(area, &mut buf);

        let row: String = (0..area.width).map(|x| buf[(x, 1)].symbol().to_string()).collect();
        assert!(row.contains("« Prev"));
        assert!(row.contains(" 5 "));
        assert!(row.contains("Next »"));
        assert!(row.contains('…'));
    }

    #[test]
    fn test_page_controls_follow_nav_flags() {
        let window = [1, 2];
        let area = Rect::new(0, 0, 40, 3);
        let mut buf = Buffer::empty(area);
        PageControls::new(&window, 2, 2)
            .with_nav(true, false)
            .render(area, &mut buf);

        let cell = |needle: &str| {
            let row: String = (0..area.width).map(|x| buf[(x, 1)].symbol().to_string()).collect();
            let col = row.find(needle).unwrap();
            buf[(row[..col].chars().count() as u16, 1)].fg
        };
        assert_eq!(cell("Prev"), Color::White);
        assert_eq!(cell("Next"), Color::DarkGray);
    }
}
