use crate::app::{App, AppView};
use crate::ui::components::*;
use courseplayer_core::media::HelperStatus;
use courseplayer_core::{
    Course, ListMode, ListView, PlayerView, SessionState, SurfaceSource, SurfaceView,
};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use std::time::Duration;

fn header(title: &str, subtitle: String) -> Paragraph<'_> {
    Paragraph::new(Line::from(vec![
        Span::styled(
            title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {}", subtitle), Style::default().fg(Color::Gray)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    )
}

fn course_item(course: &Course) -> ListItem<'_> {
    let mut spans = vec![
        Span::styled(
            course.course_name.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  [{}]", course.video_type.label()),
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(
            format!("  {}", course.course_category),
            Style::default().fg(Color::Gray),
        ),
    ];
    if let Some(instructor) = &course.instructor_name {
        spans.push(Span::styled(
            format!("  by {}", instructor),
            Style::default().fg(Color::DarkGray),
        ));
    }
    ListItem::new(Line::from(spans))
}

/// Draw the course list
pub fn draw_catalog_view(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(3),    // Courses
            Constraint::Length(3), // Page controls / load state
        ])
        .split(area);

    // list block borders take two rows
    app.set_viewport(chunks[1].height.saturating_sub(2) as usize);

    let mode = match app.session.mode() {
        ListMode::Paginated => "pages",
        ListMode::Infinite => "scroll",
    };
    let subtitle = match &app.filter {
        Some(filter) => format!("{} · {} courses · {}", filter, app.session.total(), mode),
        None => format!("{} courses · {}", app.session.total(), mode),
    };
    f.render_widget(header(" Courses ", subtitle), chunks[0]);

    let elapsed = app.started.elapsed().as_millis();
    let list_block = Block::default().borders(Borders::ALL);

    match app.session.view() {
        ListView::Empty => {
            let text = if app.filter.is_some() {
                "No courses match. Press Esc to show all courses."
            } else {
                "No courses available."
            };
            f.render_widget(
                Paragraph::new(text)
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::Gray))
                    .block(list_block),
                chunks[1],
            );
            // no controls for an empty list
        }
        ListView::Page {
            items,
            page,
            total_pages,
            window,
            has_prev,
            has_next,
        } => {
            draw_course_list(f, items, 0, app.selected, app.scroll_offset, list_block, chunks[1], elapsed);
            f.render_widget(
                PageControls::new(&window, page, total_pages).with_nav(has_prev, has_next),
                chunks[2],
            );
        }
        ListView::Window {
            items,
            skeletons,
            complete,
        } => {
            draw_course_list(
                f,
                items,
                skeletons,
                app.selected,
                app.scroll_offset,
                list_block,
                chunks[1],
                elapsed,
            );

            let footer = if complete {
                Line::from(Span::styled(
                    format!("All {} courses loaded", app.session.total()),
                    Style::default().fg(Color::DarkGray),
                ))
            } else if skeletons > 0 {
                Line::from(format!("{} Loading more courses...", get_spinner_frame(elapsed)))
            } else {
                Line::from(vec![
                    Span::raw(format!("{} of {} shown  ", items.len(), app.session.total())),
                    Span::styled("[m] Load more", Style::default().fg(Color::Cyan)),
                ])
            };
            f.render_widget(
                Paragraph::new(footer)
                    .alignment(Alignment::Center)
                    .block(Block::default().borders(Borders::ALL)),
                chunks[2],
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_course_list(
    f: &mut Frame,
    courses: &[Course],
    skeletons: usize,
    selected: usize,
    offset: usize,
    block: Block<'_>,
    area: Rect,
    elapsed_ms: u128,
) {
    let mut items: Vec<ListItem> = courses.iter().map(course_item).collect();
    items.extend((0..skeletons).map(|_| ListItem::new(skeleton_line(area.width, elapsed_ms))));

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    let mut state = ListState::default().with_offset(offset);
    if !courses.is_empty() {
        state.select(Some(selected.min(courses.len() - 1)));
    }
    f.render_stateful_widget(list, area, &mut state);
}

/// Draw the player for the mounted course
pub fn draw_player_view(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Course title
            Constraint::Min(5),    // Player
            Constraint::Length(1), // Key hints
        ])
        .split(area);

    let Some(course) = app.player.course() else {
        return;
    };
    let subtitle = match &course.instructor_name {
        Some(instructor) => format!("{} · {}", course.course_category, instructor),
        None => course.course_category.clone(),
    };
    f.render_widget(header(&course.course_name, subtitle), chunks[0]);

    let hints = match app.player.view() {
        PlayerView::Unmounted => return,
        PlayerView::Redirect { url } => {
            let text = Text::from(vec![
                Line::from("This course continues outside the app."),
                Line::from(""),
                Line::from(Span::styled(
                    url.to_string(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::UNDERLINED),
                )),
            ]);
            f.render_widget(
                Paragraph::new(text)
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true })
                    .block(Block::default().borders(Borders::ALL).title(" External course ")),
                chunks[1],
            );
            "Esc back"
        }
        PlayerView::NoVideos => {
            f.render_widget(
                Paragraph::new("No videos available for this course.")
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::Gray))
                    .block(Block::default().borders(Borders::ALL)),
                chunks[1],
            );
            "Esc back"
        }
        PlayerView::Playing {
            videos,
            active,
            title,
            surface,
            ..
        } => {
            let panes = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
                .split(chunks[1]);

            draw_surface(f, app, title, surface, panes[0]);

            let items: Vec<ListItem> = videos
                .iter()
                .enumerate()
                .map(|(i, video)| ListItem::new(format!("{:>2}. {}", i + 1, video.title)))
                .collect();
            let list = List::new(items)
                .block(Block::default().borders(Borders::ALL).title(" Videos "))
                .highlight_style(
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol("▶ ");
            let mut state = ListState::default();
            state.select(Some(active));
            f.render_stateful_widget(list, panes[1], &mut state);

            "↑/↓ video · r retry · p external player · ? help · Esc back"
        }
    };

    f.render_widget(
        Paragraph::new(hints).style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );
}

fn draw_surface(f: &mut Frame, app: &App, title: &str, surface: SurfaceView<'_>, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", title));
    let elapsed = app.started.elapsed().as_millis();
    let dim = Style::default().fg(Color::Gray);

    let lines: Vec<Line> = match surface {
        SurfaceView::Adaptive {
            state,
            error,
            manifest,
        } => {
            let mut lines = Vec::new();
            match state {
                SessionState::Idle => lines.push(Line::from(Span::styled("Idle", dim))),
                SessionState::Attaching => lines.push(Line::from(format!(
                    "{} Loading stream...",
                    get_spinner_frame(elapsed)
                ))),
                SessionState::Attached => {
                    lines.push(Line::from(Span::styled(
                        "▶ Stream ready",
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    )));
                    if let Some(info) = manifest {
                        lines.push(Line::from(""));
                        if info.variants > 0 {
                            lines.push(Line::from(format!("Quality levels: {}", info.variants)));
                        } else {
                            lines.push(Line::from(format!(
                                "Segments: {} ({} kept behind the playhead)",
                                info.segments, info.retained_segments
                            )));
                            if info.live {
                                lines.push(Line::from(Span::styled(
                                    "● LIVE",
                                    Style::default().fg(Color::Red),
                                )));
                            } else {
                                lines.push(Line::from(format!(
                                    "Duration: {}",
                                    format_duration(info.duration_secs)
                                )));
                            }
                        }
                    }
                }
                SessionState::Native => {
                    lines.push(Line::from("▶ Playing with the native player"))
                }
                SessionState::Error => {
                    let message = error.map_or("Playback failed.", |e| e.user_message());
                    lines.push(Line::from(Span::styled(
                        message,
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    )));
                    lines.push(Line::from(""));
                    lines.push(Line::from(Span::styled(
                        "[r] Retry",
                        Style::default().fg(Color::Yellow),
                    )));
                }
            }
            lines.push(Line::from(""));
            match app.player.controller().surface().source() {
                Some(SurfaceSource::Engine { handle, url }) => {
                    lines.push(Line::from(Span::styled(format!("{} ← {}", handle, url), dim)))
                }
                Some(SurfaceSource::Native { url }) => {
                    lines.push(Line::from(Span::styled(format!("native ← {}", url), dim)))
                }
                None => {}
            }
            lines
        }
        SurfaceView::Embed {
            provider,
            id,
            embed_url,
        } => {
            let helper = match app.helper.status() {
                None => Line::from(format!(
                    "{} Checking {}...",
                    get_spinner_frame(elapsed),
                    app.helper.helper()
                )),
                Some(HelperStatus::Ready { version }) => Line::from(Span::styled(
                    format!("{} {} ready", app.helper.helper(), version),
                    Style::default().fg(Color::Green),
                )),
                Some(HelperStatus::Unavailable { .. }) => Line::from(Span::styled(
                    format!("{} not available", app.helper.helper()),
                    Style::default().fg(Color::Yellow),
                )),
            };
            vec![
                Line::from(Span::styled(provider, Style::default().add_modifier(Modifier::BOLD))),
                Line::from(""),
                Line::from(format!("Video id: {}", id)),
                Line::from(Span::styled(embed_url.to_string(), dim)),
                Line::from(""),
                helper,
            ]
        }
        SurfaceView::Direct { url } => vec![
            Line::from(Span::styled(
                "Video file",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(url.to_string(), dim)),
        ],
    };

    f.render_widget(
        Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: false })
            .block(block),
        area,
    );
}

/// Draw a status message
pub fn draw_status_message(f: &mut Frame, message: &str, color: Color, age: Duration) {
    f.render_widget(StatusMessage::new(message, color, age), f.area());
}

/// Draw the command prompt on the bottom line
pub fn draw_command_prompt(f: &mut Frame, command: &str) {
    let area = f.area();
    let prompt_area = Rect {
        x: area.x,
        y: area.y + area.height.saturating_sub(1),
        width: area.width,
        height: 1.min(area.height),
    };
    f.render_widget(Clear, prompt_area);
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(":", Style::default().fg(Color::Yellow)),
            Span::raw(command),
            Span::styled("█", Style::default().fg(Color::Gray)),
        ]))
        .style(Style::default().bg(Color::Black)),
        prompt_area,
    );
}

/// Draw the help overlay centered on the screen
pub fn draw_help_dialog(f: &mut Frame, view: AppView) {
    let area = f.area();
    let width = area.width.min(60);
    let height = area.height.min(26);
    let dialog = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    f.render_widget(HelpOverlay::new(view), dialog);
}
