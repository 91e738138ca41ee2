pub mod app;
pub mod components;

use anyhow::Result;
use crate::app::{App, AppView};
use ratatui::Frame;

/// Draw the main UI
pub fn draw_ui(f: &mut Frame, app: &mut App) -> Result<()> {
    let size = f.area();

    match app.view {
        AppView::Catalog => app::draw_catalog_view(f, app, size),
        AppView::Player => app::draw_player_view(f, app, size),
    }

    if let Some((msg, time, color)) = &app.status_message {
        app::draw_status_message(f, msg, *color, time.elapsed());
    }

    if app.is_command_mode() {
        app::draw_command_prompt(f, app.get_command_buffer());
    }

    if app.show_help {
        app::draw_help_dialog(f, app.view);
    }

    Ok(())
}
