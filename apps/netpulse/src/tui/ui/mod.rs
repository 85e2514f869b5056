pub mod endpoints;
pub mod footer;
pub mod header;

use netpulse_core::Frame as MonitorFrame;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Color;

pub const COLOR_BRAND: Color = Color::Cyan;
pub const COLOR_LABEL: Color = Color::Gray;
pub const COLOR_MUTED: Color = Color::DarkGray;
pub const COLOR_SUCCESS: Color = Color::Green;
pub const COLOR_WARNING: Color = Color::Yellow;
pub const COLOR_ERROR: Color = Color::Red;

/// Render the entire UI
pub fn render(f: &mut Frame, frame: &MonitorFrame, spinner: usize) {
    let size = f.size();

    let download_height = if frame.download_url.is_some() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(3),
            Constraint::Length(download_height),
            Constraint::Length(1),
        ])
        .split(size);

    header::render(f, chunks[0], frame, spinner);
    endpoints::render(f, chunks[1], frame);
    if download_height > 0 {
        endpoints::render_download(f, chunks[2], frame);
    }
    footer::render(f, chunks[3], frame);
}
