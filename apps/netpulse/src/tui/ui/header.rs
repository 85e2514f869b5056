use chrono::Local;
use netpulse_core::Frame as MonitorFrame;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Clear, Paragraph};

use super::{COLOR_BRAND, COLOR_ERROR, COLOR_LABEL, COLOR_MUTED, COLOR_SUCCESS};

const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub fn render(f: &mut Frame, area: Rect, frame: &MonitorFrame, spinner: usize) {
    let clock = frame.at.with_timezone(&Local).format("%H:%M:%S").to_string();

    let title = vec![
        Span::styled("NetPulse ", Style::default().fg(COLOR_BRAND).add_modifier(Modifier::BOLD)),
        Span::styled(format!("{} ", SPINNER[spinner % SPINNER.len()]), Style::default().fg(COLOR_BRAND)),
        Span::styled(clock, Style::default().fg(COLOR_LABEL)),
    ];

    let down = frame.down_count();
    let total = frame.summaries.len();
    let status_color = if down == 0 { COLOR_SUCCESS } else { COLOR_ERROR };
    let status = vec![
        Span::styled(format!("{}/{} up", total - down, total), Style::default().fg(status_color)),
        Span::styled(format!("  {} rounds", frame.ticks), Style::default().fg(COLOR_MUTED)),
    ];

    let header = Paragraph::new(vec![Line::from(title), Line::from(status)]);

    f.render_widget(Clear, area);
    f.render_widget(header, area);
}
