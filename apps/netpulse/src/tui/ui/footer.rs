use netpulse_core::Frame as MonitorFrame;
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use super::{COLOR_BRAND, COLOR_MUTED};

pub fn render(f: &mut Frame, area: Rect, frame: &MonitorFrame) {
    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(
                "interval {:.1}s  history {}  ",
                frame.update_interval.as_secs_f64(),
                frame.history_width
            ),
            Style::default().fg(COLOR_MUTED),
        ),
        Span::styled("q/Esc: Quit", Style::default().fg(COLOR_BRAND).add_modifier(Modifier::BOLD)),
    ]))
    .alignment(Alignment::Center);

    f.render_widget(footer, area);
}
