use netpulse_core::{Frame as MonitorFrame, Latest, Summary};
use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};

use super::{COLOR_BRAND, COLOR_ERROR, COLOR_LABEL, COLOR_MUTED, COLOR_SUCCESS, COLOR_WARNING};
use crate::format;

fn latest_style(latest: &Latest) -> Style {
    match latest {
        Latest::NoData => Style::default().fg(COLOR_MUTED),
        Latest::Latency(_) => Style::default().fg(COLOR_SUCCESS),
        Latest::Down(_) => Style::default().fg(COLOR_ERROR).add_modifier(Modifier::BOLD),
    }
}

fn row(summary: &Summary, width: usize) -> Row<'static> {
    let loss_style = if summary.window.failures > 0 {
        Style::default().fg(COLOR_WARNING)
    } else {
        Style::default().fg(COLOR_LABEL)
    };

    Row::new(vec![
        Cell::from(summary.endpoint.label()),
        Cell::from(Span::styled(summary.endpoint.kind.as_str(), Style::default().fg(COLOR_MUTED))),
        Cell::from(Span::styled(summary.latest.to_string(), latest_style(&summary.latest))),
        Cell::from(format::mean(&summary.window)),
        Cell::from(Span::styled(format::loss(&summary.window), loss_style)),
        Cell::from(Span::styled(format::trend(summary, width), Style::default().fg(COLOR_BRAND))),
    ])
}

pub fn render(f: &mut Frame, area: Rect, frame: &MonitorFrame) {
    let width = frame.history_width;
    let rows: Vec<Row> = frame.summaries.iter().map(|s| row(s, width)).collect();

    let header = Row::new(vec!["Endpoint", "Kind", "Latency", "Avg", "Loss", "Trend"])
        .style(Style::default().fg(COLOR_LABEL).add_modifier(Modifier::BOLD));

    let widths = [
        Constraint::Min(20),
        Constraint::Length(6),
        Constraint::Length(22),
        Constraint::Length(10),
        Constraint::Length(5),
        Constraint::Length(width as u16),
    ];

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Endpoints ")
            .border_style(Style::default().fg(COLOR_BRAND)),
    );

    f.render_widget(Clear, area);
    f.render_widget(table, area);
}

pub fn render_download(f: &mut Frame, area: Rect, frame: &MonitorFrame) {
    let (Some(url), Some(throughput)) = (&frame.download_url, &frame.throughput) else {
        return;
    };

    let line = Line::from(vec![
        Span::styled(format::rate(throughput.latest.as_ref()), Style::default().fg(COLOR_SUCCESS)),
        Span::raw("  "),
        Span::styled(
            format!("{:>width$}", throughput.sparkline, width = frame.history_width),
            Style::default().fg(COLOR_BRAND),
        ),
    ]);

    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Download {url} "))
            .border_style(Style::default().fg(COLOR_BRAND)),
    );

    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}
