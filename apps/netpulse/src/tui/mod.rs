mod ui;

use std::io::{Stdout, stdout};

use anyhow::{Context, Result};
use crossterm::cursor::{Hide, Show};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use netpulse_core::{Frame as MonitorFrame, RenderSink};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::warn;

/// Full-screen dashboard. Owns the terminal until [`TerminalSink::restore`]
/// is called or the sink is dropped.
pub struct TerminalSink {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    spinner: usize,
    active: bool,
}

impl TerminalSink {
    /// Init terminal in alternate screen
    pub fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut out = stdout();
        execute!(out, EnterAlternateScreen, Hide)?;

        let mut terminal = Terminal::new(CrosstermBackend::new(out))?;
        terminal.clear()?;
        Ok(Self { terminal, spinner: 0, active: true })
    }

    pub fn restore(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        let exec_result = execute!(self.terminal.backend_mut(), Show, LeaveAlternateScreen);
        let raw_mode_result = disable_raw_mode();
        exec_result.and(raw_mode_result).context("Failed to restore terminal")
    }
}

impl Drop for TerminalSink {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!("{:#}", e);
        }
    }
}

impl RenderSink for TerminalSink {
    fn display(&mut self, frame: &MonitorFrame) -> Result<()> {
        self.spinner = self.spinner.wrapping_add(1);
        let spinner = self.spinner;
        self.terminal.draw(|f| ui::render(f, frame, spinner))?;
        Ok(())
    }
}

/// Resolves once the operator asks to quit. Raw mode swallows SIGINT, so
/// Ctrl-C arrives here as a key event.
pub async fn wait_for_quit() {
    let mut events = EventStream::new();

    while let Some(event) = events.next().await {
        match event {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press && is_quit(&key) => return,
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to read terminal input: {}", e);
                return;
            }
        }
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => key.modifiers.is_empty(),
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}
