use std::{
    io,
    time::{Duration, Instant},
};

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Paragraph},
};
use tui_logger::{TuiLoggerSmartWidget, TuiWidgetState};

use crate::gym::DroneGrid;

mod grid;
mod tui;

pub use grid::GridView;

/// Full-screen view of the environment with a status line and the log stream
///
/// Drawing happens synchronously on the caller's thread. The first terminal error
/// stops further drawing and is returned by [`Viewer::finish`].
pub struct Viewer {
    terminal: tui::Tui,
    logs: TuiWidgetState,
    quit: bool,
    error: Option<io::Error>,
}

impl Viewer {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            terminal: tui::init()?,
            logs: TuiWidgetState::new().set_default_display_level(log::LevelFilter::Info),
            quit: false,
            error: None,
        })
    }

    /// False once `q` or `Esc` was pressed or the terminal failed
    pub fn is_open(&self) -> bool {
        !self.quit && self.error.is_none()
    }

    /// Draw the environment, then wait `delay` while watching for a quit key
    ///
    /// Does nothing once quit was requested or a terminal error occurred
    pub fn show(&mut self, env: &DroneGrid, status: &str, delay: Duration) {
        if !self.is_open() {
            return;
        }
        let result = match self.draw(env, status) {
            Ok(()) => self.wait(delay),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.error = Some(e);
        }
    }

    /// Restore the terminal, surfacing the first drawing error if any
    pub fn finish(mut self) -> io::Result<()> {
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn draw(&mut self, env: &DroneGrid, status: &str) -> io::Result<()> {
        let grid = GridView::new(env);
        let logs = &self.logs;
        self.terminal.draw(|frame| {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(grid.height()),
                    Constraint::Length(3),
                    Constraint::Fill(1),
                ])
                .split(frame.size());
            let top = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(grid.width()), Constraint::Fill(1)])
                .split(rows[0]);

            frame.render_widget(grid, top[0]);
            frame.render_widget(
                Paragraph::new(status).block(
                    Block::bordered()
                        .border_type(BorderType::Rounded)
                        .title("Status"),
                ),
                rows[1],
            );
            frame.render_widget(
                TuiLoggerSmartWidget::default()
                    .style(Style::default().white())
                    .style_error(Style::default().light_red())
                    .style_warn(Style::default().light_yellow())
                    .style_info(Style::default().cyan())
                    .output_separator(' ')
                    .state(logs),
                rows[2],
            );
        })?;
        Ok(())
    }

    fn wait(&mut self, delay: Duration) -> io::Result<()> {
        let deadline = Instant::now() + delay;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !event::poll(remaining)? {
                return Ok(());
            }
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press
                    && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
                {
                    self.quit = true;
                    return Ok(());
                }
            }
        }
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        let _ = tui::restore();
    }
}
