//! Full-screen terminal display built on ratatui-image.

use anyhow::Result;
use crossterm::{
    cursor::Show,
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use image::{imageops::FilterType, DynamicImage};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};
use ratatui_image::{picker::Picker, protocol::StatefulProtocol, Resize, StatefulImage};
use std::io::{self, Stdout};

use super::{key_action, DisplaySurface, KeyAction, ViewFrame};
use crate::config::{ImageProtocol, ViewerConfig};

/// Cell size assumed when the terminal cannot be queried.
const FALLBACK_FONT_SIZE: (u16, u16) = (8, 16);

/// Leaves raw mode and the alternate screen when dropped, whatever path the
/// viewer exits through.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let guard = TerminalGuard;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
    }
}

pub struct TerminalDisplay {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    picker: Picker,
    max_size: u32,
    _guard: TerminalGuard,
}

impl TerminalDisplay {
    pub fn new(config: &ViewerConfig) -> Result<Self> {
        // The capability query needs raw mode on the alternate screen.
        let guard = TerminalGuard::enter()?;
        let picker = create_picker(config.protocol);
        let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

        Ok(Self {
            terminal,
            picker,
            max_size: config.max_size,
            _guard: guard,
        })
    }

    fn prepare(&mut self, image: &DynamicImage) -> StatefulProtocol {
        let fitted = if image.width() > self.max_size || image.height() > self.max_size {
            image.resize(self.max_size, self.max_size, FilterType::Triangle)
        } else {
            image.clone()
        };
        self.picker.new_resize_protocol(fitted)
    }
}

fn create_picker(protocol: ImageProtocol) -> Picker {
    match protocol {
        ImageProtocol::Auto => Picker::from_query_stdio().unwrap_or_else(|e| {
            tracing::warn!("Terminal graphics query failed, using halfblocks: {:?}", e);
            Picker::from_fontsize(FALLBACK_FONT_SIZE)
        }),
        ImageProtocol::Halfblocks => Picker::from_fontsize(FALLBACK_FONT_SIZE),
    }
}

impl DisplaySurface for TerminalDisplay {
    fn show(&mut self, frame: &ViewFrame<'_>) -> Result<KeyAction> {
        let mut protocol = self.prepare(frame.image);
        self.terminal.clear()?;

        loop {
            self.terminal.draw(|f| render(f, frame, &mut protocol))?;

            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    return Ok(key_action(key.code, key.modifiers));
                }
                // Anything else, resizes included, just redraws.
                _ => {}
            }
        }
    }
}

fn render(f: &mut Frame, view: &ViewFrame<'_>, protocol: &mut StatefulProtocol) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(2)])
        .split(f.area());

    let block = Block::default()
        .borders(Borders::NONE)
        .style(Style::default().bg(Color::Black));
    f.render_widget(block, chunks[0]);

    let image = StatefulImage::new(None).resize(Resize::Fit(None));
    f.render_stateful_widget(image, chunks[0], protocol);

    render_status_bar(f, view, chunks[1]);
}

fn render_status_bar(f: &mut Frame, view: &ViewFrame<'_>, area: Rect) {
    let status_line = format!(
        " ObjId {} | {}/{} | {}x{} ",
        view.obj_id,
        view.position,
        view.total,
        view.image.width(),
        view.image.height()
    );
    let help = " any key: next | Esc/q: quit";

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    f.render_widget(
        Paragraph::new(status_line).style(Style::default().fg(Color::Cyan)),
        chunks[0],
    );
    f.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        chunks[1],
    );
}
