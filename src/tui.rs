use std::io::{self, Stderr};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::warn;

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

/// Redraw cadence while output is being animated
pub const FRAME_RATE: Duration = Duration::from_millis(33);

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    WheelUp,
    WheelDown,
    /// Resize or frame tick; nothing to handle beyond drawing again
    Redraw,
}

fn translate(event: Event) -> Option<AppEvent> {
    match event {
        // Release and repeat events would double every keystroke
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollUp => Some(AppEvent::WheelUp),
            MouseEventKind::ScrollDown => Some(AppEvent::WheelDown),
            _ => None,
        },
        Event::Resize(_, _) => Some(AppEvent::Redraw),
        _ => None,
    }
}

pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    _tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventHandler {
    pub fn new(frame_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let _tx = tx.clone();

        let tx_events = tx.clone();
        tokio::spawn(async move {
            let mut reader = event::EventStream::new();
            while let Some(evt) = reader.next().await {
                let evt = match evt {
                    Ok(evt) => evt,
                    Err(e) => {
                        warn!("terminal event stream failed: {}", e);
                        break;
                    }
                };
                if let Some(app_event) = translate(evt) {
                    if tx_events.send(app_event).is_err() {
                        break;
                    }
                }
            }
        });

        // Frame clock; the engine updates the surface from its own task
        let tx_frame = tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(frame_rate);
            loop {
                interval.tick().await;
                if tx_frame.send(AppEvent::Redraw).is_err() {
                    break;
                }
            }
        });

        Self { rx, _tx }
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stderr(), EnterAlternateScreen, EnableMouseCapture)?;

    let mut terminal = Terminal::new(CrosstermBackend::new(io::stderr()))?;
    terminal.clear()?;
    Ok(terminal)
}

pub fn restore() -> Result<()> {
    execute!(io::stderr(), DisableMouseCapture, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Put the terminal back before the default hook prints the panic
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers, MouseEvent};

    fn mouse(kind: MouseEventKind) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn test_key_release_is_dropped() {
        let mut key = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        assert!(matches!(translate(Event::Key(key)), Some(AppEvent::Key(_))));

        key.kind = KeyEventKind::Release;
        assert!(translate(Event::Key(key)).is_none());
    }

    #[test]
    fn test_wheel_and_resize() {
        assert!(matches!(translate(mouse(MouseEventKind::ScrollUp)), Some(AppEvent::WheelUp)));
        assert!(matches!(translate(mouse(MouseEventKind::ScrollDown)), Some(AppEvent::WheelDown)));
        assert!(translate(mouse(MouseEventKind::Moved)).is_none());
        assert!(matches!(translate(Event::Resize(80, 24)), Some(AppEvent::Redraw)));
    }
}
