use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;
use crate::dispatcher::KeyInput;
use crate::tui::AppEvent;

const WHEEL_ROWS: u16 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::WheelUp => app.scroll_up(WHEEL_ROWS),
        AppEvent::WheelDown => app.scroll_down(WHEEL_ROWS),
        AppEvent::Redraw => {}
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any phase
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d')) {
            app.should_quit = true;
        }
        return;
    }

    match key.code {
        KeyCode::PageUp => app.scroll_up(app.page_rows()),
        KeyCode::PageDown => app.scroll_down(app.page_rows()),
        code => {
            if let Some(input) = map_key(code) {
                app.send_key(input);
            }
        }
    }
}

/// Translate a terminal key into a dispatcher key
pub fn map_key(code: KeyCode) -> Option<KeyInput> {
    let input = match code {
        KeyCode::Enter => KeyInput::Enter,
        KeyCode::Up => KeyInput::Up,
        KeyCode::Down => KeyInput::Down,
        KeyCode::Char(c) => KeyInput::Char(c),
        KeyCode::Backspace => KeyInput::Backspace,
        KeyCode::Delete => KeyInput::Delete,
        KeyCode::Left => KeyInput::Left,
        KeyCode::Right => KeyInput::Right,
        KeyCode::Home => KeyInput::Home,
        KeyCode::End => KeyInput::End,
        _ => return None,
    };
    Some(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SharedSurface;
    use tokio::sync::mpsc;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn test_keys_are_forwarded_to_engine() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new(SharedSurface::new(), tx, "> ");

        handle_event(&mut app, key(KeyCode::Char('h'), KeyModifiers::NONE));
        handle_event(&mut app, key(KeyCode::Char('H'), KeyModifiers::SHIFT));
        handle_event(&mut app, key(KeyCode::F(5), KeyModifiers::NONE));
        handle_event(&mut app, key(KeyCode::Up, KeyModifiers::NONE));
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));

        let received: Vec<KeyInput> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            received,
            vec![KeyInput::Char('h'), KeyInput::Char('H'), KeyInput::Up, KeyInput::Enter]
        );
        assert!(!app.should_quit);
    }

    #[test]
    fn test_ctrl_c_quits_without_forwarding() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new(SharedSurface::new(), tx, "> ");
        handle_event(&mut app, key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_page_up_stops_following() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(SharedSurface::new(), tx, "> ");
        app.output_height = 10;
        handle_event(&mut app, key(KeyCode::PageUp, KeyModifiers::NONE));
        assert!(!app.surface.lock().follow);
    }

    #[test]
    fn test_wheel_scrolls_output() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(SharedSurface::new(), tx, "> ");
        app.surface.lock().scroll = 10;

        handle_event(&mut app, AppEvent::WheelUp);
        assert_eq!(app.surface.lock().scroll, 10 - WHEEL_ROWS);
        assert!(!app.surface.lock().follow);

        handle_event(&mut app, AppEvent::WheelDown);
        assert_eq!(app.surface.lock().scroll, 10);
    }

    #[test]
    fn test_closed_engine_ends_app() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut app = App::new(SharedSurface::new(), tx, "> ");
        handle_event(&mut app, key(KeyCode::Char('x'), KeyModifiers::NONE));
        assert!(app.should_quit);
    }
}
