use tokio::sync::mpsc;

use crate::dispatcher::KeyInput;
use crate::surface::SharedSurface;

/// Draw-side state; the session itself lives in the engine task
pub struct App {
    pub should_quit: bool,
    pub surface: SharedSurface,
    pub keys: mpsc::UnboundedSender<KeyInput>,
    pub prompt: String,

    // Height of the output area, updated during render
    pub output_height: u16,
}

impl App {
    pub fn new(surface: SharedSurface, keys: mpsc::UnboundedSender<KeyInput>, prompt: &str) -> Self {
        Self {
            should_quit: false,
            surface,
            keys,
            prompt: prompt.to_string(),
            output_height: 0,
        }
    }

    /// Forward a key to the engine; a closed engine ends the app
    pub fn send_key(&mut self, key: KeyInput) {
        if self.keys.send(key).is_err() {
            self.should_quit = true;
        }
    }

    pub fn scroll_up(&mut self, rows: u16) {
        self.surface.lock().scroll_up(rows);
    }

    pub fn scroll_down(&mut self, rows: u16) {
        self.surface.lock().scroll_down(rows);
    }

    pub fn page_rows(&self) -> u16 {
        self.output_height.saturating_sub(1).max(1)
    }
}
