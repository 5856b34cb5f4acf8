//! Output renderer: appends fragments to the surface and owns the timing
//! primitives used by animated text.

use std::sync::Arc;
use std::time::Duration;

use crate::sound::KeystrokeCue;
use crate::surface::{InputLine, SharedSurface, StyleTag};

#[derive(Clone)]
pub struct Output {
    surface: SharedSurface,
    cue: Arc<dyn KeystrokeCue>,
}

impl Output {
    pub fn new(surface: SharedSurface, cue: Arc<dyn KeystrokeCue>) -> Self {
        Self { surface, cue }
    }

    #[cfg(test)]
    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    pub fn text(&self, text: &str, style: Option<StyleTag>) {
        self.surface.lock().push_text(text, style);
    }

    /// Pre-formatted markup, rendered verbatim
    pub fn markup(&self, markup: &str) {
        self.surface.lock().push_markup(markup);
    }

    /// Bright system message on its own line
    pub fn system(&self, message: &str) {
        self.text(&format!("{}\n", message), Some(StyleTag::Bright));
    }

    /// End a partial line so the next message starts on its own line
    pub fn break_line(&self) {
        let mut surface = self.surface.lock();
        if !surface.at_line_start() {
            surface.push_text("\n", None);
        }
    }

    pub fn error(&self, message: &str) {
        self.text(&format!("{}\n", message), Some(StyleTag::Error));
    }

    pub fn clear(&self) {
        self.surface.lock().clear();
    }

    pub fn scroll_to_bottom(&self) {
        self.surface.lock().scroll_to_bottom();
    }

    /// Fire-and-forget keystroke cue, suppressed when sound is off
    pub fn keystroke(&self, sound_enabled: bool) {
        if sound_enabled {
            self.cue.play();
        }
    }

    pub async fn delay(&self, ms: u64) {
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    /// Reveal `text` one char at a time, waiting `delay_ms` after each
    pub async fn type_text(&self, text: &str, style: Option<StyleTag>, delay_ms: u64, sound_enabled: bool) {
        let index = self.surface.lock().push_text("", style);
        for c in text.chars() {
            self.surface.lock().reveal(index, c);
            self.keystroke(sound_enabled);
            self.delay(delay_ms).await;
        }
    }

    /// Create a fresh, empty input line
    pub fn open_input(&self) {
        self.surface.lock().input = Some(InputLine::default());
    }

    pub fn close_input(&self) {
        self.surface.lock().input = None;
    }

    pub fn has_input(&self) -> bool {
        self.surface.lock().input.is_some()
    }

    pub fn input_text(&self) -> Option<String> {
        self.surface.lock().input.as_ref().map(|input| input.buffer.clone())
    }

    /// Apply an edit to the input line if one exists
    pub fn edit_input<F: FnOnce(&mut InputLine)>(&self, edit: F) -> bool {
        match self.surface.lock().input.as_mut() {
            Some(input) => {
                edit(input);
                true
            }
            None => false,
        }
    }
}
