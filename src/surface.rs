//! Rendering and input surface shared by the engine and the draw loop

use std::sync::{Arc, Mutex, MutexGuard};

/// Style hook attached to a plain text fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleTag {
    Error,
    Warning,
    Success,
    Dim,
    Bright,
}

impl StyleTag {
    /// Map a markup class name onto a style tag
    pub fn from_class(s: &str) -> Option<Self> {
        match s {
            "error" => Some(StyleTag::Error),
            "warning" => Some(StyleTag::Warning),
            "success" => Some(StyleTag::Success),
            "dim" => Some(StyleTag::Dim),
            "bright" => Some(StyleTag::Bright),
            _ => None,
        }
    }
}

/// One appended unit of output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text { text: String, style: Option<StyleTag> },
    Markup(String),
}

/// Single-line text field with a char cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputLine {
    pub buffer: String,
    pub cursor: usize,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl InputLine {
    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.buffer, self.cursor);
        self.buffer.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.buffer, self.cursor);
            self.buffer.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.buffer.chars().count() {
            let byte_pos = char_to_byte_index(&self.buffer, self.cursor);
            self.buffer.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.buffer.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.buffer.chars().count();
    }

    /// Replace the whole field, cursor at the end
    pub fn set(&mut self, text: &str) {
        self.buffer = text.to_string();
        self.end();
    }
}

#[derive(Debug, Default)]
pub struct Surface {
    pub fragments: Vec<Fragment>,
    pub input: Option<InputLine>,
    /// Keep the view pinned to the last line
    pub follow: bool,
    /// First visible row when not following
    pub scroll: u16,
}

impl Surface {
    pub fn new() -> Self {
        Self {
            follow: true,
            ..Self::default()
        }
    }

    pub fn push_text(&mut self, text: &str, style: Option<StyleTag>) -> usize {
        self.fragments.push(Fragment::Text {
            text: text.to_string(),
            style,
        });
        self.fragments.len() - 1
    }

    pub fn push_markup(&mut self, markup: &str) {
        self.fragments.push(Fragment::Markup(markup.to_string()));
    }

    /// Append one unit to a fragment started with an empty `push_text`
    pub fn reveal(&mut self, index: usize, c: char) {
        if let Some(Fragment::Text { text, .. }) = self.fragments.get_mut(index) {
            text.push(c);
        }
    }

    /// True when the next fragment would start a new line
    pub fn at_line_start(&self) -> bool {
        self.fragments
            .iter()
            .rev()
            .map(|fragment| match fragment {
                Fragment::Text { text, .. } => text.as_str(),
                Fragment::Markup(markup) => markup.as_str(),
            })
            .find(|text| !text.is_empty())
            .map_or(true, |text| text.ends_with('\n'))
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
        self.scroll = 0;
        self.follow = true;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow = true;
    }

    pub fn scroll_up(&mut self, rows: u16) {
        self.follow = false;
        self.scroll = self.scroll.saturating_sub(rows);
    }

    /// Scroll down; the draw loop re-pins once the end is visible
    pub fn scroll_down(&mut self, rows: u16) {
        self.scroll = self.scroll.saturating_add(rows);
    }

    /// Plain text of everything appended so far, markup included verbatim
    #[cfg(test)]
    pub fn transcript(&self) -> String {
        self.fragments
            .iter()
            .map(|fragment| match fragment {
                Fragment::Text { text, .. } => text.as_str(),
                Fragment::Markup(markup) => markup.as_str(),
            })
            .collect()
    }
}

/// Handle to the surface; the lock is never held across an await
#[derive(Clone)]
pub struct SharedSurface(Arc<Mutex<Surface>>);

impl SharedSurface {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Surface::new())))
    }

    pub fn lock(&self) -> MutexGuard<'_, Surface> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SharedSurface {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_line_editing_is_utf8_safe() {
        let mut input = InputLine::default();
        for c in "temp°C".chars() {
            input.insert(c);
        }
        input.left();
        input.backspace();
        assert_eq!(input.buffer, "temp°C".replace('°', ""));
        input.home();
        input.delete();
        assert_eq!(input.buffer, "empC");
        input.end();
        assert_eq!(input.cursor, 4);
    }

    #[test]
    fn test_set_moves_cursor_to_end() {
        let mut input = InputLine::default();
        input.set("status");
        assert_eq!(input.cursor, 6);
        input.right();
        assert_eq!(input.cursor, 6);
    }

    #[test]
    fn test_reveal_appends_to_fragment() {
        let mut surface = Surface::new();
        let idx = surface.push_text("", Some(StyleTag::Dim));
        surface.reveal(idx, 'a');
        surface.reveal(idx, 'b');
        assert_eq!(
            surface.fragments[idx],
            Fragment::Text {
                text: "ab".to_string(),
                style: Some(StyleTag::Dim)
            }
        );
    }

    #[test]
    fn test_line_start_skips_empty_fragments() {
        let mut surface = Surface::new();
        assert!(surface.at_line_start());

        surface.push_text("RAM - [", None);
        assert!(!surface.at_line_start());

        surface.push_text("", None);
        assert!(!surface.at_line_start());

        surface.push_markup("<span class=\"bright\">OK</span>\n");
        assert!(surface.at_line_start());
    }

    #[test]
    fn test_clear_resets_scroll() {
        let mut surface = Surface::new();
        surface.push_text("x\n", None);
        surface.scroll_up(3);
        assert!(!surface.follow);
        surface.clear();
        assert!(surface.fragments.is_empty());
        assert!(surface.follow);
    }
}
