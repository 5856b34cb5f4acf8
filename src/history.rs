/// Direction of a history navigation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Older,
    Newer,
}

/// Submitted commands plus a browsing cursor
///
/// The cursor ranges over `0..=len`; `len` means "not browsing" and the
/// field shows the draft that was there before browsing began.
#[derive(Debug, Clone, Default)]
pub struct CommandHistory {
    entries: Vec<String>,
    cursor: usize,
    draft: String,
}

impl CommandHistory {
    pub fn new(entries: Vec<String>) -> Self {
        let cursor = entries.len();
        Self {
            entries,
            cursor,
            draft: String::new(),
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_browsing(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Append a submission and stop browsing
    pub fn push(&mut self, command: &str) {
        self.entries.push(command.to_string());
        self.cursor = self.entries.len();
        self.draft.clear();
    }

    /// Move the cursor one step; returns the new field text, or `None` at
    /// the boundary. `field` is the current field content, kept as the
    /// draft when browsing starts.
    pub fn navigate(&mut self, direction: Direction, field: &str) -> Option<String> {
        match direction {
            Direction::Older => {
                if self.cursor == 0 {
                    return None;
                }
                if !self.is_browsing() {
                    self.draft = field.to_string();
                }
                self.cursor -= 1;
                Some(self.entries[self.cursor].clone())
            }
            Direction::Newer => {
                if !self.is_browsing() {
                    return None;
                }
                self.cursor += 1;
                match self.entries.get(self.cursor) {
                    Some(entry) => Some(entry.clone()),
                    None => Some(self.draft.clone()),
                }
            }
        }
    }
}
