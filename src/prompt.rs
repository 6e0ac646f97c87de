use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What a prompt keystroke resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
    Editing,
    Submitted(String),
    Canceled,
}

/// A single-line editor for the command line at the bottom of the screen.
#[derive(Debug, Default)]
pub struct Prompt {
    label: String,
    buffer: String,
    cursor: usize, // position in chars, not bytes
}

impl Prompt {
    pub fn new(label: impl Into<String>) -> Self {
        Prompt {
            label: label.into(),
            buffer: String::new(),
            cursor: 0,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn read(&mut self, key: KeyEvent) -> PromptEvent {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => PromptEvent::Submitted(self.buffer.clone()),
            (KeyCode::Esc, _) => PromptEvent::Canceled,
            (KeyCode::Backspace, _) => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_pos(self.cursor);
                    self.buffer.remove(at);
                }
                PromptEvent::Editing
            }
            (KeyCode::Left, _) => {
                self.cursor = self.cursor.saturating_sub(1);
                PromptEvent::Editing
            }
            (KeyCode::Right, _) => {
                if self.cursor < self.buffer.chars().count() {
                    self.cursor += 1;
                }
                PromptEvent::Editing
            }
            (code, KeyModifiers::NONE | KeyModifiers::SHIFT) => {
                if let Some(c) = code.as_char() {
                    let at = self.byte_pos(self.cursor);
                    self.buffer.insert(at, c);
                    self.cursor += 1;
                }
                PromptEvent::Editing
            }
            _ => PromptEvent::Editing,
        }
    }

    fn byte_pos(&self, char_pos: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(char_pos)
            .map(|(idx, _)| idx)
            .unwrap_or(self.buffer.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn typing_and_submitting() {
        let mut prompt = Prompt::new("Filter");
        for c in "ab".chars() {
            assert_eq!(prompt.read(key(KeyCode::Char(c))), PromptEvent::Editing);
        }
        assert_eq!(
            prompt.read(key(KeyCode::Enter)),
            PromptEvent::Submitted("ab".to_string())
        );
    }

    #[test]
    fn backspace_and_mid_buffer_insert() {
        let mut prompt = Prompt::new("");
        for c in "abc".chars() {
            prompt.read(key(KeyCode::Char(c)));
        }
        prompt.read(key(KeyCode::Left));
        prompt.read(key(KeyCode::Backspace));
        prompt.read(key(KeyCode::Char('x')));
        assert_eq!(prompt.buffer(), "axc");
    }

    #[test]
    fn escape_cancels() {
        let mut prompt = Prompt::new("");
        prompt.read(key(KeyCode::Char('z')));
        assert_eq!(prompt.read(key(KeyCode::Esc)), PromptEvent::Canceled);
    }

    #[test]
    fn multibyte_input_keeps_cursor_consistent() {
        let mut prompt = Prompt::new("");
        prompt.read(key(KeyCode::Char('ü')));
        prompt.read(key(KeyCode::Char('b')));
        prompt.read(key(KeyCode::Left));
        prompt.read(key(KeyCode::Backspace));
        assert_eq!(prompt.buffer(), "b");
    }
}
