use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

/// Single-line text field. The cursor counts characters, not bytes.
#[derive(Debug, Clone)]
pub struct InputField {
    pub value: String,
    pub cursor: usize,
    pub placeholder: String,
    pub label: String,
    pub focused: bool,
    /// Render every character as `*` (API keys).
    pub masked: bool,
}

impl InputField {
    pub fn new(label: &str, placeholder: &str) -> Self {
        Self {
            value: String::new(),
            cursor: 0,
            placeholder: placeholder.to_string(),
            label: label.to_string(),
            focused: false,
            masked: false,
        }
    }

    pub fn masked(label: &str, placeholder: &str) -> Self {
        Self {
            masked: true,
            ..Self::new(label, placeholder)
        }
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.set_value(value);
        self
    }

    pub fn set_value(&mut self, value: &str) {
        self.value = value.to_string();
        self.cursor = self.char_len();
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) => {
                let at = self.byte_index(self.cursor);
                self.value.insert(at, c);
                self.cursor += 1;
                true
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_index(self.cursor);
                    self.value.remove(at);
                }
                true
            }
            KeyCode::Delete => {
                if self.cursor < self.char_len() {
                    let at = self.byte_index(self.cursor);
                    self.value.remove(at);
                }
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                true
            }
            KeyCode::Right => {
                if self.cursor < self.char_len() {
                    self.cursor += 1;
                }
                true
            }
            KeyCode::Home => {
                self.cursor = 0;
                true
            }
            KeyCode::End => {
                self.cursor = self.char_len();
                true
            }
            _ => false,
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.label.as_str())
            .border_style(if self.focused {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::Gray)
            });

        let text = if self.value.is_empty() && !self.focused {
            Line::from(Span::styled(
                &self.placeholder,
                Style::default().fg(Color::DarkGray),
            ))
        } else {
            let shown = self.display_value();
            if self.focused {
                let (before, after) = shown.split_at(byte_index(&shown, self.cursor));
                Line::from(vec![
                    Span::raw(before.to_string()),
                    Span::styled("│", Style::default().fg(Color::Yellow)),
                    Span::raw(after.to_string()),
                ])
            } else {
                Line::from(Span::raw(shown))
            }
        };

        let paragraph = Paragraph::new(text).block(block);
        f.render_widget(paragraph, area);
    }

    pub fn display_value(&self) -> String {
        if self.masked {
            "*".repeat(self.char_len())
        } else {
            self.value.clone()
        }
    }

    pub fn trimmed(&self) -> &str {
        self.value.trim()
    }

    pub fn is_valid(&self) -> bool {
        !self.value.trim().is_empty()
    }

    fn char_len(&self) -> usize {
        self.value.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        byte_index(&self.value, char_index)
    }
}

fn byte_index(s: &str, char_index: usize) -> usize {
    s.char_indices()
        .nth(char_index)
        .map_or(s.len(), |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(field: &mut InputField, code: KeyCode) {
        field.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_str(field: &mut InputField, s: &str) {
        for c in s.chars() {
            press(field, KeyCode::Char(c));
        }
    }

    #[test]
    fn edits_multibyte_text_by_character() {
        let mut field = InputField::new("Keyword", "");
        type_str(&mut field, "kopi señor");
        press(&mut field, KeyCode::Left);
        press(&mut field, KeyCode::Left);
        press(&mut field, KeyCode::Backspace);
        assert_eq!(field.value, "kopi seor");

        press(&mut field, KeyCode::Home);
        press(&mut field, KeyCode::Delete);
        type_str(&mut field, "K");
        assert_eq!(field.value, "Kopi seor");
        assert_eq!(field.cursor, 1);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut field = InputField::new("Keyword", "").with_value("ab");
        press(&mut field, KeyCode::Right);
        assert_eq!(field.cursor, 2);
        press(&mut field, KeyCode::Home);
        press(&mut field, KeyCode::Left);
        press(&mut field, KeyCode::Backspace);
        assert_eq!((field.value.as_str(), field.cursor), ("ab", 0));
    }

    #[test]
    fn masked_field_hides_the_key() {
        let field = InputField::masked("YouTube API key", "").with_value("AIza-secret");
        assert_eq!(field.display_value(), "***********");
        assert_eq!(field.trimmed(), "AIza-secret");
    }
}
