use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};
use tui_textarea::{CursorMove, Input, Key, TextArea};

use crate::config::Theme;

/// Outcome of feeding a key to a [`TextInput`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextInputEvent {
    None,
    /// Enter
    Submit,
    /// Esc
    Cancel,
}

/// Single-line input on top of tui-textarea.
///
/// `allowed` restricts which characters can be typed and `max_chars` caps
/// the length; the date-range editor uses both for `YYYY-MM-DD` fields.
pub struct TextInput {
    textarea: TextArea<'static>,
    allowed: Option<fn(char) -> bool>,
    max_chars: Option<usize>,
    text_color: Option<Color>,
    focused: bool,
}

impl TextInput {
    pub fn new() -> Self {
        let mut input = Self {
            textarea: TextArea::default(),
            allowed: None,
            max_chars: None,
            text_color: None,
            focused: false,
        };
        input.apply_style();
        input
    }

    /// Input for a `YYYY-MM-DD` day.
    pub fn for_date() -> Self {
        let mut input = Self::new();
        input.allowed = Some(|c| c.is_ascii_digit() || c == '-');
        input.max_chars = Some(10);
        input.textarea.set_placeholder_text("YYYY-MM-DD");
        input
    }

    pub fn with_theme(mut self, theme: &Theme) -> Self {
        self.text_color = Some(theme.get("text_primary"));
        self.apply_style();
        self
    }

    fn apply_style(&mut self) {
        let mut style = Style::default();
        if let Some(color) = self.text_color {
            style = style.fg(color);
        }
        self.textarea.set_style(style);
        self.textarea.set_cursor_line_style(Style::default());
        let cursor = if self.focused {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            // same as the text style: hidden
            style
        };
        self.textarea.set_cursor_style(cursor);
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        self.apply_style();
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn value(&self) -> &str {
        self.textarea
            .lines()
            .first()
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Replace the content and put the cursor at the end.
    pub fn set_value(&mut self, value: &str) {
        let single_line = value.replace(['\n', '\r'], " ");
        let placeholder = self.textarea.placeholder_text().to_string();
        self.textarea = TextArea::new(vec![single_line]);
        self.textarea.set_placeholder_text(placeholder);
        self.textarea.move_cursor(CursorMove::End);
        self.apply_style();
    }

    pub fn clear(&mut self) {
        self.set_value("");
    }

    pub fn is_empty(&self) -> bool {
        self.value().is_empty()
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> TextInputEvent {
        match event.code {
            KeyCode::Enter => return TextInputEvent::Submit,
            KeyCode::Esc => return TextInputEvent::Cancel,
            KeyCode::Char(c) => {
                if let Some(allowed) = self.allowed {
                    if !allowed(c) {
                        return TextInputEvent::None;
                    }
                }
                if let Some(max) = self.max_chars {
                    if self.value().chars().count() >= max {
                        return TextInputEvent::None;
                    }
                }
            }
            _ => {}
        }

        let input = key_event_to_input(event);
        if !matches!(input.key, Key::Null | Key::Enter | Key::Up | Key::Down) {
            self.textarea.input(input);
        }
        TextInputEvent::None
    }
}

impl Default for TextInput {
    fn default() -> Self {
        Self::new()
    }
}

fn key_event_to_input(event: &KeyEvent) -> Input {
    let key = match event.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::Enter => Key::Enter,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        _ => Key::Null,
    };
    Input {
        key,
        ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
        alt: event.modifiers.contains(KeyModifiers::ALT),
        shift: event.modifiers.contains(KeyModifiers::SHIFT),
    }
}

impl Widget for &TextInput {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.textarea.render(area, buf);

        // tui-textarea underlines the cursor line
        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                let cell = &mut buf[(x, y)];
                let style = cell.style().remove_modifier(Modifier::UNDERLINED);
                cell.set_style(style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(input: &mut TextInput, s: &str) {
        for c in s.chars() {
            input.handle_key(&key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_new_is_empty() {
        let input = TextInput::new();
        assert_eq!(input.value(), "");
        assert!(input.is_empty());
        assert!(!input.is_focused());
    }

    #[test]
    fn test_set_value_and_clear() {
        let mut input = TextInput::new();
        input.set_value("2017-01-01");
        assert_eq!(input.value(), "2017-01-01");
        input.clear();
        assert!(input.is_empty());
    }

    #[test]
    fn test_date_input_filters_and_caps() {
        let mut input = TextInput::for_date();
        type_str(&mut input, "2017-0a1-15xyz99");
        assert_eq!(input.value(), "2017-01-15");
    }

    #[test]
    fn test_backspace_and_submit() {
        let mut input = TextInput::for_date();
        type_str(&mut input, "2018-1");
        input.handle_key(&key(KeyCode::Backspace));
        assert_eq!(input.value(), "2018-");
        assert_eq!(
            input.handle_key(&key(KeyCode::Enter)),
            TextInputEvent::Submit
        );
        assert_eq!(input.handle_key(&key(KeyCode::Esc)), TextInputEvent::Cancel);
    }
}
