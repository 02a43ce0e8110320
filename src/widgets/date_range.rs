//! Popup with start and end inputs for choosing the date range.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

use super::text_input::{TextInput, TextInputEvent};
use crate::config::Theme;
use crate::dataset::DateRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateField {
    #[default]
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateRangeAction {
    None,
    Cancel,
    /// Raw start and end text; parsing and bounds checks happen in the caller.
    Submit(String, String),
}

pub struct DateRangeModal {
    pub active: bool,
    pub start: TextInput,
    pub end: TextInput,
    pub focus: DateField,
    /// "first .. last" of the loaded data, shown as a hint.
    pub bounds_hint: String,
    border: Color,
    border_active: Color,
}

impl Default for DateRangeModal {
    fn default() -> Self {
        Self::new()
    }
}

impl DateRangeModal {
    pub fn new() -> Self {
        Self {
            active: false,
            start: TextInput::for_date(),
            end: TextInput::for_date(),
            focus: DateField::Start,
            bounds_hint: String::new(),
            border: Color::Cyan,
            border_active: Color::Yellow,
        }
    }

    pub fn with_theme(mut self, theme: &Theme) -> Self {
        self.start = TextInput::for_date().with_theme(theme);
        self.end = TextInput::for_date().with_theme(theme);
        self.border = theme.get("modal_border");
        self.border_active = theme.get("modal_border_active");
        self
    }

    /// Show the popup pre-filled with `current`.
    pub fn open(&mut self, current: DateRange, bounds: DateRange) {
        self.active = true;
        self.start.set_value(&current.start().to_string());
        self.end.set_value(&current.end().to_string());
        self.bounds_hint = bounds.to_string();
        self.set_focus(DateField::Start);
    }

    pub fn close(&mut self) {
        self.active = false;
        self.start.set_focused(false);
        self.end.set_focused(false);
    }

    fn set_focus(&mut self, focus: DateField) {
        self.focus = focus;
        self.start.set_focused(focus == DateField::Start);
        self.end.set_focused(focus == DateField::End);
    }

    fn toggle_focus(&mut self) {
        let next = match self.focus {
            DateField::Start => DateField::End,
            DateField::End => DateField::Start,
        };
        self.set_focus(next);
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> DateRangeAction {
        match event.code {
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.toggle_focus();
                return DateRangeAction::None;
            }
            _ => {}
        }

        let input = match self.focus {
            DateField::Start => &mut self.start,
            DateField::End => &mut self.end,
        };
        match input.handle_key(event) {
            TextInputEvent::Cancel => DateRangeAction::Cancel,
            // Enter on the start field moves on to the end field.
            TextInputEvent::Submit if self.focus == DateField::Start => {
                self.set_focus(DateField::End);
                DateRangeAction::None
            }
            TextInputEvent::Submit => DateRangeAction::Submit(
                self.start.value().to_string(),
                self.end.value().to_string(),
            ),
            TextInputEvent::None => DateRangeAction::None,
        }
    }
}

impl Widget for &DateRangeModal {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = 44.min(area.width);
        let height = 10.min(area.height);
        let popup = Rect::new(
            area.x + (area.width - width) / 2,
            area.y + (area.height - height) / 2,
            width,
            height,
        );
        Clear.render(popup, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Date range ")
            .border_style(Style::default().fg(self.border));
        let inner = block.inner(popup);
        block.render(popup, buf);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(1),
            ])
            .split(inner);

        for (idx, (label, input, field)) in [
            ("Start", &self.start, DateField::Start),
            ("End", &self.end, DateField::End),
        ]
        .into_iter()
        .enumerate()
        {
            let color = if self.focus == field {
                self.border_active
            } else {
                self.border
            };
            let field_block = Block::default()
                .borders(Borders::ALL)
                .title(label)
                .border_style(Style::default().fg(color));
            let field_inner = field_block.inner(rows[idx]);
            field_block.render(rows[idx], buf);
            input.render(field_inner, buf);
        }

        Paragraph::new(format!(
            "Data: {}\nTab switch · Enter apply · Esc cancel",
            self.bounds_hint
        ))
        .style(Style::default().fg(Color::DarkGray))
        .render(rows[2], buf);
    }
}
