use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Paragraph, Widget},
};

const CONTROLS: [(&str, &str); 7] = [
    ("Tab", "Next"),
    ("d", "Dates"),
    ("r", "Reset"),
    ("e", "Export"),
    ("?", "Help"),
    ("q", "Quit"),
    ("←→", "Tabs"),
];

/// Key hints along the bottom of the screen, plus the row count in range.
pub struct Controls {
    pub rows_in_range: Option<usize>,
    pub dimmed: bool,
    pub bg: Color,
    pub fg: Color,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            rows_in_range: None,
            dimmed: false,
            bg: Color::DarkGray,
            fg: Color::White,
        }
    }
}

impl Controls {
    pub fn with_rows(rows_in_range: usize) -> Self {
        Self {
            rows_in_range: Some(rows_in_range),
            ..Self::default()
        }
    }

    /// Grey out while a modal has focus.
    pub fn with_dimmed(mut self, dimmed: bool) -> Self {
        self.dimmed = dimmed;
        self
    }

    pub fn with_colors(mut self, bg: Color, fg: Color) -> Self {
        self.bg = bg;
        self.fg = fg;
        self
    }
}

impl Widget for &Controls {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut constraints = CONTROLS.iter().fold(vec![], |mut acc, (key, action)| {
            acc.push(Constraint::Length(key.chars().count() as u16 + 2));
            acc.push(Constraint::Length(action.chars().count() as u16 + 1));
            acc
        });
        if self.rows_in_range.is_some() {
            constraints.push(Constraint::Length(18));
        }
        constraints.push(Constraint::Fill(1));

        let layout = Layout::new(Direction::Horizontal, constraints).split(area);
        let base_style = if self.dimmed {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        for (i, (key, action)) in CONTROLS.iter().enumerate() {
            let j = i * 2;
            Paragraph::new(*key)
                .style(base_style.add_modifier(Modifier::BOLD))
                .centered()
                .render(layout[j], buf);
            Paragraph::new(*action)
                .style(base_style.bg(self.bg))
                .render(layout[j + 1], buf);
        }

        let mut fill_idx = CONTROLS.len() * 2;
        if let Some(rows) = self.rows_in_range {
            let fg = if self.dimmed { Color::DarkGray } else { self.fg };
            Paragraph::new(format!("Rows: {}", rows))
                .style(base_style.bg(self.bg).fg(fg))
                .right_aligned()
                .render(layout[fill_idx], buf);
            fill_idx += 1;
        }

        Paragraph::new("")
            .style(base_style.bg(self.bg))
            .render(layout[fill_idx], buf);
    }
}
