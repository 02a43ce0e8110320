use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

pub mod aggregate;
pub mod chart_export;
pub mod config;
pub mod currency;
pub mod dataset;
pub mod error_display;
pub mod report;
pub mod summary;
pub mod widgets;

pub use config::{
    rgb_to_256_color, rgb_to_basic_ansi, AppConfig, ColorParser, ConfigManager, Theme,
};
pub use currency::CurrencyFormatter;
pub use dataset::{parse_day, Dataset, DateRange, FilteredView, LoadOptions};
pub use storedash_cli::{Args, CompressionFormat};
pub use summary::{Dashboard, DashboardOptions};

use chart_export::ChartExportOptions;
use widgets::controls::Controls;
use widgets::dashboard::{DashboardTab, DashboardView};
use widgets::date_range::{DateRangeAction, DateRangeModal};
use widgets::debug::DebugState;

/// Application name used for the config directory and other app-specific paths
pub const APP_NAME: &str = "storedash";

const HELP_TEXT: &str = "\
Tab / →        next tab
Shift+Tab / ←  previous tab
d              edit the date range
r              reset to the full data range
e              export charts as PNG
?              toggle this help
q / Esc        quit

Date range editor:
Tab / ↑ / ↓    switch between start and end
Enter          next field, then apply
Esc            cancel";

#[derive(Debug, Clone)]
pub enum AppEvent {
    Key(KeyEvent),
    /// Filter the dataset to this range and rebuild every table.
    Recompute(DateRange),
    Export,
    Exit,
    Crash(String),
    Resize(u16, u16), // resized (width, height)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    EditingRange,
}

#[derive(Default)]
pub struct ErrorModal {
    pub active: bool,
    pub message: String,
}

impl ErrorModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: String) {
        self.active = true;
        self.message = message;
    }

    pub fn hide(&mut self) {
        self.active = false;
        self.message.clear();
    }
}

pub struct App {
    dataset: Dataset,
    events: Sender<AppEvent>,
    /// Range of the dashboard on screen; only replaced by a successful recompute.
    range: DateRange,
    dashboard: Option<Dashboard>,
    options: DashboardOptions,
    export_options: ChartExportOptions,
    export_dir: PathBuf,
    money: CurrencyFormatter,
    theme: Theme,
    logo: Option<String>,
    pub tab: DashboardTab,
    pub input_mode: InputMode,
    pub date_modal: DateRangeModal,
    error_modal: ErrorModal,
    show_help: bool,
    /// One-line result of the last export.
    status: Option<String>,
    debug: DebugState,
}

impl App {
    pub fn new(dataset: Dataset, config: &AppConfig, events: Sender<AppEvent>) -> Result<App> {
        let theme = Theme::from_config(&config.theme)?;
        let money = config.currency_formatter()?;
        let logo = config
            .display
            .logo
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned());
        let range = dataset.full_range();

        Ok(App {
            dataset,
            events,
            range,
            dashboard: None,
            options: DashboardOptions {
                top_n: config.display.top_n,
                dense_daily: config.display.dense_daily,
            },
            export_options: ChartExportOptions::from_config(config),
            export_dir: config.chart_export.dir.clone(),
            money,
            date_modal: DateRangeModal::new().with_theme(&theme),
            theme,
            logo,
            tab: DashboardTab::default(),
            input_mode: InputMode::Normal,
            error_modal: ErrorModal::new(),
            show_help: false,
            status: None,
            debug: DebugState {
                enabled: config.debug.enabled,
                ..DebugState::default()
            },
        })
    }

    pub fn send_event(&mut self, event: AppEvent) -> Result<()> {
        self.events.send(event)?;
        Ok(())
    }

    pub fn enable_debug(&mut self) {
        self.debug.enabled = true;
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn dashboard(&self) -> Option<&Dashboard> {
        self.dashboard.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_modal
            .active
            .then_some(self.error_modal.message.as_str())
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn is_help_visible(&self) -> bool {
        self.show_help
    }

    fn recompute(&mut self, range: DateRange) {
        let result = self
            .dataset
            .filter(&range)
            .and_then(|view| Dashboard::compute(&view, &self.options));
        match result {
            Ok(dashboard) => {
                self.debug.on_recompute(dashboard.elapsed);
                self.range = range;
                self.dashboard = Some(dashboard);
            }
            Err(e) => {
                log::error!("recompute for {} failed: {:?}", range, e);
                self.error_modal
                    .show(error_display::user_message_from_report(&e, None));
            }
        }
    }

    fn export(&mut self) {
        let Some(dashboard) = &self.dashboard else {
            return;
        };
        match chart_export::export_dashboard(dashboard, &self.export_dir, &self.export_options) {
            Ok(paths) => {
                self.status = Some(format!(
                    "Exported {} charts to {}",
                    paths.len(),
                    self.export_dir.display()
                ));
            }
            Err(e) => {
                log::error!("chart export failed: {:?}", e);
                self.error_modal.show(format!(
                    "Chart export failed: {}",
                    error_display::user_message_from_report(&e, None)
                ));
            }
        }
    }

    /// Parse and bounds-check the editor's text. Errors leave the range as is.
    fn submit_range(&mut self, start: &str, end: &str) -> Option<AppEvent> {
        let selection = parse_day(start)
            .and_then(|s| parse_day(end).map(|e| (s, e)))
            .and_then(|(s, e)| self.dataset.validate_selection(s, e));
        match selection {
            Ok(range) => {
                self.date_modal.close();
                self.input_mode = InputMode::Normal;
                Some(AppEvent::Recompute(range))
            }
            Err(e) => {
                log::warn!("rejected date range {} .. {}: {}", start, end, e);
                self.error_modal.show(e.to_string());
                None
            }
        }
    }

    fn key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        self.debug.on_key(event);

        if self.error_modal.active {
            if matches!(event.code, KeyCode::Esc | KeyCode::Enter) {
                self.error_modal.hide();
            }
            return None;
        }

        if self.show_help {
            if matches!(
                event.code,
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
            ) {
                self.show_help = false;
            }
            return None;
        }

        if self.input_mode == InputMode::EditingRange {
            return match self.date_modal.handle_key(event) {
                DateRangeAction::None => None,
                DateRangeAction::Cancel => {
                    self.date_modal.close();
                    self.input_mode = InputMode::Normal;
                    None
                }
                DateRangeAction::Submit(start, end) => self.submit_range(&start, &end),
            };
        }

        if event.code == KeyCode::Char('c') && event.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(AppEvent::Exit);
        }

        match event.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(AppEvent::Exit),
            KeyCode::Tab | KeyCode::Right => {
                self.tab = self.tab.next();
                self.debug.last_action = "next_tab".to_string();
                None
            }
            KeyCode::BackTab | KeyCode::Left => {
                self.tab = self.tab.previous();
                self.debug.last_action = "previous_tab".to_string();
                None
            }
            KeyCode::Char('d') => {
                self.date_modal.open(self.range, self.dataset.full_range());
                self.input_mode = InputMode::EditingRange;
                self.debug.last_action = "edit_range".to_string();
                None
            }
            KeyCode::Char('r') => {
                self.debug.last_action = "reset_range".to_string();
                Some(AppEvent::Recompute(self.dataset.full_range()))
            }
            KeyCode::Char('e') => {
                self.debug.last_action = "export".to_string();
                Some(AppEvent::Export)
            }
            KeyCode::Char('?') => {
                self.show_help = true;
                None
            }
            _ => None,
        }
    }

    pub fn event(&mut self, event: &AppEvent) -> Option<AppEvent> {
        self.debug.num_events += 1;
        match event {
            AppEvent::Key(key) => self.key(key),
            AppEvent::Recompute(range) => {
                self.recompute(*range);
                None
            }
            AppEvent::Export => {
                self.export();
                None
            }
            _ => None,
        }
    }

    fn render_error_modal(&self, area: Rect, buf: &mut Buffer) {
        let popup_area = centered_rect(area, 60, 30);
        Clear.render(popup_area, buf);
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Error")
            .border_style(Style::default().fg(self.theme.get("modal_border_error")));
        let inner_area = block.inner(popup_area);
        block.render(popup_area, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(inner_area);

        Paragraph::new(self.error_modal.message.as_str())
            .style(Style::default().fg(self.theme.get("error")))
            .wrap(Wrap { trim: true })
            .render(chunks[0], buf);

        Paragraph::new("[ OK ]")
            .centered()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.get("modal_border_active"))),
            )
            .render(chunks[1], buf);
    }

    fn render_help(&self, area: Rect, buf: &mut Buffer) {
        let popup_area = centered_rect(area, 60, 60);
        Clear.render(popup_area, buf);
        Paragraph::new(HELP_TEXT)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Help ")
                    .border_style(Style::default().fg(self.theme.get("modal_border"))),
            )
            .render(popup_area, buf);
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.debug.num_frames += 1;

        let mut constraints = vec![Constraint::Fill(1)];
        if self.status.is_some() {
            constraints.push(Constraint::Length(1));
        }
        constraints.push(Constraint::Length(1)); // Controls
        if self.debug.enabled {
            constraints.push(Constraint::Length(1));
        }
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        match &self.dashboard {
            Some(dashboard) => {
                DashboardView::new(dashboard, self.tab, &self.money, &self.theme)
                    .with_logo(self.logo.as_deref())
                    .render(layout[0], buf);
            }
            None => {
                Paragraph::new(format!("Computing {} ...", self.range))
                    .centered()
                    .style(Style::default().fg(self.theme.get("dimmed")))
                    .render(layout[0], buf);
            }
        }

        let mut next = 1;
        if let Some(status) = &self.status {
            Paragraph::new(status.as_str())
                .style(
                    Style::default()
                        .fg(self.theme.get("secondary"))
                        .add_modifier(Modifier::ITALIC),
                )
                .render(layout[next], buf);
            next += 1;
        }

        let rows = self.dashboard.as_ref().map(|d| d.rows_in_range);
        let controls = Controls {
            rows_in_range: rows,
            ..Controls::default()
        }
        .with_dimmed(self.input_mode != InputMode::Normal || self.error_modal.active)
        .with_colors(self.theme.get("controls_bg"), self.theme.get("text_primary"));
        controls.render(layout[next], buf);
        next += 1;

        if self.debug.enabled {
            self.debug.render(layout[next], buf);
        }

        if self.date_modal.active {
            self.date_modal.render(area, buf);
        }
        if self.show_help {
            self.render_help(area, buf);
        }
        if self.error_modal.active {
            self.render_error_modal(area, buf);
        }
    }
}

fn centered_rect(r: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
