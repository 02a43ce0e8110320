//! Tabbed dashboard view over one [`Dashboard`] value.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::Line,
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset as ChartDataset, GraphType,
        Paragraph, Row, Table, Tabs, Widget,
    },
};

use crate::aggregate::{KeyedRow, MetricValue};
use crate::config::Theme;
use crate::currency::CurrencyFormatter;
use crate::summary::{format_metric, Dashboard};

const EMPTY_MESSAGE: &str = "No orders in range";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashboardTab {
    #[default]
    Overview,
    Cities,
    Customers,
    Products,
    CategoryRevenue,
    Ratings,
    Delivery,
    Payments,
    Rfm,
}

impl DashboardTab {
    pub const ALL: [Self; 9] = [
        Self::Overview,
        Self::Cities,
        Self::Customers,
        Self::Products,
        Self::CategoryRevenue,
        Self::Ratings,
        Self::Delivery,
        Self::Payments,
        Self::Rfm,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Cities => "Cities",
            Self::Customers => "Customers",
            Self::Products => "Products",
            Self::CategoryRevenue => "Category Revenue",
            Self::Ratings => "Ratings",
            Self::Delivery => "Delivery",
            Self::Payments => "Payments",
            Self::Rfm => "RFM",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// How bar values are labelled.
#[derive(Clone, Copy)]
enum ValueFormat {
    Money,
    Count,
    Score,
}

struct Palette {
    primary: Color,
    secondary: Color,
    border: Color,
    header: Color,
    dimmed: Color,
    tab_active: Color,
}

impl Palette {
    fn from_theme(theme: &Theme) -> Self {
        Self {
            primary: theme.get("chart_primary"),
            secondary: theme.get("chart_secondary"),
            border: theme.get("table_border"),
            header: theme.get("table_header"),
            dimmed: theme.get("dimmed"),
            tab_active: theme.get("tab_active"),
        }
    }
}

pub struct DashboardView<'a> {
    dashboard: &'a Dashboard,
    tab: DashboardTab,
    money: &'a CurrencyFormatter,
    palette: Palette,
    logo: Option<&'a str>,
}

impl<'a> DashboardView<'a> {
    pub fn new(
        dashboard: &'a Dashboard,
        tab: DashboardTab,
        money: &'a CurrencyFormatter,
        theme: &Theme,
    ) -> Self {
        Self {
            dashboard,
            tab,
            money,
            palette: Palette::from_theme(theme),
            logo: None,
        }
    }

    /// Name of the logo asset shown in the header.
    pub fn with_logo(mut self, logo: Option<&'a str>) -> Self {
        self.logo = logo;
        self
    }

    fn block(&self, title: impl Into<String>) -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", title.into()))
            .border_style(Style::default().fg(self.palette.border))
    }

    fn format_value(&self, value: f64, format: ValueFormat) -> String {
        match format {
            ValueFormat::Money => self.money.format(value),
            ValueFormat::Count => format!("{}", value as u64),
            ValueFormat::Score => format_metric(value, 2),
        }
    }

    fn render_empty(&self, title: &str, area: Rect, buf: &mut Buffer) {
        let block = self.block(title);
        let inner = block.inner(area);
        block.render(area, buf);
        Paragraph::new(EMPTY_MESSAGE)
            .style(Style::default().fg(self.palette.dimmed))
            .centered()
            .render(inner, buf);
    }

    /// Horizontal bars; the first bar gets the highlight colour unless `uniform`.
    fn render_bars(
        &self,
        title: &str,
        rows: &[(String, f64)],
        format: ValueFormat,
        uniform: bool,
        area: Rect,
        buf: &mut Buffer,
    ) {
        if rows.is_empty() {
            self.render_empty(title, area, buf);
            return;
        }
        // Bars take integer lengths; scale so small values stay visible.
        let max = rows
            .iter()
            .map(|(_, v)| if v.is_finite() { *v } else { 0.0 })
            .fold(0.0, f64::max);
        let scale = if max > 0.0 { 1000.0 / max } else { 0.0 };
        let bars: Vec<Bar> = rows
            .iter()
            .enumerate()
            .map(|(idx, (label, value))| {
                let color = if uniform || idx == 0 {
                    self.palette.primary
                } else {
                    self.palette.secondary
                };
                let length = if value.is_finite() && *value > 0.0 {
                    (value * scale).round() as u64
                } else {
                    0
                };
                Bar::default()
                    .value(length)
                    .label(Line::from(label.clone()))
                    .text_value(self.format_value(*value, format))
                    .style(Style::default().fg(color))
                    .value_style(Style::default().fg(Color::Black).bg(color))
            })
            .collect();

        BarChart::default()
            .block(self.block(title))
            .direction(Direction::Horizontal)
            .bar_width(1)
            .bar_gap(1)
            .max(1000)
            .data(BarGroup::default().bars(&bars))
            .render(area, buf);
    }

    fn render_top_bottom<V: MetricValue>(
        &self,
        label: &str,
        top: &[KeyedRow<V>],
        bottom: &[KeyedRow<V>],
        format: ValueFormat,
        area: Rect,
        buf: &mut Buffer,
    ) {
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        let pairs = |rows: &[KeyedRow<V>]| -> Vec<(String, f64)> {
            rows.iter().map(|r| (r.key.clone(), r.value.as_f64())).collect()
        };
        let n = self.dashboard.top_n;
        self.render_bars(
            &format!("Top {} {}", n, label),
            &pairs(top),
            format,
            false,
            halves[0],
            buf,
        );
        self.render_bars(
            &format!("Bottom {} {}", n, label),
            &pairs(bottom),
            format,
            false,
            halves[1],
            buf,
        );
    }

    fn render_header(&self, area: Rect, buf: &mut Buffer) {
        let d = self.dashboard;
        let mut text = format!(
            "storedash  ·  {}  ·  {} rows  ·  {}",
            d.range,
            d.rows_in_range,
            self.money.code()
        );
        if let Some(logo) = self.logo {
            text.push_str(&format!("  ·  {}", logo));
        }
        Paragraph::new(text)
            .style(
                Style::default()
                    .fg(self.palette.primary)
                    .add_modifier(Modifier::BOLD),
            )
            .render(area, buf);
    }

    fn render_overview(&self, area: Rect, buf: &mut Buffer) {
        let d = self.dashboard;
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Fill(1)])
            .split(area);

        let metrics = [
            ("Total orders", d.summary.total_orders.to_string()),
            ("Total revenue", self.money.format(d.summary.total_revenue)),
            ("Avg recency (days)", format_metric(d.summary.avg_recency, 1)),
            ("Avg frequency", format_metric(d.summary.avg_frequency, 2)),
            ("Avg monetary", self.money.format(d.summary.avg_monetary)),
        ];
        let cards = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(metrics.iter().map(|_| Constraint::Ratio(1, metrics.len() as u32)))
            .split(parts[0]);
        for ((label, value), card) in metrics.iter().zip(cards.iter()) {
            Paragraph::new(value.as_str())
                .style(Style::default().add_modifier(Modifier::BOLD))
                .centered()
                .block(self.block(*label))
                .render(*card, buf);
        }

        if d.daily_orders.rows.is_empty() {
            self.render_empty("Daily orders", parts[1], buf);
            return;
        }

        let first = d.daily_orders.rows[0].day;
        let last = d.daily_orders.rows[d.daily_orders.rows.len() - 1].day;
        let points: Vec<(f64, f64)> = d
            .daily_orders
            .rows
            .iter()
            .map(|r| ((r.day - first).num_days() as f64, r.order_count as f64))
            .collect();
        let x_max = ((last - first).num_days() as f64).max(1.0);
        let y_max = points.iter().map(|p| p.1).fold(1.0, f64::max) * 1.1;

        let datasets = vec![ChartDataset::default()
            .name("orders")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(self.palette.primary))
            .data(&points)];
        Chart::new(datasets)
            .block(self.block("Daily orders"))
            .x_axis(
                Axis::default()
                    .style(Style::default().fg(self.palette.dimmed))
                    .bounds([0.0, x_max])
                    .labels(vec![first.to_string(), last.to_string()]),
            )
            .y_axis(
                Axis::default()
                    .style(Style::default().fg(self.palette.dimmed))
                    .bounds([0.0, y_max])
                    .labels(vec!["0".to_string(), format!("{:.0}", y_max)]),
            )
            .render(parts[1], buf);
    }

    fn render_table(
        &self,
        title: &str,
        header: &[&str],
        rows: Vec<Vec<String>>,
        area: Rect,
        buf: &mut Buffer,
    ) {
        if rows.is_empty() {
            self.render_empty(title, area, buf);
            return;
        }
        let widths: Vec<Constraint> = header
            .iter()
            .map(|_| Constraint::Ratio(1, header.len() as u32))
            .collect();
        let rows: Vec<Row> = rows.into_iter().map(Row::new).collect();
        Table::new(rows, widths)
            .header(
                Row::new(header.iter().map(|h| h.to_string()).collect::<Vec<_>>()).style(
                    Style::default()
                        .fg(self.palette.header)
                        .add_modifier(Modifier::BOLD),
                ),
            )
            .block(self.block(title))
            .render(area, buf);
    }

    fn render_delivery(&self, area: Rect, buf: &mut Buffer) {
        let d = self.dashboard;
        let total = d.delivery_status.total();
        let shares: Vec<(String, f64)> = d
            .delivery_status
            .rows
            .iter()
            .map(|r| {
                let pct = if total > 0.0 {
                    r.value as f64 / total * 100.0
                } else {
                    0.0
                };
                (format!("{} ({})", r.key, r.value), pct)
            })
            .collect();
        if shares.is_empty() {
            self.render_empty("Delivery status", area, buf);
            return;
        }
        let rows: Vec<Vec<String>> = shares
            .iter()
            .map(|(label, pct)| vec![label.clone(), format!("{:.1}%", pct)])
            .collect();
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(rows.len() as u16 + 3), Constraint::Fill(1)])
            .split(area);
        self.render_table("Delivery status", &["Status (orders)", "Share"], rows, parts[0], buf);
        self.render_bars(
            "Share of orders (%)",
            &shares,
            ValueFormat::Score,
            false,
            parts[1],
            buf,
        );
    }

    fn render_payments(&self, area: Rect, buf: &mut Buffer) {
        let p = &self.dashboard.payment_methods;
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        let usage: Vec<(String, f64)> = p
            .by_usage()
            .into_iter()
            .map(|r| (r.payment_type, r.total_usage as f64))
            .collect();
        let revenue: Vec<(String, f64)> = p
            .by_payment()
            .into_iter()
            .map(|r| (r.payment_type, r.total_payment))
            .collect();
        self.render_bars("By usage", &usage, ValueFormat::Count, false, halves[0], buf);
        self.render_bars("By revenue", &revenue, ValueFormat::Money, false, halves[1], buf);
    }

    fn render_rfm(&self, area: Rect, buf: &mut Buffer) {
        let rfm = &self.dashboard.rfm;
        let n = self.dashboard.top_n;
        let thirds = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
            ])
            .split(area);
        let recency: Vec<(String, f64)> = rfm
            .top_by_recency(n)
            .into_iter()
            .map(|r| (r.customer_id, r.recency as f64))
            .collect();
        let frequency: Vec<(String, f64)> = rfm
            .top_by_frequency(n)
            .into_iter()
            .map(|r| (r.customer_id, r.frequency as f64))
            .collect();
        let monetary: Vec<(String, f64)> = rfm
            .top_by_monetary(n)
            .into_iter()
            .map(|r| (r.customer_id, r.monetary))
            .collect();
        self.render_bars("By recency (days)", &recency, ValueFormat::Count, true, thirds[0], buf);
        self.render_bars("By frequency", &frequency, ValueFormat::Count, true, thirds[1], buf);
        self.render_bars("By monetary", &monetary, ValueFormat::Money, true, thirds[2], buf);
    }
}

impl Widget for DashboardView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Fill(1),
            ])
            .split(area);

        self.render_header(layout[0], buf);

        Tabs::new(DashboardTab::ALL.iter().map(|t| t.title()))
            .select(self.tab.index())
            .style(Style::default().fg(self.palette.dimmed))
            .highlight_style(
                Style::default()
                    .fg(self.palette.tab_active)
                    .add_modifier(Modifier::BOLD),
            )
            .divider("|")
            .render(layout[1], buf);

        let body = layout[2];
        let d = self.dashboard;
        let n = d.top_n;
        match self.tab {
            DashboardTab::Overview => self.render_overview(body, buf),
            DashboardTab::Cities => self.render_top_bottom(
                "cities by revenue",
                &d.revenue_by_city.top(n),
                &d.revenue_by_city.bottom(n),
                ValueFormat::Money,
                body,
                buf,
            ),
            DashboardTab::Customers => self.render_top_bottom(
                "customers by revenue",
                &d.revenue_by_customer.top(n),
                &d.revenue_by_customer.bottom(n),
                ValueFormat::Money,
                body,
                buf,
            ),
            DashboardTab::Products => self.render_top_bottom(
                "categories by products sold",
                &d.product_popularity.top(n),
                &d.product_popularity.bottom(n),
                ValueFormat::Count,
                body,
                buf,
            ),
            DashboardTab::CategoryRevenue => self.render_top_bottom(
                "categories by revenue",
                &d.revenue_by_category.top(n),
                &d.revenue_by_category.bottom(n),
                ValueFormat::Money,
                body,
                buf,
            ),
            DashboardTab::Ratings => self.render_top_bottom(
                "categories by rating",
                &d.rating_by_category.top(n),
                &d.rating_by_category.bottom(n),
                ValueFormat::Score,
                body,
                buf,
            ),
            DashboardTab::Delivery => self.render_delivery(body, buf),
            DashboardTab::Payments => self.render_payments(body, buf),
            DashboardTab::Rfm => self.render_rfm(body, buf),
        }
    }
}
