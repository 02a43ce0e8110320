//! PNG export of the dashboard charts (plotters bitmap backend).
//!
//! Export happens in two steps. [`plan_charts`] turns a [`Dashboard`] into
//! plain chart descriptions, and [`render_chart`] draws one description.

use chrono::NaiveDate;
use color_eyre::Result;
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::{Path, PathBuf};

use crate::aggregate::{KeyedRow, MetricValue};
use crate::config::{parse_hex, AppConfig};
use crate::summary::Dashboard;

const UNIX_EPOCH_CE_DAYS: i32 = 719_163;
const FONT: &str = "sans-serif";

/// Highlight colour for the leading bar, and the colour for the rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartColors {
    pub primary: RGBColor,
    pub secondary: RGBColor,
}

impl Default for ChartColors {
    fn default() -> Self {
        Self {
            primary: RGBColor(0xFC, 0x67, 0x36),
            secondary: RGBColor(0xFF, 0xDD, 0x95),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartExportOptions {
    pub width: u32,
    pub height: u32,
    pub top_n: usize,
    pub colors: ChartColors,
}

impl Default for ChartExportOptions {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 700,
            top_n: 5,
            colors: ChartColors::default(),
        }
    }
}

impl ChartExportOptions {
    /// Size, ranking depth and colours from the config. Chart colours
    /// that are not hex fall back to the defaults.
    pub fn from_config(config: &AppConfig) -> Self {
        let defaults = ChartColors::default();
        let rgb = |value: &str, fallback: RGBColor| match parse_hex(value.trim()) {
            Ok((r, g, b)) => RGBColor(r, g, b),
            Err(_) => {
                log::warn!("chart colour '{}' is not #rrggbb; using default", value);
                fallback
            }
        };
        Self {
            width: config.chart_export.width,
            height: config.chart_export.height,
            top_n: config.display.top_n,
            colors: ChartColors {
                primary: rgb(&config.theme.colors.chart_primary, defaults.primary),
                secondary: rgb(&config.theme.colors.chart_secondary, defaults.secondary),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

/// One horizontal bar chart inside a chart file.
#[derive(Debug, Clone, PartialEq)]
pub struct BarPanel {
    pub title: String,
    pub value_label: String,
    pub bars: Vec<Bar>,
    /// Colour every bar with the highlight colour, not only the first.
    pub uniform: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    pub fraction: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartKind {
    /// Days since the Unix epoch against a value.
    Line { y_label: String, points: Vec<(i32, f64)> },
    Bars(Vec<BarPanel>),
    Pie(Vec<PieSlice>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPlan {
    pub file_name: &'static str,
    pub title: String,
    pub kind: ChartKind,
}

impl ChartPlan {
    pub fn has_data(&self) -> bool {
        match &self.kind {
            ChartKind::Line { points, .. } => !points.is_empty(),
            ChartKind::Bars(panels) => panels.iter().any(|p| !p.bars.is_empty()),
            ChartKind::Pie(slices) => slices.iter().any(|s| s.value > 0.0),
        }
    }
}

fn bars<V: MetricValue>(rows: &[KeyedRow<V>]) -> Vec<Bar> {
    rows.iter()
        .map(|row| Bar {
            label: row.key.clone(),
            value: row.value.as_f64(),
        })
        .collect()
}

fn panel(title: &str, value_label: &str, bars: Vec<Bar>) -> BarPanel {
    BarPanel {
        title: title.to_string(),
        value_label: value_label.to_string(),
        bars,
        uniform: false,
    }
}

fn day_number(day: NaiveDate) -> i32 {
    use chrono::Datelike;
    day.num_days_from_ce() - UNIX_EPOCH_CE_DAYS
}

fn format_day_number(days: i32) -> String {
    NaiveDate::from_num_days_from_ce_opt(UNIX_EPOCH_CE_DAYS.saturating_add(days))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn format_axis_label(v: f64) -> String {
    if v.abs() >= 1e6 {
        format!("{:.2e}", v)
    } else if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

/// Describe every chart file for `dashboard`, in export order.
pub fn plan_charts(dashboard: &Dashboard, top_n: usize) -> Vec<ChartPlan> {
    let d = dashboard;
    let n = top_n;

    let daily_points = d
        .daily_orders
        .rows
        .iter()
        .map(|r| (day_number(r.day), r.order_count as f64))
        .collect();

    let delivery_total: f64 = d.delivery_status.rows.iter().map(|r| r.value as f64).sum();
    let slices = d
        .delivery_status
        .rows
        .iter()
        .map(|r| PieSlice {
            label: r.key.clone(),
            value: r.value as f64,
            fraction: if delivery_total > 0.0 {
                r.value as f64 / delivery_total
            } else {
                0.0
            },
        })
        .collect();

    let payment_usage = d
        .payment_methods
        .by_usage()
        .into_iter()
        .map(|r| Bar {
            label: r.payment_type,
            value: r.total_usage as f64,
        })
        .collect();
    let payment_revenue = d
        .payment_methods
        .by_payment()
        .into_iter()
        .map(|r| Bar {
            label: r.payment_type,
            value: r.total_payment,
        })
        .collect();

    let rfm_panel = |title: &str, label: &str, rows: Vec<(String, f64)>| BarPanel {
        title: title.to_string(),
        value_label: label.to_string(),
        bars: rows
            .into_iter()
            .map(|(label, value)| Bar { label, value })
            .collect(),
        uniform: true,
    };

    vec![
        ChartPlan {
            file_name: "daily_orders.png",
            title: "Daily Orders".to_string(),
            kind: ChartKind::Line {
                y_label: "Orders".to_string(),
                points: daily_points,
            },
        },
        ChartPlan {
            file_name: "cities.png",
            title: format!("Top and Bottom {} Cities by Revenue", n),
            kind: ChartKind::Bars(vec![
                panel("Highest Revenue", "Revenue", bars(&d.revenue_by_city.top(n))),
                panel("Lowest Revenue", "Revenue", bars(&d.revenue_by_city.bottom(n))),
            ]),
        },
        ChartPlan {
            file_name: "customers.png",
            title: format!("Top and Bottom {} Customers by Revenue", n),
            kind: ChartKind::Bars(vec![
                panel("Largest Spend", "Revenue", bars(&d.revenue_by_customer.top(n))),
                panel("Smallest Spend", "Revenue", bars(&d.revenue_by_customer.bottom(n))),
            ]),
        },
        ChartPlan {
            file_name: "products.png",
            title: format!("Top and Bottom {} Categories by Products Sold", n),
            kind: ChartKind::Bars(vec![
                panel("Most Products", "Distinct products", bars(&d.product_popularity.top(n))),
                panel("Fewest Products", "Distinct products", bars(&d.product_popularity.bottom(n))),
            ]),
        },
        ChartPlan {
            file_name: "category_revenue.png",
            title: format!("Top and Bottom {} Categories by Revenue", n),
            kind: ChartKind::Bars(vec![
                panel("Highest Revenue", "Revenue", bars(&d.revenue_by_category.top(n))),
                panel("Lowest Revenue", "Revenue", bars(&d.revenue_by_category.bottom(n))),
            ]),
        },
        ChartPlan {
            file_name: "ratings.png",
            title: format!("Top and Bottom {} Categories by Rating", n),
            kind: ChartKind::Bars(vec![
                panel("Highest Rated", "Mean review score", bars(&d.rating_by_category.top(n))),
                panel("Lowest Rated", "Mean review score", bars(&d.rating_by_category.bottom(n))),
            ]),
        },
        ChartPlan {
            file_name: "delivery_status.png",
            title: "Orders Delivered Against Estimate".to_string(),
            kind: ChartKind::Pie(slices),
        },
        ChartPlan {
            file_name: "payment_methods.png",
            title: "Payment Methods".to_string(),
            kind: ChartKind::Bars(vec![
                panel("By Usage", "Payments", payment_usage),
                panel("By Revenue", "Revenue", payment_revenue),
            ]),
        },
        ChartPlan {
            file_name: "rfm.png",
            title: "Best Customers by RFM".to_string(),
            kind: ChartKind::Bars(vec![
                rfm_panel(
                    "By Recency (days)",
                    "Days",
                    d.rfm
                        .top_by_recency(n)
                        .into_iter()
                        .map(|r| (r.customer_id, r.recency as f64))
                        .collect(),
                ),
                rfm_panel(
                    "By Frequency",
                    "Orders",
                    d.rfm
                        .top_by_frequency(n)
                        .into_iter()
                        .map(|r| (r.customer_id, r.frequency as f64))
                        .collect(),
                ),
                rfm_panel(
                    "By Monetary",
                    "Revenue",
                    d.rfm
                        .top_by_monetary(n)
                        .into_iter()
                        .map(|r| (r.customer_id, r.monetary))
                        .collect(),
                ),
            ]),
        },
    ]
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Draw one chart to `path`. A chart without data gets a "No data" placeholder.
pub fn render_chart(plan: &ChartPlan, path: &Path, options: &ChartExportOptions) -> Result<()> {
    let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
    draw_chart(&root, plan, options)
}

fn draw_chart(root: &Area<'_>, plan: &ChartPlan, options: &ChartExportOptions) -> Result<()> {
    root.fill(&WHITE)?;
    let body = root.titled(&plan.title, (FONT, 26))?;

    if !plan.has_data() {
        draw_placeholder(&body, "No data")?;
    } else {
        match &plan.kind {
            ChartKind::Line { y_label, points } => {
                draw_line(&body, y_label, points, options.colors.primary)?
            }
            ChartKind::Bars(panels) => {
                let areas = body.split_evenly((1, panels.len().max(1)));
                for (area, panel) in areas.iter().zip(panels) {
                    draw_bar_panel(area, panel, &options.colors)?;
                }
            }
            ChartKind::Pie(slices) => draw_pie(&body, slices, &options.colors)?,
        }
    }

    root.present()?;
    Ok(())
}

fn draw_placeholder(area: &Area<'_>, message: &str) -> Result<()> {
    let (w, h) = area.dim_in_pixel();
    let grey = BLACK.mix(0.6);
    let style = TextStyle::from((FONT, 24).into_font())
        .color(&grey)
        .pos(Pos::new(HPos::Center, VPos::Center));
    area.draw(&Text::new(
        message.to_string(),
        ((w / 2) as i32, (h / 2) as i32),
        style,
    ))?;
    Ok(())
}

fn draw_line(area: &Area<'_>, y_label: &str, points: &[(i32, f64)], color: RGBColor) -> Result<()> {
    let x_min = points.iter().map(|p| p.0).min().unwrap_or(0);
    let x_max = points.iter().map(|p| p.0).max().unwrap_or(0);
    let (x_min, x_max) = if x_min == x_max {
        (x_min - 1, x_max + 1)
    } else {
        (x_min, x_max)
    };
    let y_max = points.iter().map(|p| p.1).fold(0.0, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

    let mut chart = ChartBuilder::on(area)
        .margin(30)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_labels(8)
        .x_desc("Day")
        .y_desc(y_label)
        .x_label_formatter(&|v: &i32| format_day_number(*v))
        .y_label_formatter(&|v: &f64| format_axis_label(*v))
        .draw()?;

    chart.draw_series(LineSeries::new(
        points.iter().copied(),
        ShapeStyle::from(&color).stroke_width(2),
    ))?;
    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
    )?;
    Ok(())
}

fn draw_bar_panel(area: &Area<'_>, panel: &BarPanel, colors: &ChartColors) -> Result<()> {
    if panel.bars.is_empty() {
        let inner = area.titled(&panel.title, (FONT, 18))?;
        return draw_placeholder(&inner, "No data");
    }

    let n = panel.bars.len() as i32;
    let value = |bar: &Bar| if bar.value.is_finite() { bar.value.max(0.0) } else { 0.0 };
    let x_max = panel.bars.iter().map(value).fold(0.0, f64::max);
    let x_max = if x_max > 0.0 { x_max * 1.1 } else { 1.0 };
    let label_width = panel
        .bars
        .iter()
        .map(|b| b.label.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(6, 34) as u32
        * 8;

    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .caption(&panel.title, (FONT, 18))
        .x_label_area_size(40)
        .y_label_area_size(label_width)
        .build_cartesian_2d(0.0..x_max, (0..n).into_segmented())?;

    // First bar sits at the top.
    let labels: Vec<&str> = panel.bars.iter().map(|b| b.label.as_str()).collect();
    let label_at = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(i) => usize::try_from(n - 1 - *i)
            .ok()
            .and_then(|idx| labels.get(idx))
            .map(|s| s.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    };
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(panel.bars.len())
        .x_desc(panel.value_label.as_str())
        .x_label_formatter(&|v: &f64| format_axis_label(*v))
        .y_label_formatter(&label_at)
        .draw()?;

    chart.draw_series(panel.bars.iter().enumerate().map(|(idx, bar)| {
        let y = n - 1 - idx as i32;
        let color = if panel.uniform || idx == 0 {
            colors.primary
        } else {
            colors.secondary
        };
        let mut rect = Rectangle::new(
            [
                (0.0, SegmentValue::Exact(y)),
                (value(bar), SegmentValue::Exact(y + 1)),
            ],
            color.filled(),
        );
        rect.set_margin(4, 4, 0, 0);
        rect
    }))?;
    Ok(())
}

fn draw_pie(area: &Area<'_>, slices: &[PieSlice], colors: &ChartColors) -> Result<()> {
    let (w, h) = area.dim_in_pixel();
    // Pie draws in backend pixels, so offset by where the body area starts.
    let (x0, y0) = area.get_base_pixel();
    let center = (x0 + (w / 2) as i32, y0 + (h / 2) as i32);
    let radius = f64::from(w.min(h)) * 0.35;
    let palette = [colors.primary, colors.secondary, RGBColor(0xC8, 0xC8, 0xC8)];

    let drawn: Vec<(usize, &PieSlice)> = slices
        .iter()
        .enumerate()
        .filter(|(_, slice)| slice.fraction > 0.0)
        .collect();
    let sizes: Vec<f64> = drawn.iter().map(|(_, slice)| slice.fraction).collect();
    let slice_colors: Vec<RGBColor> = drawn
        .iter()
        .map(|(idx, _)| palette[idx % palette.len()])
        .collect();
    let labels: Vec<String> = drawn
        .iter()
        .map(|(_, slice)| format!("{} {:.1}%", slice.label, slice.fraction * 100.0))
        .collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &slice_colors, &labels);
    pie.start_angle(-90.0);
    pie.label_style((FONT, 18).into_font().color(&BLACK));
    pie.label_offset(radius * 0.15);
    area.draw(&pie)?;
    Ok(())
}

/// Write every chart for `dashboard` into `dir`, creating it if needed.
/// Returns the written paths in export order.
pub fn export_dashboard(
    dashboard: &Dashboard,
    dir: &Path,
    options: &ChartExportOptions,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for plan in plan_charts(dashboard, options.top_n) {
        let path = dir.join(plan.file_name);
        render_chart(&plan, &path, options)?;
        log::debug!("wrote {}", path.display());
        written.push(path);
    }
    log::info!(
        "exported {} charts for {} to {}",
        written.len(),
        dashboard.range,
        dir.display()
    );
    Ok(written)
}
