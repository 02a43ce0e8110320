//! Non-interactive rendering of one dashboard cycle (`--report`).

use color_eyre::Result;
use std::io::Write;

use crate::aggregate::{KeyedRow, KeyedTable, MetricValue, RfmRow};
use crate::currency::CurrencyFormatter;
use crate::summary::{format_metric, Dashboard};

/// How a table's value column is printed.
#[derive(Debug, Clone, Copy)]
enum Cell {
    Money,
    Count,
    Score,
}

fn cell<V: MetricValue>(value: V, kind: Cell, money: &CurrencyFormatter) -> String {
    match kind {
        Cell::Money => money.format(value.as_f64()),
        Cell::Count => format!("{}", value.as_f64() as u64),
        Cell::Score => format_metric(value.as_f64(), 2),
    }
}

fn section(out: &mut impl Write, title: &str) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", "-".repeat(title.chars().count()))?;
    Ok(())
}

/// Left-aligned text columns, right-aligned last column.
fn table(out: &mut impl Write, header: &[&str], rows: &[Vec<String>]) -> Result<()> {
    if rows.is_empty() {
        writeln!(out, "  No orders in range")?;
        return Ok(());
    }
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, value) in row.iter().enumerate() {
            widths[i] = widths[i].max(value.chars().count());
        }
    }
    let last = widths.len() - 1;
    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if i == last {
                    format!("{:>w$}", c, w = widths[i])
                } else {
                    format!("{:<w$}", c, w = widths[i])
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
    };
    writeln!(out, "  {}", line(header.to_vec()))?;
    for row in rows {
        writeln!(out, "  {}", line(row.iter().map(String::as_str).collect()))?;
    }
    Ok(())
}

fn keyed_rows<V: MetricValue>(
    rows: &[KeyedRow<V>],
    kind: Cell,
    money: &CurrencyFormatter,
) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| vec![r.key.clone(), cell(r.value, kind, money)])
        .collect()
}

fn top_bottom<V: MetricValue>(
    out: &mut impl Write,
    title: &str,
    table_data: &KeyedTable<V>,
    n: usize,
    kind: Cell,
    money: &CurrencyFormatter,
) -> Result<()> {
    let header = [table_data.key_name, table_data.value_name];
    section(out, &format!("{} (top {})", title, n))?;
    table(out, &header, &keyed_rows(&table_data.top(n), kind, money))?;
    section(out, &format!("{} (bottom {})", title, n))?;
    table(out, &header, &keyed_rows(&table_data.bottom(n), kind, money))
}

fn rfm_table(
    out: &mut impl Write,
    title: &str,
    rows: Vec<RfmRow>,
    money: &CurrencyFormatter,
) -> Result<()> {
    section(out, title)?;
    let rows: Vec<Vec<String>> = rows
        .into_iter()
        .map(|r| {
            vec![
                r.customer_id,
                r.recency.to_string(),
                r.frequency.to_string(),
                money.format(r.monetary),
            ]
        })
        .collect();
    table(out, &["Customer", "Recency", "Frequency", "Monetary"], &rows)
}

/// Plain-text tables, one section per aggregate.
pub fn write_text_report(
    out: &mut impl Write,
    dashboard: &Dashboard,
    money: &CurrencyFormatter,
) -> Result<()> {
    let d = dashboard;
    let n = d.top_n;

    writeln!(out, "storedash report: {}", d.range)?;
    writeln!(out, "Rows in range: {}", d.rows_in_range)?;

    section(out, "Summary")?;
    table(
        out,
        &["Metric", "Value"],
        &[
            vec!["Total orders".into(), d.summary.total_orders.to_string()],
            vec!["Total revenue".into(), money.format(d.summary.total_revenue)],
            vec![
                "Average recency (days)".into(),
                format_metric(d.summary.avg_recency, 1),
            ],
            vec![
                "Average frequency".into(),
                format_metric(d.summary.avg_frequency, 2),
            ],
            vec!["Average monetary".into(), money.format(d.summary.avg_monetary)],
        ],
    )?;

    section(out, "Daily orders")?;
    let daily: Vec<Vec<String>> = d
        .daily_orders
        .rows
        .iter()
        .map(|r| {
            vec![
                r.day.to_string(),
                r.order_count.to_string(),
                money.format(r.revenue),
            ]
        })
        .collect();
    table(out, &["Day", "Orders", "Revenue"], &daily)?;

    top_bottom(out, "Revenue by city", &d.revenue_by_city, n, Cell::Money, money)?;
    top_bottom(
        out,
        "Revenue by customer",
        &d.revenue_by_customer,
        n,
        Cell::Money,
        money,
    )?;
    top_bottom(
        out,
        "Product popularity",
        &d.product_popularity,
        n,
        Cell::Count,
        money,
    )?;
    top_bottom(
        out,
        "Revenue by category",
        &d.revenue_by_category,
        n,
        Cell::Money,
        money,
    )?;
    top_bottom(
        out,
        "Rating by category",
        &d.rating_by_category,
        n,
        Cell::Score,
        money,
    )?;

    section(out, "Delivery status")?;
    let total = d.delivery_status.total();
    let delivery: Vec<Vec<String>> = d
        .delivery_status
        .rows
        .iter()
        .map(|r| {
            let share = if total > 0.0 {
                format!("{:.1}%", r.value as f64 / total * 100.0)
            } else {
                "N/A".to_string()
            };
            vec![r.key.clone(), r.value.to_string(), share]
        })
        .collect();
    table(out, &["Status", "Orders", "Share"], &delivery)?;

    section(out, "Payment methods")?;
    let payments: Vec<Vec<String>> = d
        .payment_methods
        .by_usage()
        .into_iter()
        .map(|r| {
            vec![
                r.payment_type,
                r.total_usage.to_string(),
                money.format(r.total_payment),
            ]
        })
        .collect();
    table(out, &["Payment type", "Usage", "Revenue"], &payments)?;

    rfm_table(out, &format!("RFM by recency (top {})", n), d.rfm.top_by_recency(n), money)?;
    rfm_table(out, &format!("RFM by frequency (top {})", n), d.rfm.top_by_frequency(n), money)?;
    rfm_table(out, &format!("RFM by monetary (top {})", n), d.rfm.top_by_monetary(n), money)?;

    Ok(())
}

/// The whole dashboard as pretty JSON. Undefined means become `null`.
pub fn write_json_report(out: &mut impl Write, dashboard: &Dashboard) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, dashboard)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DateRange, Dataset};
    use crate::summary::DashboardOptions;
    use chrono::NaiveDate;
    use polars::prelude::*;

    fn dataset() -> Dataset {
        let df = df!(
            "order_id" => ["o1", "o2", "o2"],
            "customer_id" => ["c1", "c2", "c2"],
            "product_id" => ["p1", "p2", "p3"],
            "order_purchase_timestamp" => ["2018-03-01 08:00:00", "2018-03-03 12:00:00", "2018-03-03 12:00:00"],
            "order_approved_at" => ["", "", ""],
            "order_delivered_carrier_date" => ["", "", ""],
            "order_delivered_customer_date" => ["2018-03-04", "", ""],
            "order_estimated_delivery_date" => ["2018-03-10", "2018-03-10", "2018-03-10"],
            "payment_type" => ["voucher", "credit_card", "credit_card"],
            "payment_value" => ["1500.5", "20", "30"],
            "review_score" => ["4", "", "2"],
            "customer_city" => ["curitiba", "recife", "recife"],
            "product_category_name" => ["garden", "toys", "toys"]
        )
        .unwrap();
        Dataset::from_frame(df).unwrap()
    }

    fn render(range: DateRange) -> String {
        let ds = dataset();
        let view = ds.filter(&range).unwrap();
        let dashboard = Dashboard::compute(&view, &DashboardOptions::default()).unwrap();
        let money = CurrencyFormatter::new("USD", "en_US").unwrap();
        let mut buf = Vec::new();
        write_text_report(&mut buf, &dashboard, &money).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_text_report_sections() {
        let ds = dataset();
        let text = render(ds.full_range());
        assert!(text.starts_with("storedash report: 2018-03-01 .. 2018-03-03"));
        assert!(text.contains("Total orders"));
        assert!(text.contains("$1,550.50"));
        assert!(text.contains("Revenue by city (top 5)"));
        assert!(text.contains("RFM by monetary (top 5)"));
        assert!(!text.contains("No orders in range"));
    }

    #[test]
    fn test_text_report_empty_range() {
        let day = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let text = render(DateRange::new(day, day).unwrap());
        assert!(text.contains("No orders in range"));
        assert!(text.contains("N/A"));
        assert!(text.contains("$0.00"));
    }

    #[test]
    fn test_json_report_is_valid_json() {
        let ds = dataset();
        let view = ds.filter(&ds.full_range()).unwrap();
        let dashboard = Dashboard::compute(&view, &DashboardOptions::default()).unwrap();
        let mut buf = Vec::new();
        write_json_report(&mut buf, &dashboard).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["summary"]["total_orders"], 2);
        assert_eq!(value["range"]["start"], "2018-03-01");
        assert_eq!(value["daily_orders"]["rows"][1]["order_count"], 1);
    }
}
