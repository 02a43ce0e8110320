//! Aggregations over a [`FilteredView`].
//!
//! Every function here is pure: it reads the view, groups by one dimension
//! and returns a small typed table. An empty view yields an empty table.
//! Order volume is always a distinct `order_id` count; money is a raw sum of
//! `payment_value` and ratings a raw mean of `review_score`.
//!
//! Sorted tables break ties on the group key (ascending) so top/bottom views
//! are reproducible across runs.

use chrono::NaiveDate;
use color_eyre::Result;
use polars::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;

use crate::dataset::columns::*;
use crate::dataset::FilteredView;

const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

/// One calendar day of activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyOrdersRow {
    pub day: NaiveDate,
    pub order_count: u64,
    pub revenue: f64,
}

/// Distinct orders and revenue per purchase day, ascending by day.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyOrders {
    pub rows: Vec<DailyOrdersRow>,
}

impl DailyOrders {
    pub fn total_orders(&self) -> u64 {
        self.rows.iter().map(|r| r.order_count).sum()
    }

    pub fn total_revenue(&self) -> f64 {
        self.rows.iter().map(|r| r.revenue).sum()
    }

    /// Insert zero rows for days without orders between the first and last day.
    pub fn densify(&self) -> DailyOrders {
        let (Some(first), Some(last)) = (self.rows.first(), self.rows.last()) else {
            return self.clone();
        };
        let mut rows = Vec::new();
        let mut existing = self.rows.iter().peekable();
        let mut day = first.day;
        while day <= last.day {
            match existing.peek() {
                Some(row) if row.day == day => {
                    rows.push((*row).clone());
                    existing.next();
                }
                _ => rows.push(DailyOrdersRow {
                    day,
                    order_count: 0,
                    revenue: 0.0,
                }),
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        DailyOrders { rows }
    }
}

/// A key and its metric value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyedRow<V> {
    pub key: String,
    pub value: V,
}

/// Single-metric table keyed by one dimension, sorted descending by value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyedTable<V> {
    pub key_name: &'static str,
    pub value_name: &'static str,
    pub rows: Vec<KeyedRow<V>>,
}

/// Numeric metric values that can be ordered for top/bottom views.
pub trait MetricValue: Copy {
    fn compare(&self, other: &Self) -> Ordering;
    fn as_f64(&self) -> f64;
}

impl MetricValue for f64 {
    /// NaN (mean of no reviews) sorts below every real value.
    fn compare(&self, other: &Self) -> Ordering {
        match (self.is_nan(), other.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.partial_cmp(other).unwrap_or(Ordering::Equal),
        }
    }

    fn as_f64(&self) -> f64 {
        *self
    }
}

impl MetricValue for u64 {
    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn as_f64(&self) -> f64 {
        *self as f64
    }
}

impl<V: MetricValue> KeyedTable<V> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The `n` largest rows (table order).
    pub fn top(&self, n: usize) -> Vec<KeyedRow<V>> {
        self.rows.iter().take(n).cloned().collect()
    }

    /// The `n` smallest rows, ascending by value then key.
    pub fn bottom(&self, n: usize) -> Vec<KeyedRow<V>> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| a.value.compare(&b.value).then_with(|| a.key.cmp(&b.key)));
        rows.truncate(n);
        rows
    }

    pub fn total(&self) -> f64 {
        self.rows.iter().map(|r| r.value.as_f64()).sum()
    }

    fn sort_descending(&mut self) {
        self.rows
            .sort_by(|a, b| b.value.compare(&a.value).then_with(|| a.key.cmp(&b.key)));
    }
}

/// Usage and revenue for one payment type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentMethodRow {
    pub payment_type: String,
    pub total_usage: u64,
    pub total_payment: f64,
}

/// Payment types, sorted descending by usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PaymentMethods {
    pub rows: Vec<PaymentMethodRow>,
}

impl PaymentMethods {
    pub fn by_usage(&self) -> Vec<PaymentMethodRow> {
        self.rows.clone()
    }

    /// Re-sorted descending by total payment.
    pub fn by_payment(&self) -> Vec<PaymentMethodRow> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            b.total_payment
                .compare(&a.total_payment)
                .then_with(|| a.payment_type.cmp(&b.payment_type))
        });
        rows
    }
}

/// Recency / frequency / monetary figures for one customer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmRow {
    pub customer_id: String,
    /// Days between the customer's last purchase and the latest purchase in the view.
    pub recency: i64,
    pub frequency: u64,
    pub monetary: f64,
}

/// RFM per customer, ordered by customer id. Consumers sort per metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Rfm {
    pub rows: Vec<RfmRow>,
}

impl Rfm {
    pub fn top_by_recency(&self, n: usize) -> Vec<RfmRow> {
        self.top_by(n, |a, b| b.recency.cmp(&a.recency))
    }

    pub fn top_by_frequency(&self, n: usize) -> Vec<RfmRow> {
        self.top_by(n, |a, b| b.frequency.cmp(&a.frequency))
    }

    pub fn top_by_monetary(&self, n: usize) -> Vec<RfmRow> {
        self.top_by(n, |a, b| b.monetary.compare(&a.monetary))
    }

    fn top_by(&self, n: usize, cmp: impl Fn(&RfmRow, &RfmRow) -> Ordering) -> Vec<RfmRow> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| cmp(a, b).then_with(|| a.customer_id.cmp(&b.customer_id)));
        rows.truncate(n);
        rows
    }

    pub fn mean_recency(&self) -> f64 {
        mean(self.rows.iter().map(|r| r.recency as f64))
    }

    pub fn mean_frequency(&self) -> f64 {
        mean(self.rows.iter().map(|r| r.frequency as f64))
    }

    pub fn mean_monetary(&self) -> f64 {
        mean(self.rows.iter().map(|r| r.monetary))
    }
}

/// Mean of the values; NaN for no values.
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

pub fn daily_orders(view: &FilteredView) -> Result<DailyOrders> {
    let df = view
        .lazy()
        .group_by([col(PURCHASE_TS).dt().date().alias("day")])
        .agg([
            col(ORDER_ID).drop_nulls().n_unique().alias("order_count"),
            col(PAYMENT_VALUE).sum().alias("revenue"),
        ])
        .sort_by_exprs([col("day")], SortMultipleOptions::default())
        .collect()?;

    let days = day_values(&df, "day")?;
    let counts = u64_values(&df, "order_count")?;
    let revenue = f64_values(&df, "revenue", 0.0)?;
    let rows = days
        .into_iter()
        .zip(counts)
        .zip(revenue)
        .filter_map(|((day, order_count), revenue)| {
            day.map(|day| DailyOrdersRow {
                day,
                order_count,
                revenue,
            })
        })
        .collect();
    Ok(DailyOrders { rows })
}

pub fn revenue_by_city(view: &FilteredView) -> Result<KeyedTable<f64>> {
    keyed_f64(view, CUSTOMER_CITY, col(PAYMENT_VALUE).sum(), "payment_value", 0.0)
}

pub fn revenue_by_customer(view: &FilteredView) -> Result<KeyedTable<f64>> {
    keyed_f64(view, CUSTOMER_ID, col(PAYMENT_VALUE).sum(), "payment_value", 0.0)
}

pub fn delivery_status(view: &FilteredView) -> Result<KeyedTable<u64>> {
    keyed_u64(view, STATUS_DELIVERY, col(ORDER_ID).drop_nulls().n_unique(), "count")
}

pub fn product_popularity(view: &FilteredView) -> Result<KeyedTable<u64>> {
    keyed_u64(view, PRODUCT_CATEGORY, col(PRODUCT_ID).drop_nulls().n_unique(), "count")
}

pub fn revenue_by_category(view: &FilteredView) -> Result<KeyedTable<f64>> {
    keyed_f64(
        view,
        PRODUCT_CATEGORY,
        col(PAYMENT_VALUE).sum(),
        "payment_value",
        0.0,
    )
}

/// Mean review score per category. A category with no scores has a NaN mean.
pub fn rating_by_category(view: &FilteredView) -> Result<KeyedTable<f64>> {
    keyed_f64(
        view,
        PRODUCT_CATEGORY,
        col(REVIEW_SCORE).mean(),
        "review_score",
        f64::NAN,
    )
}

pub fn payment_methods(view: &FilteredView) -> Result<PaymentMethods> {
    let df = grouped(
        view,
        PAYMENT_TYPE,
        [
            len().alias("total_usage"),
            col(PAYMENT_VALUE).sum().alias("total_payment"),
        ],
    )?;
    let keys = string_values(&df, PAYMENT_TYPE)?;
    let usage = u64_values(&df, "total_usage")?;
    let payment = f64_values(&df, "total_payment", 0.0)?;
    let mut rows: Vec<PaymentMethodRow> = keys
        .into_iter()
        .zip(usage)
        .zip(payment)
        .map(|((payment_type, total_usage), total_payment)| PaymentMethodRow {
            payment_type,
            total_usage,
            total_payment,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.total_usage
            .cmp(&a.total_usage)
            .then_with(|| a.payment_type.cmp(&b.payment_type))
    });
    Ok(PaymentMethods { rows })
}

/// RFM per customer; recency is measured against the view's latest purchase day.
pub fn rfm(view: &FilteredView) -> Result<Rfm> {
    let Some(reference) = view.max_purchase_date()? else {
        return Ok(Rfm::default());
    };
    let df = grouped(
        view,
        CUSTOMER_ID,
        [
            col(PURCHASE_TS).max().dt().date().alias("last_purchase"),
            col(ORDER_ID).drop_nulls().n_unique().alias("frequency"),
            col(PAYMENT_VALUE).sum().alias("monetary"),
        ],
    )?;
    let customers = string_values(&df, CUSTOMER_ID)?;
    let last = day_values(&df, "last_purchase")?;
    let frequency = u64_values(&df, "frequency")?;
    let monetary = f64_values(&df, "monetary", 0.0)?;

    let mut rows: Vec<RfmRow> = customers
        .into_iter()
        .zip(last)
        .zip(frequency)
        .zip(monetary)
        .map(|(((customer_id, last), frequency), monetary)| RfmRow {
            customer_id,
            recency: last.map(|d| (reference - d).num_days()).unwrap_or(0),
            frequency,
            monetary,
        })
        .collect();
    rows.sort_by(|a, b| a.customer_id.cmp(&b.customer_id));
    Ok(Rfm { rows })
}

/// Group non-null keys and aggregate.
fn grouped<E: AsRef<[Expr]>>(view: &FilteredView, key: &str, aggs: E) -> Result<DataFrame> {
    Ok(view
        .lazy()
        .filter(col(key).is_not_null())
        .group_by([col(key)])
        .agg(aggs)
        .collect()?)
}

fn keyed_f64(
    view: &FilteredView,
    key: &'static str,
    agg: Expr,
    value_name: &'static str,
    null_as: f64,
) -> Result<KeyedTable<f64>> {
    let df = grouped(view, key, [agg.alias(value_name)])?;
    let keys = string_values(&df, key)?;
    let values = f64_values(&df, value_name, null_as)?;
    let mut table = KeyedTable {
        key_name: key,
        value_name,
        rows: keys
            .into_iter()
            .zip(values)
            .map(|(key, value)| KeyedRow { key, value })
            .collect(),
    };
    table.sort_descending();
    Ok(table)
}

fn keyed_u64(
    view: &FilteredView,
    key: &'static str,
    agg: Expr,
    value_name: &'static str,
) -> Result<KeyedTable<u64>> {
    let df = grouped(view, key, [agg.alias(value_name)])?;
    let keys = string_values(&df, key)?;
    let values = u64_values(&df, value_name)?;
    let mut table = KeyedTable {
        key_name: key,
        value_name,
        rows: keys
            .into_iter()
            .zip(values)
            .map(|(key, value)| KeyedRow { key, value })
            .collect(),
    };
    table.sort_descending();
    Ok(table)
}

fn string_values(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}

fn f64_values(df: &DataFrame, name: &str, null_as: f64) -> Result<Vec<f64>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(null_as))
        .collect())
}

fn u64_values(df: &DataFrame, name: &str) -> Result<Vec<u64>> {
    let column = df.column(name)?.cast(&DataType::UInt64)?;
    Ok(column.u64()?.into_iter().map(|v| v.unwrap_or(0)).collect())
}

/// Date column as days since the Unix epoch, mapped back to calendar days.
fn day_values(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>> {
    let column = df.column(name)?.cast(&DataType::Int32)?;
    Ok(column
        .i32()?
        .into_iter()
        .map(|v| {
            v.and_then(|days| {
                NaiveDate::from_num_days_from_ce_opt(UNIX_EPOCH_CE_DAYS.saturating_add(days))
            })
        })
        .collect())
}
