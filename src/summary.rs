//! One render cycle: every aggregate table plus the headline metrics.

use color_eyre::Result;
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::aggregate::{self, DailyOrders, KeyedTable, PaymentMethods, Rfm};
use crate::dataset::{DateRange, FilteredView};

/// Knobs that shape a dashboard cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardOptions {
    /// Rows in each top/bottom view.
    pub top_n: usize,
    /// Zero-fill days without orders in the daily table.
    pub dense_daily: bool,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            top_n: 5,
            dense_daily: false,
        }
    }
}

/// Headline numbers shown above the charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_orders: u64,
    pub total_revenue: f64,
    /// NaN when there are no customers in range.
    pub avg_recency: f64,
    pub avg_frequency: f64,
    pub avg_monetary: f64,
}

impl Summary {
    pub fn from_tables(daily: &DailyOrders, rfm: &Rfm) -> Self {
        Self {
            total_orders: daily.total_orders(),
            total_revenue: daily.total_revenue(),
            avg_recency: rfm.mean_recency(),
            avg_frequency: rfm.mean_frequency(),
            avg_monetary: rfm.mean_monetary(),
        }
    }
}

/// Round to `decimals` places; NaN stays NaN.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Render a rounded metric, or "N/A" when it is undefined.
pub fn format_metric(value: f64, decimals: u32) -> String {
    if value.is_finite() {
        format!("{:.*}", decimals as usize, round_to(value, decimals))
    } else {
        "N/A".to_string()
    }
}

/// All tables for one filtered view.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    #[serde(serialize_with = "serialize_range")]
    pub range: DateRange,
    pub rows_in_range: usize,
    pub top_n: usize,
    pub summary: Summary,
    pub daily_orders: DailyOrders,
    pub revenue_by_city: KeyedTable<f64>,
    pub revenue_by_customer: KeyedTable<f64>,
    pub delivery_status: KeyedTable<u64>,
    pub product_popularity: KeyedTable<u64>,
    pub revenue_by_category: KeyedTable<f64>,
    pub rating_by_category: KeyedTable<f64>,
    pub payment_methods: PaymentMethods,
    pub rfm: Rfm,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl Dashboard {
    /// Run every aggregation once over `view`.
    pub fn compute(view: &FilteredView, options: &DashboardOptions) -> Result<Self> {
        let started = Instant::now();

        let mut daily_orders = aggregate::daily_orders(view)?;
        if options.dense_daily {
            daily_orders = daily_orders.densify();
        }
        let rfm = aggregate::rfm(view)?;
        let summary = Summary::from_tables(&daily_orders, &rfm);

        let dashboard = Self {
            range: view.range(),
            rows_in_range: view.height(),
            top_n: options.top_n,
            summary,
            daily_orders,
            revenue_by_city: aggregate::revenue_by_city(view)?,
            revenue_by_customer: aggregate::revenue_by_customer(view)?,
            delivery_status: aggregate::delivery_status(view)?,
            product_popularity: aggregate::product_popularity(view)?,
            revenue_by_category: aggregate::revenue_by_category(view)?,
            rating_by_category: aggregate::rating_by_category(view)?,
            payment_methods: aggregate::payment_methods(view)?,
            rfm,
            elapsed: started.elapsed(),
        };
        log::debug!(
            "computed dashboard for {} ({} rows) in {:?}",
            dashboard.range,
            dashboard.rows_in_range,
            dashboard.elapsed
        );
        Ok(dashboard)
    }

    pub fn is_empty(&self) -> bool {
        self.rows_in_range == 0
    }
}

fn serialize_range<S: serde::Serializer>(range: &DateRange, s: S) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeStruct;
    let mut st = s.serialize_struct("DateRange", 2)?;
    st.serialize_field("start", &range.start())?;
    st.serialize_field("end", &range.end())?;
    st.end()
}
