//! Dataset loading and date-range filtering.
//!
//! A [`Dataset`] is built once at startup from the joined order CSV and is
//! read-only afterwards. Each date-range selection produces a fresh
//! [`FilteredView`]; the loaded frame is never mutated.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use crate::CompressionFormat;

/// Column names of the joined order table.
pub mod columns {
    pub const ORDER_ID: &str = "order_id";
    pub const CUSTOMER_ID: &str = "customer_id";
    pub const PRODUCT_ID: &str = "product_id";
    pub const PURCHASE_TS: &str = "order_purchase_timestamp";
    pub const APPROVED_AT: &str = "order_approved_at";
    pub const DELIVERED_CARRIER: &str = "order_delivered_carrier_date";
    pub const DELIVERED_CUSTOMER: &str = "order_delivered_customer_date";
    pub const ESTIMATED_DELIVERY: &str = "order_estimated_delivery_date";
    pub const PAYMENT_TYPE: &str = "payment_type";
    pub const PAYMENT_VALUE: &str = "payment_value";
    pub const REVIEW_SCORE: &str = "review_score";
    pub const CUSTOMER_CITY: &str = "customer_city";
    pub const PRODUCT_CATEGORY: &str = "product_category_name";
    pub const STATUS_DELIVERY: &str = "status_delivery";

    /// Timestamp-bearing columns, parsed to datetimes at load time.
    pub const TIMESTAMPS: [&str; 5] = [
        PURCHASE_TS,
        APPROVED_AT,
        DELIVERED_CARRIER,
        DELIVERED_CUSTOMER,
        ESTIMATED_DELIVERY,
    ];

    /// Columns that must be present in the input file.
    pub const REQUIRED: [&str; 13] = [
        ORDER_ID,
        CUSTOMER_ID,
        PRODUCT_ID,
        PURCHASE_TS,
        APPROVED_AT,
        DELIVERED_CARRIER,
        DELIVERED_CUSTOMER,
        ESTIMATED_DELIVERY,
        PAYMENT_TYPE,
        PAYMENT_VALUE,
        REVIEW_SCORE,
        CUSTOMER_CITY,
        PRODUCT_CATEGORY,
    ];
}

use columns::*;

pub const STATUS_ON_TIME: &str = "On Time";
pub const STATUS_LATE: &str = "Late";
pub const STATUS_NOT_DELIVERED: &str = "Not Delivered";

const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Options for reading the dataset file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub delimiter: u8,
    pub compression: Option<CompressionFormat>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            compression: None,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_compression(mut self, compression: CompressionFormat) -> Self {
        self.compression = Some(compression);
        self
    }
}

/// Inclusive range of calendar days. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(eyre!(
                "Invalid date range: start {} is after end {}",
                start,
                end
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}

/// Parse a user-entered day (YYYY-MM-DD).
pub fn parse_day(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| eyre!("Invalid date '{}': expected YYYY-MM-DD", value.trim()))
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

pub(crate) fn datetime_from_micros(micros: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_micros(micros).map(|dt| dt.naive_utc())
}

/// The loaded order table. Rows are sorted by purchase timestamp (stable).
#[derive(Debug, Clone)]
pub struct Dataset {
    df: DataFrame,
    min_purchase: NaiveDateTime,
    max_purchase: NaiveDateTime,
}

impl Dataset {
    /// Load and normalise the dataset file. Any malformed timestamp aborts the load.
    pub fn load(path: &Path, options: &LoadOptions) -> Result<Self> {
        let df = read_csv_frame(path, options)?;
        let dataset = Self::from_frame(df)?;
        log::info!(
            "loaded {} rows from {} (purchases {} .. {})",
            dataset.height(),
            path.display(),
            dataset.min_purchase,
            dataset.max_purchase
        );
        Ok(dataset)
    }

    /// Normalise an in-memory frame: parse timestamps and numerics, derive
    /// the delivery status when absent, and sort by purchase time.
    pub fn from_frame(df: DataFrame) -> Result<Self> {
        let mut df = df;
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        for required in REQUIRED {
            if !names.iter().any(|n| n == required) {
                return Err(eyre!("Dataset is missing required column '{}'", required));
            }
        }
        if df.height() == 0 {
            return Err(eyre!("Dataset contains no rows"));
        }

        for name in TIMESTAMPS {
            let parsed = parse_timestamp_column(&df, name)?;
            df.with_column(parsed)?;
        }
        if df.column(PURCHASE_TS)?.null_count() > 0 {
            let row = first_null_row(df.column(PURCHASE_TS)?)?;
            return Err(eyre!(
                "Column '{}' is empty at row {}; every order needs a purchase timestamp",
                PURCHASE_TS,
                row
            ));
        }
        for name in [PAYMENT_VALUE, REVIEW_SCORE] {
            let parsed = parse_float_column(&df, name)?;
            df.with_column(parsed)?;
        }
        for name in [ORDER_ID, CUSTOMER_ID, PRODUCT_ID, PAYMENT_TYPE, CUSTOMER_CITY, PRODUCT_CATEGORY]
        {
            let cast = df.column(name)?.cast(&DataType::String)?;
            df.with_column(cast)?;
        }

        let mut lf = df.lazy();
        if names.iter().any(|n| n == STATUS_DELIVERY) {
            // empty cells fall back to the derived status
            lf = lf.with_column(
                col(STATUS_DELIVERY)
                    .cast(DataType::String)
                    .fill_null(derive_delivery_status())
                    .alias(STATUS_DELIVERY),
            );
        } else {
            lf = lf.with_column(derive_delivery_status());
        }
        let df = lf
            .sort_by_exprs(
                [col(PURCHASE_TS)],
                SortMultipleOptions {
                    maintain_order: true,
                    ..Default::default()
                },
            )
            .collect()?;

        let (min_purchase, max_purchase) = purchase_bounds(&df)?
            .ok_or_else(|| eyre!("Dataset contains no purchase timestamps"))?;

        Ok(Self {
            df,
            min_purchase,
            max_purchase,
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn min_purchase(&self) -> NaiveDateTime {
        self.min_purchase
    }

    pub fn max_purchase(&self) -> NaiveDateTime {
        self.max_purchase
    }

    /// Selectable day range: the first and last purchase day in the data.
    pub fn bounds(&self) -> (NaiveDate, NaiveDate) {
        (self.min_purchase.date(), self.max_purchase.date())
    }

    pub fn full_range(&self) -> DateRange {
        let (start, end) = self.bounds();
        DateRange { start, end }
    }

    /// Validate a user selection. Out-of-bounds days are rejected, not clamped.
    pub fn validate_selection(&self, start: NaiveDate, end: NaiveDate) -> Result<DateRange> {
        let range = DateRange::new(start, end)?;
        let (min, max) = self.bounds();
        if start < min || start > max {
            return Err(eyre!(
                "Start date {} is outside the data range {} .. {}",
                start,
                min,
                max
            ));
        }
        if end < min || end > max {
            return Err(eyre!(
                "End date {} is outside the data range {} .. {}",
                end,
                min,
                max
            ));
        }
        Ok(range)
    }

    /// Rows whose purchase timestamp falls on any day of `range`.
    pub fn filter(&self, range: &DateRange) -> Result<FilteredView> {
        let lower = range.start.and_time(NaiveTime::MIN);
        let in_range = match range.end.checked_add_signed(Duration::days(1)) {
            Some(next) => col(PURCHASE_TS)
                .gt_eq(lit(lower))
                .and(col(PURCHASE_TS).lt(lit(next.and_time(NaiveTime::MIN)))),
            None => col(PURCHASE_TS).gt_eq(lit(lower)),
        };
        let df = self.df.clone().lazy().filter(in_range).collect()?;
        log::debug!("filtered {} to {} rows", range, df.height());
        Ok(FilteredView { df, range: *range })
    }
}

/// Read-only subset of the dataset for one date range.
#[derive(Debug, Clone)]
pub struct FilteredView {
    df: DataFrame,
    range: DateRange,
}

impl FilteredView {
    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn lazy(&self) -> LazyFrame {
        self.df.clone().lazy()
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Latest purchase day in the view; `None` when empty.
    pub fn max_purchase_date(&self) -> Result<Option<NaiveDate>> {
        Ok(purchase_bounds(&self.df)?.map(|(_, max)| max.date()))
    }

    /// Number of distinct order ids in the view.
    pub fn distinct_orders(&self) -> Result<usize> {
        Ok(self.df.column(ORDER_ID)?.drop_nulls().n_unique()?)
    }
}

fn purchase_bounds(df: &DataFrame) -> Result<Option<(NaiveDateTime, NaiveDateTime)>> {
    let micros = df.column(PURCHASE_TS)?.cast(&DataType::Int64)?;
    let micros = micros.i64()?;
    let bounds = match (micros.min(), micros.max()) {
        (Some(min), Some(max)) => datetime_from_micros(min).zip(datetime_from_micros(max)),
        _ => None,
    };
    Ok(bounds)
}

fn first_null_row(column: &Column) -> Result<usize> {
    let mask = column.is_null();
    let row = mask
        .into_iter()
        .position(|v| v == Some(true))
        .map(|idx| idx + 1)
        .unwrap_or(0);
    Ok(row)
}

fn derive_delivery_status() -> Expr {
    let delivered = col(DELIVERED_CUSTOMER);
    let estimated = col(ESTIMATED_DELIVERY);
    when(delivered.clone().is_null())
        .then(lit(STATUS_NOT_DELIVERED))
        .when(
            estimated
                .clone()
                .is_null()
                .or(delivered.dt().date().lt_eq(estimated.dt().date())),
        )
        .then(lit(STATUS_ON_TIME))
        .otherwise(lit(STATUS_LATE))
        .alias(STATUS_DELIVERY)
}

fn parse_timestamp_column(df: &DataFrame, name: &str) -> Result<Column> {
    let column = df.column(name)?;
    match column.dtype() {
        DataType::Datetime(_, _) | DataType::Date => {
            return Ok(column.cast(&DataType::Datetime(TimeUnit::Microseconds, None))?);
        }
        DataType::String => {}
        // A column that is null in every row is inferred as another type.
        _ if column.null_count() == column.len() => {
            return Ok(column.cast(&DataType::Datetime(TimeUnit::Microseconds, None))?);
        }
        other => {
            return Err(eyre!(
                "Column '{}' has type {} but should hold timestamps",
                name,
                other
            ))
        }
    }

    let values = column.str()?;
    let mut parsed = Vec::with_capacity(values.len());
    for (idx, raw) in values.into_iter().enumerate() {
        let value = match raw.map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(parse_timestamp(text).ok_or_else(|| {
                eyre!(
                    "Unparseable timestamp '{}' in column '{}' at row {}",
                    text,
                    name,
                    idx + 1
                )
            })?),
        };
        parsed.push(value);
    }
    Ok(
        DatetimeChunked::from_naive_datetime_options(name.into(), parsed, TimeUnit::Microseconds)
            .into_column(),
    )
}

fn parse_float_column(df: &DataFrame, name: &str) -> Result<Column> {
    let column = df.column(name)?;
    if column.dtype() != &DataType::String {
        return Ok(column.cast(&DataType::Float64)?);
    }
    let values = column.str()?;
    let mut parsed = Vec::with_capacity(values.len());
    for (idx, raw) in values.into_iter().enumerate() {
        let value = match raw.map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(text.parse::<f64>().map_err(|_| {
                eyre!(
                    "Invalid number '{}' in column '{}' at row {}",
                    text,
                    name,
                    idx + 1
                )
            })?),
        };
        parsed.push(value);
    }
    Ok(Column::new(name.into(), parsed))
}

/// Read the raw table with every column as a string; typing happens in `from_frame`.
fn read_csv_frame(path: &Path, options: &LoadOptions) -> Result<DataFrame> {
    let read_options = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| opts.with_separator(options.delimiter));

    let compression = options
        .compression
        .or_else(|| CompressionFormat::from_extension(path));

    let df = match compression {
        None => read_options
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
        Some(compression) => {
            let bytes = decompress_file(path, compression)?;
            read_options
                .into_reader_with_file_handle(Cursor::new(bytes))
                .finish()?
        }
    };
    Ok(df)
}

fn decompress_file(path: &Path, compression: CompressionFormat) -> Result<Vec<u8>> {
    let reader = BufReader::new(File::open(path)?);
    let mut decompressed = Vec::new();
    match compression {
        CompressionFormat::Gzip => {
            flate2::read::MultiGzDecoder::new(reader).read_to_end(&mut decompressed)?;
        }
        CompressionFormat::Zstd => {
            zstd::stream::read::Decoder::new(reader)?.read_to_end(&mut decompressed)?;
        }
        CompressionFormat::Bzip2 => {
            bzip2::read::BzDecoder::new(reader).read_to_end(&mut decompressed)?;
        }
        CompressionFormat::Xz => {
            xz2::read::XzDecoder::new(reader).read_to_end(&mut decompressed)?;
        }
    }
    log::debug!(
        "decompressed {} ({}) to {} bytes",
        path.display(),
        compression.extension(),
        decompressed.len()
    );
    Ok(decompressed)
}
