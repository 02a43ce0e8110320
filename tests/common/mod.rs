#![allow(dead_code)]

use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use storedash::{Dataset, LoadOptions};
use tempfile::TempDir;

/// One row of the joined order table.
#[derive(Clone)]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub product_id: String,
    pub purchase: String,
    pub delivered: Option<String>,
    pub estimated: String,
    pub payment_type: String,
    pub payment_value: f64,
    pub review_score: Option<f64>,
    pub city: String,
    pub category: String,
}

pub fn order(order_id: &str, customer_id: &str, purchase: &str, payment_value: f64) -> Order {
    Order {
        order_id: order_id.to_string(),
        customer_id: customer_id.to_string(),
        product_id: format!("p_{}", order_id),
        purchase: purchase.to_string(),
        delivered: None,
        estimated: "2030-01-01 00:00:00".to_string(),
        payment_type: "credit_card".to_string(),
        payment_value,
        review_score: Some(5.0),
        city: "sao paulo".to_string(),
        category: "toys".to_string(),
    }
}

impl Order {
    pub fn city(mut self, city: &str) -> Self {
        self.city = city.to_string();
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn product(mut self, product_id: &str) -> Self {
        self.product_id = product_id.to_string();
        self
    }

    pub fn payment(mut self, payment_type: &str) -> Self {
        self.payment_type = payment_type.to_string();
        self
    }

    pub fn review(mut self, score: Option<f64>) -> Self {
        self.review_score = score;
        self
    }

    pub fn delivered(mut self, delivered: &str, estimated: &str) -> Self {
        self.delivered = Some(delivered.to_string());
        self.estimated = estimated.to_string();
        self
    }
}

pub fn orders_frame(orders: &[Order]) -> DataFrame {
    let text = |f: fn(&Order) -> String| orders.iter().map(f).collect::<Vec<String>>();
    df!(
        "order_id" => text(|o| o.order_id.clone()),
        "customer_id" => text(|o| o.customer_id.clone()),
        "product_id" => text(|o| o.product_id.clone()),
        "order_status" => text(|_| "delivered".to_string()),
        "order_purchase_timestamp" => text(|o| o.purchase.clone()),
        "order_approved_at" => text(|o| o.purchase.clone()),
        "order_delivered_carrier_date" => text(|_| String::new()),
        "order_delivered_customer_date" => text(|o| o.delivered.clone().unwrap_or_default()),
        "order_estimated_delivery_date" => text(|o| o.estimated.clone()),
        "payment_type" => text(|o| o.payment_type.clone()),
        "payment_value" => orders.iter().map(|o| o.payment_value).collect::<Vec<f64>>(),
        "review_score" => orders.iter().map(|o| o.review_score).collect::<Vec<Option<f64>>>(),
        "customer_city" => text(|o| o.city.clone()),
        "product_category_name" => text(|o| o.category.clone())
    )
    .unwrap()
}

/// Write `orders` as CSV into `dir` and return the file path.
pub fn write_orders_csv(dir: &Path, name: &str, orders: &[Order]) -> PathBuf {
    let path = dir.join(name);
    let mut df = orders_frame(orders);
    let mut file = File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(&mut df).unwrap();
    path
}

/// Twelve customers in twelve cities, one order a day from 2017-01-01.
/// Customer `cNN` pays `NN * 10`.
pub fn twelve_customers() -> Vec<Order> {
    (1..=12)
        .map(|i| {
            order(
                &format!("o{:02}", i),
                &format!("c{:02}", i),
                &format!("2017-01-{:02} 12:00:00", i),
                i as f64 * 10.0,
            )
            .city(&format!("city{:02}", i))
            .category(&format!("cat{:02}", i))
            .payment(if i % 2 == 0 { "boleto" } else { "credit_card" })
        })
        .collect()
}

pub fn dataset_from(orders: &[Order]) -> Dataset {
    Dataset::from_frame(orders_frame(orders)).unwrap()
}

/// Fixture CSV on disk plus the loaded dataset; the TempDir keeps the file alive.
pub fn loaded_fixture(orders: &[Order]) -> (TempDir, PathBuf, Dataset) {
    let dir = TempDir::new().unwrap();
    let path = write_orders_csv(dir.path(), "orders.csv", orders);
    let dataset = Dataset::load(&path, &LoadOptions::default()).unwrap();
    (dir, path, dataset)
}
