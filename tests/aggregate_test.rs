use chrono::NaiveDate;
use polars::prelude::*;
use storedash::aggregate;
use storedash::{Dashboard, DashboardOptions, Dataset, DateRange};

mod common;
use common::{dataset_from, order, orders_frame, twelve_customers};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn range(a: NaiveDate, b: NaiveDate) -> DateRange {
    DateRange::new(a, b).unwrap()
}

#[test]
fn test_delivery_counts_sum_to_distinct_orders() {
    let mut orders = twelve_customers();
    // second item of an existing order, and a late delivery
    orders.push(order("o03", "c03", "2017-01-03 12:00:00", 7.0).product("p_extra"));
    orders[0] = orders[0]
        .clone()
        .delivered("2017-01-10 09:00:00", "2017-01-05 00:00:00");
    orders[1] = orders[1]
        .clone()
        .delivered("2017-01-04 09:00:00", "2017-01-05 00:00:00");
    let dataset = dataset_from(&orders);

    for (a, b) in [
        (day(2017, 1, 1), day(2017, 1, 12)),
        (day(2017, 1, 2), day(2017, 1, 4)),
        (day(2017, 1, 12), day(2017, 1, 12)),
    ] {
        let view = dataset.filter(&range(a, b)).unwrap();
        assert!(!view.is_empty());
        let delivery = aggregate::delivery_status(&view).unwrap();
        let total: u64 = delivery.rows.iter().map(|r| r.value).sum();
        assert_eq!(total as usize, view.distinct_orders().unwrap());
    }
}

#[test]
fn test_derived_delivery_statuses() {
    let orders = vec![
        order("o1", "c1", "2017-01-01 10:00:00", 1.0)
            .delivered("2017-01-10 09:00:00", "2017-01-05 00:00:00"),
        order("o2", "c2", "2017-01-01 11:00:00", 1.0)
            .delivered("2017-01-05 23:00:00", "2017-01-05 00:00:00"),
        order("o3", "c3", "2017-01-01 12:00:00", 1.0),
    ];
    let dataset = dataset_from(&orders);
    let view = dataset.filter(&dataset.full_range()).unwrap();
    let delivery = aggregate::delivery_status(&view).unwrap();
    let mut keys: Vec<&str> = delivery.rows.iter().map(|r| r.key.as_str()).collect();
    keys.sort();
    assert_eq!(keys, vec!["Late", "Not Delivered", "On Time"]);
    assert!(delivery.rows.iter().all(|r| r.value == 1));
}

#[test]
fn test_full_range_matches_unfiltered_dataset() {
    let dataset = dataset_from(&twelve_customers());
    let view = dataset.filter(&dataset.full_range()).unwrap();
    assert_eq!(view.height(), dataset.height());

    let expected_revenue: f64 = dataset
        .frame()
        .column("payment_value")
        .unwrap()
        .as_materialized_series()
        .sum()
        .unwrap();
    let by_customer = aggregate::revenue_by_customer(&view).unwrap();
    assert_eq!(by_customer.total(), expected_revenue);
    assert_eq!(by_customer.len(), 12);

    let daily = aggregate::daily_orders(&view).unwrap();
    assert_eq!(daily.total_orders(), 12);
    assert_eq!(daily.total_revenue(), expected_revenue);
}

#[test]
fn test_range_outside_data_yields_empty_tables() {
    let dataset = dataset_from(&twelve_customers());
    for r in [
        range(day(2010, 1, 1), day(2016, 12, 31)),
        range(day(2017, 1, 13), day(2018, 6, 30)),
    ] {
        let view = dataset.filter(&r).unwrap();
        assert!(view.is_empty());

        let daily = aggregate::daily_orders(&view).unwrap();
        assert!(daily.rows.is_empty());
        assert_eq!(daily.total_orders(), 0);
        assert_eq!(daily.total_revenue(), 0.0);

        let keyed_f64 = [
            aggregate::revenue_by_city(&view).unwrap(),
            aggregate::revenue_by_customer(&view).unwrap(),
            aggregate::revenue_by_category(&view).unwrap(),
            aggregate::rating_by_category(&view).unwrap(),
        ];
        for table in &keyed_f64 {
            assert!(table.is_empty());
            assert_eq!(table.total(), 0.0);
        }
        for table in [
            aggregate::delivery_status(&view).unwrap(),
            aggregate::product_popularity(&view).unwrap(),
        ] {
            assert!(table.is_empty());
            assert_eq!(table.total(), 0.0);
        }
        assert!(aggregate::payment_methods(&view).unwrap().rows.is_empty());
        assert!(aggregate::rfm(&view).unwrap().rows.is_empty());

        let dashboard = Dashboard::compute(&view, &DashboardOptions::default()).unwrap();
        assert!(dashboard.is_empty());
        assert_eq!(dashboard.summary.total_orders, 0);
        assert_eq!(dashboard.summary.total_revenue, 0.0);
        assert!(dashboard.summary.avg_recency.is_nan());
    }
}

#[test]
fn test_recency_zero_for_order_on_last_day() {
    let dataset = dataset_from(&twelve_customers());
    let view = dataset
        .filter(&range(day(2017, 1, 1), day(2017, 1, 8)))
        .unwrap();
    assert_eq!(view.max_purchase_date().unwrap(), Some(day(2017, 1, 8)));

    let rfm = aggregate::rfm(&view).unwrap();
    let c08 = rfm.rows.iter().find(|r| r.customer_id == "c08").unwrap();
    assert_eq!(c08.recency, 0);
    assert_eq!(c08.frequency, 1);
    let c01 = rfm.rows.iter().find(|r| r.customer_id == "c01").unwrap();
    assert_eq!(c01.recency, 7);
}

#[test]
fn test_top_and_bottom_are_disjoint_extremes() {
    let dataset = dataset_from(&twelve_customers());
    let view = dataset.filter(&dataset.full_range()).unwrap();
    let cities = aggregate::revenue_by_city(&view).unwrap();
    assert!(cities.len() >= 10);

    let top: Vec<String> = cities.top(5).into_iter().map(|r| r.key).collect();
    let bottom: Vec<String> = cities.bottom(5).into_iter().map(|r| r.key).collect();
    assert!(top.iter().all(|k| !bottom.contains(k)));
    assert_eq!(top, vec!["city12", "city11", "city10", "city09", "city08"]);
    assert_eq!(bottom, vec!["city01", "city02", "city03", "city04", "city05"]);
}

#[test]
fn test_revenue_by_customer_example() {
    let orders = vec![
        order("o1", "C1", "2017-01-01 10:00:00", 10.0),
        order("o2", "C1", "2017-01-02 10:00:00", 20.0),
        order("o3", "C1", "2017-01-03 10:00:00", 30.0),
        order("o4", "C2", "2017-01-03 11:00:00", 5.0),
    ];
    let dataset = dataset_from(&orders);
    let view = dataset.filter(&dataset.full_range()).unwrap();
    let table = aggregate::revenue_by_customer(&view).unwrap();
    let rows: Vec<(String, f64)> = table.rows.into_iter().map(|r| (r.key, r.value)).collect();
    assert_eq!(
        rows,
        vec![("C1".to_string(), 60.0), ("C2".to_string(), 5.0)]
    );
}

#[test]
fn test_daily_orders_same_day_example() {
    let distinct = vec![
        order("o1", "c1", "2017-03-01 08:00:00", 10.0),
        order("o2", "c2", "2017-03-01 18:00:00", 15.0),
    ];
    let dataset = dataset_from(&distinct);
    let daily = aggregate::daily_orders(&dataset.filter(&dataset.full_range()).unwrap()).unwrap();
    assert_eq!(daily.rows.len(), 1);
    assert_eq!(daily.rows[0].day, day(2017, 3, 1));
    assert_eq!(daily.rows[0].order_count, 2);
    assert_eq!(daily.rows[0].revenue, 25.0);

    let shared = vec![
        order("o1", "c1", "2017-03-01 08:00:00", 10.0),
        order("o1", "c1", "2017-03-01 08:00:00", 15.0).product("p_second"),
    ];
    let dataset = dataset_from(&shared);
    let daily = aggregate::daily_orders(&dataset.filter(&dataset.full_range()).unwrap()).unwrap();
    assert_eq!(daily.rows.len(), 1);
    assert_eq!(daily.rows[0].order_count, 1);
    assert_eq!(daily.rows[0].revenue, 25.0);
}

#[test]
fn test_end_day_is_included_in_full() {
    let orders = vec![
        order("o1", "c1", "2017-01-01 00:00:00", 1.0),
        order("o2", "c2", "2017-01-02 23:59:59", 2.0),
        order("o3", "c3", "2017-01-03 00:00:00", 4.0),
    ];
    let dataset = dataset_from(&orders);
    let view = dataset
        .filter(&range(day(2017, 1, 1), day(2017, 1, 2)))
        .unwrap();
    assert_eq!(view.height(), 2);
    let daily = aggregate::daily_orders(&view).unwrap();
    assert_eq!(daily.total_revenue(), 3.0);
}

#[test]
fn test_daily_gaps_omitted_unless_dense() {
    let orders = vec![
        order("o1", "c1", "2017-01-01 10:00:00", 1.0),
        order("o2", "c2", "2017-01-04 10:00:00", 2.0),
    ];
    let dataset = dataset_from(&orders);
    let view = dataset.filter(&dataset.full_range()).unwrap();

    let sparse = Dashboard::compute(&view, &DashboardOptions::default()).unwrap();
    assert_eq!(sparse.daily_orders.rows.len(), 2);

    let dense = Dashboard::compute(
        &view,
        &DashboardOptions {
            dense_daily: true,
            ..DashboardOptions::default()
        },
    )
    .unwrap();
    assert_eq!(dense.daily_orders.rows.len(), 4);
    assert_eq!(dense.daily_orders.rows[1].order_count, 0);
    assert_eq!(dense.summary.total_orders, 2);
}

#[test]
fn test_ties_break_on_key() {
    let orders = vec![
        order("o1", "c1", "2017-01-01 10:00:00", 10.0).city("b"),
        order("o2", "c2", "2017-01-01 11:00:00", 10.0).city("a"),
        order("o3", "c3", "2017-01-01 12:00:00", 10.0).city("c"),
    ];
    let dataset = dataset_from(&orders);
    let view = dataset.filter(&dataset.full_range()).unwrap();
    let cities = aggregate::revenue_by_city(&view).unwrap();
    let keys: Vec<String> = cities.top(3).into_iter().map(|r| r.key).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
    let keys: Vec<String> = cities.bottom(3).into_iter().map(|r| r.key).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
}

#[test]
fn test_product_popularity_counts_distinct_products() {
    let orders = vec![
        order("o1", "c1", "2017-01-01 10:00:00", 1.0)
            .category("toys")
            .product("p1"),
        order("o2", "c2", "2017-01-01 11:00:00", 1.0)
            .category("toys")
            .product("p1"),
        order("o3", "c3", "2017-01-01 12:00:00", 1.0)
            .category("toys")
            .product("p2"),
        order("o4", "c4", "2017-01-01 13:00:00", 1.0)
            .category("books")
            .product("p3"),
    ];
    let dataset = dataset_from(&orders);
    let view = dataset.filter(&dataset.full_range()).unwrap();
    let popularity = aggregate::product_popularity(&view).unwrap();
    assert_eq!(popularity.rows[0].key, "toys");
    assert_eq!(popularity.rows[0].value, 2);
    assert_eq!(popularity.rows[1].key, "books");
    assert_eq!(popularity.rows[1].value, 1);
}

#[test]
fn test_rating_by_category_means_and_missing_scores() {
    let orders = vec![
        order("o1", "c1", "2017-01-01 10:00:00", 1.0)
            .category("toys")
            .review(Some(4.0)),
        order("o2", "c2", "2017-01-01 11:00:00", 1.0)
            .category("toys")
            .review(Some(5.0)),
        order("o3", "c3", "2017-01-01 12:00:00", 1.0)
            .category("books")
            .review(None),
    ];
    let dataset = dataset_from(&orders);
    let view = dataset.filter(&dataset.full_range()).unwrap();
    let ratings = aggregate::rating_by_category(&view).unwrap();
    assert_eq!(ratings.rows[0].key, "toys");
    assert_eq!(ratings.rows[0].value, 4.5);
    let books = ratings.rows.iter().find(|r| r.key == "books").unwrap();
    assert!(books.value.is_nan());
}

#[test]
fn test_payment_usage_counts_rows() {
    let dataset = dataset_from(&twelve_customers());
    let view = dataset.filter(&dataset.full_range()).unwrap();
    let payments = aggregate::payment_methods(&view).unwrap();
    assert_eq!(payments.rows.len(), 2);
    let boleto = payments
        .rows
        .iter()
        .find(|r| r.payment_type == "boleto")
        .unwrap();
    assert_eq!(boleto.total_usage, 6);
    assert_eq!(boleto.total_payment, 420.0);
    assert_eq!(payments.by_payment()[0].payment_type, "boleto");
}

#[test]
fn test_null_identifiers_are_not_distinct_values() {
    let orders = vec![
        order("o1", "c1", "2017-01-01 10:00:00", 10.0),
        order("o2", "c2", "2017-01-01 12:00:00", 5.0),
    ];
    let mut df = orders_frame(&orders);
    df.with_column(Column::new("order_id".into(), vec![Some("o1"), None]))
        .unwrap();
    df.with_column(Column::new("product_id".into(), vec![Some("p1"), None]))
        .unwrap();
    let dataset = Dataset::from_frame(df).unwrap();
    let view = dataset.filter(&dataset.full_range()).unwrap();
    assert_eq!(view.distinct_orders().unwrap(), 1);

    let daily = aggregate::daily_orders(&view).unwrap();
    assert_eq!(daily.rows.len(), 1);
    assert_eq!(daily.rows[0].order_count, 1);
    assert_eq!(daily.rows[0].revenue, 15.0);

    let popularity = aggregate::product_popularity(&view).unwrap();
    assert_eq!(popularity.rows.len(), 1);
    assert_eq!(popularity.rows[0].key, "toys");
    assert_eq!(popularity.rows[0].value, 1);

    let rfm = aggregate::rfm(&view).unwrap();
    let c2 = rfm.rows.iter().find(|r| r.customer_id == "c2").unwrap();
    assert_eq!(c2.frequency, 0);
}
