//! Revenue and profit timeline for the admin dashboard.
//!
//! Orders in a revenue status are bucketed by day or month over the last
//! `days` days. Buckets without orders are filled with zeros so the series
//! always covers the full window.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use rust_decimal::{Decimal, prelude::FromPrimitive};
use sqlx::FromRow;

use crate::{
    db::DbPool,
    dto::admin::{Analytics, AnalyticsPoint},
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    pricing::round2,
    response::ApiResponse,
    routes::params::AnalyticsQuery,
    services::order_service::{REVENUE_STATUSES, net_sales},
    state::AppState,
};

pub const DEFAULT_DAYS: i64 = 30;
pub const MAX_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    Day,
    Month,
}

impl Grouping {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("month") => Grouping::Month,
            _ => Grouping::Day,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grouping::Day => "day",
            Grouping::Month => "month",
        }
    }

    fn key(&self, date: NaiveDate) -> String {
        match self {
            Grouping::Day => date.format("%Y-%m-%d").to_string(),
            Grouping::Month => date.format("%Y-%m").to_string(),
        }
    }

    fn sql_format(&self) -> &'static str {
        match self {
            Grouping::Day => "YYYY-MM-DD",
            Grouping::Month => "YYYY-MM",
        }
    }
}

pub fn clamp_days(days: Option<i64>) -> i64 {
    days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS)
}

/// Sums for one bucket.
#[derive(Debug, Clone, Default, FromRow)]
pub struct BucketTotals {
    pub bucket: String,
    pub revenue: Decimal,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub real_cost: Decimal,
}

/// Bucket keys from `start` to `end` inclusive.
pub fn timeline(start: NaiveDate, end: NaiveDate, group: Grouping) -> Vec<String> {
    let mut keys = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        keys.push(group.key(cursor));
        cursor = match group {
            Grouping::Day => cursor + Duration::days(1),
            Grouping::Month => {
                let (year, month) = if cursor.month() == 12 {
                    (cursor.year() + 1, 1)
                } else {
                    (cursor.year(), cursor.month() + 1)
                };
                match NaiveDate::from_ymd_opt(year, month, 1) {
                    Some(next) => next,
                    None => break,
                }
            }
        };
    }
    keys
}

/// Profit uses recorded line costs when any exist, else the configured COGS rate.
pub fn point(date: String, totals: Option<&BucketTotals>, cogs_rate: Decimal) -> AnalyticsPoint {
    let Some(totals) = totals else {
        return AnalyticsPoint {
            date,
            revenue: Decimal::ZERO,
            net_sales: Decimal::ZERO,
            estimated_profit: Decimal::ZERO,
        };
    };
    let net = net_sales(totals.subtotal, totals.discount);
    let profit = if totals.real_cost > Decimal::ZERO {
        net - totals.real_cost - totals.shipping
    } else {
        net * (Decimal::ONE - cogs_rate) - totals.shipping
    };
    AnalyticsPoint {
        date,
        revenue: round2(totals.revenue),
        net_sales: round2(net),
        estimated_profit: round2(profit),
    }
}

pub fn build_points(
    start: NaiveDate,
    end: NaiveDate,
    group: Grouping,
    buckets: &HashMap<String, BucketTotals>,
    cogs_rate: Decimal,
) -> Vec<AnalyticsPoint> {
    timeline(start, end, group)
        .into_iter()
        .map(|key| {
            let totals = buckets.get(&key);
            point(key, totals, cogs_rate)
        })
        .collect()
}

async fn load_buckets(pool: &DbPool, start: NaiveDate, group: Grouping) -> AppResult<HashMap<String, BucketTotals>> {
    let statuses: Vec<String> = REVENUE_STATUSES.iter().map(|s| s.to_string()).collect();
    let rows = sqlx::query_as::<_, BucketTotals>(
        r#"
        SELECT to_char(date_trunc($2, o.created_at AT TIME ZONE 'UTC'), $3) AS bucket,
               COALESCE(SUM(o.total_amount), 0) AS revenue,
               COALESCE(SUM(o.subtotal), 0) AS subtotal,
               COALESCE(SUM(o.discount_amount), 0) AS discount,
               COALESCE(SUM(o.shipping_amount), 0) AS shipping,
               COALESCE(SUM(c.cost), 0) AS real_cost
        FROM orders o
        LEFT JOIN (
            SELECT order_id, SUM(line_cost) AS cost FROM order_items GROUP BY order_id
        ) c ON c.order_id = o.id
        WHERE o.created_at >= $1 AND o.status = ANY($4)
        GROUP BY bucket
        "#,
    )
    .bind(start.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()))
    .bind(group.as_str())
    .bind(group.sql_format())
    .bind(statuses)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|row| (row.bucket.clone(), row)).collect())
}

pub async fn compute(state: &AppState, query: &AnalyticsQuery) -> AppResult<Analytics> {
    let days = clamp_days(query.days);
    let group = Grouping::parse(query.group.as_deref());
    let today = Utc::now().date_naive();
    let start = today - Duration::days(days - 1);
    let cogs_rate = Decimal::from_f64(state.config.pricing.cogs_rate)
        .unwrap_or(Decimal::ZERO)
        .clamp(Decimal::ZERO, Decimal::ONE);

    let buckets = load_buckets(&state.pool, start, group).await?;
    let points = build_points(start, today, group, &buckets, cogs_rate);

    Ok(Analytics {
        days,
        group: group.as_str().to_string(),
        total_revenue: points.iter().map(|p| p.revenue).sum(),
        total_net_sales: points.iter().map(|p| p.net_sales).sum(),
        total_profit: points.iter().map(|p| p.estimated_profit).sum(),
        points,
    })
}

pub async fn analytics(state: &AppState, user: &AuthUser, query: AnalyticsQuery) -> AppResult<ApiResponse<Analytics>> {
    ensure_admin(user)?;
    let data = compute(state, &query).await?;
    Ok(ApiResponse::ok("Analytics", data))
}

pub fn to_csv(points: &[AnalyticsPoint]) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for point in points {
        writer.serialize(point).map_err(anyhow::Error::from)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("csv flush failed: {err}"))?;
    Ok(bytes)
}

pub async fn analytics_csv(state: &AppState, user: &AuthUser, query: AnalyticsQuery) -> AppResult<Vec<u8>> {
    ensure_admin(user)?;
    let data = compute(state, &query).await?;
    to_csv(&data.points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn days_are_clamped() {
        assert_eq!(clamp_days(None), 30);
        assert_eq!(clamp_days(Some(0)), 1);
        assert_eq!(clamp_days(Some(1000)), 365);
        assert_eq!(clamp_days(Some(90)), 90);
    }

    #[test]
    fn grouping_defaults_to_day() {
        assert_eq!(Grouping::parse(Some("month")), Grouping::Month);
        assert_eq!(Grouping::parse(Some("week")), Grouping::Day);
        assert_eq!(Grouping::parse(None), Grouping::Day);
    }

    #[test]
    fn daily_timeline_is_inclusive() {
        let keys = timeline(date(2024, 2, 27), date(2024, 3, 1), Grouping::Day);
        assert_eq!(keys, vec!["2024-02-27", "2024-02-28", "2024-02-29", "2024-03-01"]);
    }

    #[test]
    fn monthly_timeline_crosses_year_end() {
        let keys = timeline(date(2023, 11, 15), date(2024, 1, 3), Grouping::Month);
        assert_eq!(keys, vec!["2023-11", "2023-12", "2024-01"]);
    }

    #[test]
    fn missing_buckets_are_zero_filled() {
        let mut buckets = HashMap::new();
        buckets.insert(
            "2024-05-02".to_string(),
            BucketTotals {
                bucket: "2024-05-02".into(),
                revenue: dec!(1177.64),
                subtotal: dec!(998),
                discount: dec!(0),
                shipping: dec!(0),
                real_cost: dec!(0),
            },
        );
        let points = build_points(date(2024, 5, 1), date(2024, 5, 3), Grouping::Day, &buckets, dec!(0.4));
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].revenue, Decimal::ZERO);
        assert_eq!(points[1].revenue, dec!(1177.64));
        assert_eq!(points[1].estimated_profit, dec!(598.80));
        assert_eq!(points[2].net_sales, Decimal::ZERO);
    }

    #[test]
    fn real_cost_overrides_cogs_rate() {
        let totals = BucketTotals {
            bucket: "2024-05".into(),
            revenue: dec!(600),
            subtotal: dec!(500),
            discount: dec!(50),
            shipping: dec!(49),
            real_cost: dec!(200),
        };
        let p = point("2024-05".into(), Some(&totals), dec!(0.5));
        assert_eq!(p.net_sales, dec!(450));
        assert_eq!(p.estimated_profit, dec!(201));
    }

    #[test]
    fn csv_has_header_and_rows() {
        let points = vec![AnalyticsPoint {
            date: "2024-05-01".into(),
            revenue: dec!(10.50),
            net_sales: dec!(9),
            estimated_profit: dec!(-40),
        }];
        let text = String::from_utf8(to_csv(&points).expect("csv")).expect("utf8");
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("date,revenue,net_sales,estimated_profit"));
        assert_eq!(lines.next(), Some("2024-05-01,10.50,9,-40"));
    }
}
