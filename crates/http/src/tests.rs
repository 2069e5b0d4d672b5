use super::*;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::TimeDelta;
use cpumon_core::{FixedClock, MemoryStore, RetentionPolicy, SampleStore};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 26)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    now().date().and_hms_opt(h, m, s).unwrap()
}

fn app_with(store: Arc<dyn SampleStore>) -> Router {
    let usage = UsageService::new(store, RetentionPolicy::default(), Arc::new(FixedClock(now())));
    router(AppState { usage, sampler: None })
}

async fn seeded() -> Router {
    let store = Arc::new(MemoryStore::new());
    store.append(at(4, 20, 15), 30.0).await.unwrap();
    store.append(at(4, 20, 45), 40.0).await.unwrap();
    store.append(at(4, 25, 0), 50.0).await.unwrap();
    store.append(at(9, 0, 0), 70.0).await.unwrap();
    app_with(store)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

struct BrokenStore;

#[async_trait]
impl SampleStore for BrokenStore {
    async fn append(&self, _: NaiveDateTime, _: f64) -> Result<Sample> {
        Err(MonitorError::StorageUnavailable("no such table: cpu_samples".into()))
    }

    async fn range(&self, _: NaiveDateTime, _: NaiveDateTime) -> Result<Vec<Sample>> {
        Err(MonitorError::StorageUnavailable("no such table: cpu_samples".into()))
    }
}

#[tokio::test]
async fn minute_returns_raw_samples_in_order() {
    let (status, body) = get(
        seeded().await,
        "/usage/minute?start=2024-05-26T04:20:15&end=2024-05-26T04:25:00",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["timestamp"], "2024-05-26T04:20:15");
    assert_eq!(rows[0]["value"], 30.0);
    assert!(rows[0]["id"].is_i64());
    assert_eq!(rows[2]["value"], 50.0);
}

#[tokio::test]
async fn minute_fractional_start_skips_earlier_second() {
    let (status, body) = get(
        seeded().await,
        "/usage/minute?start=2024-05-26T04:20:15.500&end=2024-05-26T04:25:00",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["timestamp"], "2024-05-26T04:20:45");
}

#[tokio::test]
async fn minute_rejects_start_before_one_week() {
    let (status, body) = get(
        seeded().await,
        "/usage/minute?start=2024-05-16T12:00:00&end=2024-05-26T12:00:00",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert!(body["error"].as_str().unwrap().contains("2024-05-19T12:00:00"));
}

#[tokio::test]
async fn minute_rejects_malformed_start() {
    let (status, body) = get(seeded().await, "/usage/minute?start=yesterday&end=2024-05-26T12:00:00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid start"));
}

#[tokio::test]
async fn unparsable_query_string_gets_json_error() {
    let (status, body) = get(
        seeded().await,
        "/usage/minute?start=2024-05-26T04:00:00&start=2024-05-26T05:00:00&end=2024-05-26T06:00:00",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert!(body["error"].as_str().unwrap().starts_with("malformed input"));
}

#[tokio::test]
async fn minute_rejects_missing_end() {
    let (status, body) = get(seeded().await, "/usage/minute?start=2024-05-26T04:00:00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("'end'"));
}

#[tokio::test]
async fn hour_returns_buckets_with_hour_field() {
    let (status, body) = get(seeded().await, "/usage/hour?date=2024-05-26").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["day"], 26);
    assert_eq!(rows[0]["hour"], 4);
    assert_eq!(rows[0]["date"], "2024-05-26");
    assert_eq!(rows[0]["min"], 30.0);
    assert_eq!(rows[0]["max"], 50.0);
    assert_eq!(rows[0]["avg"], 40.0);
    assert_eq!(rows[1]["hour"], 9);
}

#[tokio::test]
async fn hour_rejects_date_before_three_months() {
    let (status, _) = get(seeded().await, "/usage/hour?date=2024-02-25").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = get(seeded().await, "/usage/hour?date=2024-02-26").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Array(vec![]));
}

#[tokio::test]
async fn hour_rejects_malformed_date() {
    let (status, _) = get(seeded().await, "/usage/hour?date=2024-13-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn day_returns_null_hour() {
    let store = Arc::new(MemoryStore::new());
    store.append(at(1, 0, 0) - TimeDelta::days(1), 10.0).await.unwrap();
    store.append(at(23, 59, 59), 20.0).await.unwrap();
    store.append(at(0, 0, 0) + TimeDelta::days(1), 99.0).await.unwrap();

    let (status, body) = get(app_with(store), "/usage/day?start=2024-05-25&end=2024-05-26").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r["hour"].is_null()));
    assert_eq!(rows[0]["day"], 25);
    assert_eq!(rows[1]["day"], 26);
    assert_eq!(rows[1]["max"], 20.0);
}

#[tokio::test]
async fn day_rejects_start_before_one_year() {
    let (status, body) = get(seeded().await, "/usage/day?start=2023-05-25&end=2024-05-26").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("day usage"));
}

#[tokio::test]
async fn storage_failure_is_generic_500() {
    let (status, body) = get(app_with(Arc::new(BrokenStore)), "/usage/hour?date=2024-05-26").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], error::GENERIC_FAILURE);
    assert!(!body.to_string().contains("cpu_samples"));
}

#[tokio::test]
async fn health_reports_sampler_status() {
    let usage = UsageService::new(
        Arc::new(MemoryStore::new()),
        RetentionPolicy::default(),
        Arc::new(FixedClock(now())),
    );
    let (_tx, rx) = watch::channel(SamplerStatus { ticks: 3, failures: 1, ..Default::default() });
    let app = router(AppState { usage, sampler: Some(rx) });

    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["sampler"]["ticks"], 3);
    assert_eq!(body["sampler"]["state"], "idle");
}
