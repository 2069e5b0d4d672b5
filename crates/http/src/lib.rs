//! HTTP surface for CPU usage history.
//!
//! - `GET /usage/minute?start=<datetime>&end=<datetime>` raw samples
//! - `GET /usage/hour?date=<date>` hourly min / max / avg
//! - `GET /usage/day?start=<date>&end=<date>` daily min / max / avg
//! - `GET /health` sampler status

pub mod error;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::{NaiveDate, NaiveDateTime};
use cpumon_core::{BucketSummary, MonitorError, Result, Sample, UsageService};
use cpumon_system::SamplerStatus;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::{ApiError, ErrorResponse};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub usage: UsageService,
    pub sampler: Option<watch::Receiver<SamplerStatus>>,
}

/// One aggregated bucket as sent over the wire. `hour` is `null` for daily
/// buckets.
#[derive(Debug, Serialize)]
pub struct SummaryBody {
    pub date: NaiveDate,
    pub day: u32,
    pub hour: Option<u32>,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl From<BucketSummary> for SummaryBody {
    fn from(b: BucketSummary) -> Self {
        Self {
            date: b.key.date(),
            day:  b.key.day(),
            hour: b.key.hour(),
            min:  b.min,
            max:  b.max,
            avg:  b.avg,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    sampler: Option<SamplerStatus>,
}

#[derive(Debug, Deserialize)]
struct RangeParams {
    start: Option<String>,
    end: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DateParams {
    date: Option<String>,
}

/// Build the router with all endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/usage/minute", get(minute_handler))
        .route("/usage/hour", get(hour_handler))
        .route("/usage/day", get(day_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

fn required<'a>(name: &str, value: &'a Option<String>) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| MonitorError::MalformedInput(format!("missing query parameter '{name}'")))
}

fn parse_datetime(name: &str, value: &Option<String>) -> Result<NaiveDateTime> {
    let raw = required(name, value)?;
    raw.parse().map_err(|_| {
        MonitorError::MalformedInput(format!(
            "invalid {name} '{raw}': expected an ISO-8601 date-time such as 2024-05-26T04:20:15"
        ))
    })
}

fn parse_date(name: &str, value: &Option<String>) -> Result<NaiveDate> {
    let raw = required(name, value)?;
    raw.parse().map_err(|_| {
        MonitorError::MalformedInput(format!(
            "invalid {name} '{raw}': expected an ISO-8601 date such as 2024-05-26"
        ))
    })
}

/// GET /usage/minute
async fn minute_handler(
    State(state): State<AppState>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<Vec<Sample>>, ApiError> {
    let Query(params) = params?;
    let start = parse_datetime("start", &params.start)?;
    let end = parse_datetime("end", &params.end)?;
    Ok(Json(state.usage.minute_usage(start, end).await?))
}

/// GET /usage/hour
async fn hour_handler(
    State(state): State<AppState>,
    params: Result<Query<DateParams>, QueryRejection>,
) -> Result<Json<Vec<SummaryBody>>, ApiError> {
    let Query(params) = params?;
    let date = parse_date("date", &params.date)?;
    let buckets = state.usage.hourly_usage(date).await?;
    Ok(Json(buckets.into_iter().map(SummaryBody::from).collect()))
}

/// GET /usage/day
async fn day_handler(
    State(state): State<AppState>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<Vec<SummaryBody>>, ApiError> {
    let Query(params) = params?;
    let start = parse_date("start", &params.start)?;
    let end = parse_date("end", &params.end)?;
    let buckets = state.usage.daily_usage(start, end).await?;
    Ok(Json(buckets.into_iter().map(SummaryBody::from).collect()))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status:  "ok",
        version: env!("CARGO_PKG_VERSION"),
        sampler: state.sampler.as_ref().map(|rx| rx.borrow().clone()),
    })
}

#[cfg(test)]
mod tests;
