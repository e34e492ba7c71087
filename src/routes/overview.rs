use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::{NewSentimentRecord, SentimentRecord, SentimentView, SourceType};
use crate::state::AppState;

fn default_limit() -> u32 {
    100
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct ScopedPageParams {
    pub ticker: Option<String>,
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub ticker: String,
    pub date: String,
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct SearchRangeRequest {
    pub ticker: Option<String>,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRangeRequest {
    pub start_date: String,
    pub end_date: String,
}

/// POST /api/overview/records
async fn create_record(
    State(state): State<AppState>,
    Json(input): Json<NewSentimentRecord>,
) -> Result<(StatusCode, Json<SentimentRecord>), AppError> {
    let record = state.overview.create(input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/overview/records/:post_id
async fn get_record(
    Path(post_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SentimentRecord>, AppError> {
    let record = state.overview.get_by_post_id(&post_id).await?;
    Ok(Json(record))
}

/// POST /api/overview/search - records for a ticker on an exact date
async fn search_records(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let records = state
        .overview
        .by_ticker_and_date(&request.ticker, &request.date, request.skip, request.limit)
        .await?;
    Ok(Json(serde_json::json!({
        "ticker": request.ticker.trim().to_uppercase(),
        "date": request.date,
        "count": records.len(),
        "records": records,
    })))
}

/// POST /api/overview/search/range - records within an inclusive date range
async fn search_records_by_range(
    State(state): State<AppState>,
    Json(request): Json<SearchRangeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let records = state
        .overview
        .by_date_range(
            &request.start_date,
            &request.end_date,
            request.ticker.as_deref(),
            request.skip,
            request.limit,
        )
        .await?;
    Ok(Json(serde_json::json!({
        "ticker": request.ticker.map(|t| t.trim().to_uppercase()),
        "start_date": request.start_date,
        "end_date": request.end_date,
        "count": records.len(),
        "records": records,
    })))
}

/// GET /api/overview/ticker/:ticker
async fn get_by_ticker(
    Path(ticker): Path<String>,
    Query(params): Query<PageParams>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    info!("Fetching overview records for ticker: {}", ticker);
    let records = state
        .overview
        .by_ticker(&ticker, params.skip, params.limit)
        .await?;
    let total = state.overview.count_by_ticker(&ticker).await?;
    Ok(Json(serde_json::json!({
        "ticker": ticker.trim().to_uppercase(),
        "count": records.len(),
        "total": total,
        "records": records,
    })))
}

/// GET /api/overview/ticker/:ticker/count
async fn count_by_ticker(
    Path(ticker): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let total = state.overview.count_by_ticker(&ticker).await?;
    Ok(Json(serde_json::json!({
        "ticker": ticker.trim().to_uppercase(),
        "total": total,
    })))
}

/// GET /api/overview/sentiment/:view?ticker=...
async fn get_by_sentiment(
    Path(view): Path<String>,
    Query(params): Query<ScopedPageParams>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let view = SentimentView::parse(&view).ok_or_else(|| {
        AppError::Validation(
            "sentiment view must be one of: positive, neutral, negative".to_string(),
        )
    })?;
    let records = state
        .overview
        .by_sentiment(view, params.ticker.as_deref(), params.skip, params.limit)
        .await?;
    Ok(Json(serde_json::json!({
        "view": view,
        "count": records.len(),
        "records": records,
    })))
}

/// GET /api/overview/source/:type?ticker=...
async fn get_by_source_type(
    Path(source_type): Path<String>,
    Query(params): Query<ScopedPageParams>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let source_type = SourceType::from(source_type);
    let records = state
        .overview
        .by_source_type(
            source_type.clone(),
            params.ticker.as_deref(),
            params.skip,
            params.limit,
        )
        .await?;
    Ok(Json(serde_json::json!({
        "type": source_type,
        "count": records.len(),
        "records": records,
    })))
}

/// DELETE /api/overview/ticker/:ticker
async fn delete_by_ticker(
    Path(ticker): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = state.overview.delete_by_ticker(&ticker).await?;
    info!("Deleted {} records for ticker {}", deleted, ticker);
    Ok(Json(serde_json::json!({
        "ticker": ticker.trim().to_uppercase(),
        "deleted": deleted,
    })))
}

/// DELETE /api/overview/range
async fn delete_by_range(
    State(state): State<AppState>,
    Json(request): Json<DeleteRangeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = state
        .overview
        .delete_by_date_range(&request.start_date, &request.end_date)
        .await?;
    Ok(Json(serde_json::json!({
        "start_date": request.start_date,
        "end_date": request.end_date,
        "deleted": deleted,
    })))
}

/// GET /api/overview/status
async fn status() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "Overview",
        "status": "available",
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/records", post(create_record))
        .route("/records/:post_id", get(get_record))
        .route("/search", post(search_records))
        .route("/search/range", post(search_records_by_range))
        .route("/ticker/:ticker", get(get_by_ticker).delete(delete_by_ticker))
        .route("/ticker/:ticker/count", get(count_by_ticker))
        .route("/sentiment/:view", get(get_by_sentiment))
        .route("/source/:source_type", get(get_by_source_type))
        .route("/range", delete(delete_by_range))
        .route("/status", get(status))
}
