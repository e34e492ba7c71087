use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::services::aggregation;
use crate::state::AppState;

fn default_limit() -> u32 {
    100
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub text: String,
}

/// GET /api/ai/ticker/:ticker/summary
///
/// Fetches recent records for the ticker, tallies sentiment, flattens the
/// batch into a corpus and forwards it to the summarizer. The tally and
/// source links are computed locally; only the narrative comes from the
/// external endpoint.
async fn ticker_summary(
    Path(ticker): Path<String>,
    Query(params): Query<SummaryParams>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    info!("Generating sentiment summary for ticker: {}", ticker);

    let records = state.overview.by_ticker(&ticker, 0, params.limit).await?;
    if records.is_empty() {
        return Err(AppError::Validation(format!(
            "No sentiment records found for ticker {}",
            ticker.trim().to_uppercase()
        )));
    }

    let tally = aggregation::tally(&records);
    let corpus = aggregation::build_corpus(&records);
    let source_links = aggregation::collect_source_links(&records);
    let analysis = state.summarizer.analyze(&corpus).await?;

    info!(
        "Summarized {} records for {}: +{} ={} -{}",
        tally.total,
        ticker,
        tally.positive,
        tally.neutral,
        tally.negative
    );

    Ok(Json(serde_json::json!({
        "ticker": ticker.trim().to_uppercase(),
        "tally": tally,
        "analysis": analysis,
        "source_links": source_links,
        "records_analyzed": records.len(),
    })))
}

/// POST /api/ai/summarize - free-form text summary
async fn summarize(
    State(state): State<AppState>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::Validation("text is required".to_string()));
    }
    let summary = state.summarizer.summarize(&request.text).await?;
    Ok(Json(serde_json::json!({ "summary": summary })))
}

/// GET /api/ai/status
async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "AI",
        "configured": state.summarizer.is_enabled(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ticker/:ticker/summary", get(ticker_summary))
        .route("/summarize", post(summarize))
        .route("/status", get(status))
}
