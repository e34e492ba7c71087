use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

use crate::errors::AppError;
use crate::models::{NewSentimentRecord, SentimentRecord, SentimentView, SourceType};
use crate::store::{Page, RecordFilter, RecordSort, RecordStore};

/// Domain query layer over the record store.
///
/// Translates query intents (by ticker, by date range, by sentiment, by
/// source type) into filter + sort + paginate calls, validating arguments
/// before anything reaches storage. Holds an injected store so tests run
/// against the in-memory implementation.
pub struct OverviewService {
    store: Arc<dyn RecordStore>,
}

/// Parses an ISO 8601 calendar date, failing with `InvalidDate` before
/// any storage call.
pub fn parse_date(input: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidDate(input.to_string()))
}

fn normalize_ticker(ticker: &str) -> Result<String, AppError> {
    let trimmed = ticker.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("ticker is required".to_string()));
    }
    Ok(trimmed.to_uppercase())
}

fn date_range(start: &str, end: &str) -> Result<(NaiveDate, NaiveDate), AppError> {
    let start_date = parse_date(start)?;
    let end_date = parse_date(end)?;
    if start_date > end_date {
        return Err(AppError::InvalidRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok((start_date, end_date))
}

impl OverviewService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Validates and stores one record. Duplicate `(post_id, type)` pairs
    /// are rejected rather than overwritten.
    pub async fn create(&self, mut input: NewSentimentRecord) -> Result<SentimentRecord, AppError> {
        if input.post_id.trim().is_empty() {
            return Err(AppError::Validation("post_id is required".to_string()));
        }
        if input.title.trim().is_empty() {
            return Err(AppError::Validation("title is required".to_string()));
        }
        if input.source_type.as_str().is_empty() {
            return Err(AppError::Validation("type is required".to_string()));
        }
        if input.sentiment.view.is_none() {
            return Err(AppError::Validation(
                "sentiment.view must be one of: positive, neutral, negative".to_string(),
            ));
        }
        input.ticker = normalize_ticker(&input.ticker)?;

        let record = self.store.create_one(input).await?;
        info!(
            "Created overview record {} for ticker {}",
            record.post_id, record.ticker
        );
        Ok(record)
    }

    /// Records for one ticker, newest first.
    pub async fn by_ticker(
        &self,
        ticker: &str,
        skip: u64,
        limit: u32,
    ) -> Result<Vec<SentimentRecord>, AppError> {
        let filter = RecordFilter {
            ticker: Some(normalize_ticker(ticker)?),
            ..Default::default()
        };
        self.store
            .get_many(&filter, RecordSort::default(), Page::new(skip, limit)?)
            .await
    }

    /// Records for one ticker on an exact date.
    pub async fn by_ticker_and_date(
        &self,
        ticker: &str,
        date: &str,
        skip: u64,
        limit: u32,
    ) -> Result<Vec<SentimentRecord>, AppError> {
        let filter = RecordFilter {
            ticker: Some(normalize_ticker(ticker)?),
            date: Some(parse_date(date)?),
            ..Default::default()
        };
        self.store
            .get_many(&filter, RecordSort::default(), Page::new(skip, limit)?)
            .await
    }

    /// Records within an inclusive date range, optionally scoped to a ticker.
    pub async fn by_date_range(
        &self,
        start: &str,
        end: &str,
        ticker: Option<&str>,
        skip: u64,
        limit: u32,
    ) -> Result<Vec<SentimentRecord>, AppError> {
        let (start_date, end_date) = date_range(start, end)?;
        let filter = RecordFilter {
            ticker: ticker.map(normalize_ticker).transpose()?,
            date_from: Some(start_date),
            date_to: Some(end_date),
            ..Default::default()
        };
        self.store
            .get_many(&filter, RecordSort::default(), Page::new(skip, limit)?)
            .await
    }

    pub async fn by_sentiment(
        &self,
        view: SentimentView,
        ticker: Option<&str>,
        skip: u64,
        limit: u32,
    ) -> Result<Vec<SentimentRecord>, AppError> {
        let filter = RecordFilter {
            ticker: ticker.map(normalize_ticker).transpose()?,
            view: Some(view),
            ..Default::default()
        };
        self.store
            .get_many(&filter, RecordSort::default(), Page::new(skip, limit)?)
            .await
    }

    pub async fn by_source_type(
        &self,
        source_type: SourceType,
        ticker: Option<&str>,
        skip: u64,
        limit: u32,
    ) -> Result<Vec<SentimentRecord>, AppError> {
        if source_type.as_str().trim().is_empty() {
            return Err(AppError::Validation("type is required".to_string()));
        }
        let filter = RecordFilter {
            ticker: ticker.map(normalize_ticker).transpose()?,
            source_type: Some(source_type),
            ..Default::default()
        };
        self.store
            .get_many(&filter, RecordSort::default(), Page::new(skip, limit)?)
            .await
    }

    pub async fn get_by_post_id(&self, post_id: &str) -> Result<SentimentRecord, AppError> {
        if post_id.trim().is_empty() {
            return Err(AppError::Validation("post_id is required".to_string()));
        }
        self.store.get_by_post_id(post_id).await
    }

    pub async fn count_by_ticker(&self, ticker: &str) -> Result<u64, AppError> {
        let filter = RecordFilter {
            ticker: Some(normalize_ticker(ticker)?),
            ..Default::default()
        };
        self.store.count_by_filter(&filter).await
    }

    /// Removes every record for a ticker; returns the number deleted.
    pub async fn delete_by_ticker(&self, ticker: &str) -> Result<u64, AppError> {
        let filter = RecordFilter {
            ticker: Some(normalize_ticker(ticker)?),
            ..Default::default()
        };
        let deleted = self.store.delete_many(&filter).await?;
        info!("Deleted {} records for ticker filter", deleted);
        Ok(deleted)
    }

    /// Retention cleanup: removes records within an inclusive date range.
    pub async fn delete_by_date_range(&self, start: &str, end: &str) -> Result<u64, AppError> {
        let (start_date, end_date) = date_range(start, end)?;
        let filter = RecordFilter {
            date_from: Some(start_date),
            date_to: Some(end_date),
            ..Default::default()
        };
        self.store.delete_many(&filter).await
    }
}
