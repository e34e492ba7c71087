mod memory;
mod postgres;

pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::AppError;
use crate::models::{NewSentimentRecord, SentimentRecord, SentimentView, SourceType};

/// Hard cap on a single page of results.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Conjunctive filter over record fields. Unset fields match everything;
/// date bounds are inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub ticker: Option<String>,
    pub date: Option<NaiveDate>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub view: Option<SentimentView>,
    pub source_type: Option<SourceType>,
    pub min_score: Option<f64>,
    pub post_id: Option<String>,
}

impl RecordFilter {
    /// In-memory predicate. `PgRecordStore` mirrors this in SQL.
    pub fn matches(&self, record: &SentimentRecord) -> bool {
        if let Some(ticker) = &self.ticker {
            if &record.ticker != ticker {
                return false;
            }
        }
        if let Some(date) = self.date {
            if record.date != date {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if record.date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if record.date > to {
                return false;
            }
        }
        if let Some(view) = self.view {
            if record.sentiment.view != Some(view) {
                return false;
            }
        }
        if let Some(source_type) = &self.source_type {
            if &record.source_type != source_type {
                return false;
            }
        }
        if let Some(min) = self.min_score {
            if record.sentiment_score < min {
                return false;
            }
        }
        if let Some(post_id) = &self.post_id {
            if &record.post_id != post_id {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Sort specification: primary key is `date` in the given order,
/// `sentiment_score` descending breaks ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordSort {
    pub date: SortOrder,
}

/// Validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    skip: u64,
    limit: u32,
}

impl Page {
    pub fn new(skip: u64, limit: u32) -> Result<Self, AppError> {
        if limit == 0 {
            return Err(AppError::Validation(
                "limit must be a positive integer".to_string(),
            ));
        }
        Ok(Self {
            skip,
            limit: limit.min(MAX_PAGE_SIZE),
        })
    }

    pub fn skip(&self) -> u64 {
        self.skip
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

/// Durable keyed storage of sentiment records.
///
/// The store performs no retries: connectivity failures surface as
/// `StorageUnavailable` and retry policy stays with the caller.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts one record. Rejects an existing `(post_id, type)` pair
    /// with `DuplicateKey`.
    async fn create_one(&self, record: NewSentimentRecord) -> Result<SentimentRecord, AppError>;

    /// Ordered, paginated retrieval. A zero-match query is `Ok(vec![])`,
    /// never an error.
    async fn get_many(
        &self,
        filter: &RecordFilter,
        sort: RecordSort,
        page: Page,
    ) -> Result<Vec<SentimentRecord>, AppError>;

    /// Count of matching records without materializing them.
    async fn count_by_filter(&self, filter: &RecordFilter) -> Result<u64, AppError>;

    /// Bulk delete, returns number removed. Per-record durability only.
    async fn delete_many(&self, filter: &RecordFilter) -> Result<u64, AppError>;

    /// Point lookup by post_id; `NotFound` when absent.
    async fn get_by_post_id(&self, post_id: &str) -> Result<SentimentRecord, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Sentiment, SentimentRecord};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn page_rejects_zero_limit_and_caps_large_ones() {
        assert!(Page::new(0, 0).is_err());
        let page = Page::new(10, 100).unwrap();
        assert_eq!((page.skip(), page.limit()), (10, 100));
        let capped = Page::new(0, 10_000).unwrap();
        assert_eq!(capped.limit(), MAX_PAGE_SIZE);
    }

    fn record(ticker: &str, date: NaiveDate, score: f64) -> SentimentRecord {
        SentimentRecord {
            id: Uuid::new_v4(),
            post_id: Uuid::new_v4().to_string(),
            date,
            ticker: ticker.to_string(),
            title: "t".to_string(),
            sentiment: Sentiment {
                summary: "s".to_string(),
                view: Some(SentimentView::Neutral),
                tone: "t".to_string(),
            },
            source_link: None,
            source_type: SourceType::Google,
            sentiment_score: score,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn filter_is_conjunctive_over_set_fields() {
        let r = record("AAPL", NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(), 0.6);

        assert!(RecordFilter::default().matches(&r));
        assert!(RecordFilter {
            ticker: Some("AAPL".to_string()),
            date_from: NaiveDate::from_ymd_opt(2024, 5, 1),
            date_to: NaiveDate::from_ymd_opt(2024, 5, 2),
            min_score: Some(0.5),
            ..Default::default()
        }
        .matches(&r));
        assert!(!RecordFilter {
            ticker: Some("AAPL".to_string()),
            view: Some(SentimentView::Positive),
            ..Default::default()
        }
        .matches(&r));
        assert!(!RecordFilter {
            date_to: NaiveDate::from_ymd_opt(2024, 5, 1),
            ..Default::default()
        }
        .matches(&r));
    }
}
