use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Page, RecordFilter, RecordSort, RecordStore, SortOrder};
use crate::errors::AppError;
use crate::models::{NewSentimentRecord, SentimentRecord};

/// In-memory record store implementing the same contract as Postgres.
/// Used by unit and integration tests so the query and aggregation layers
/// can be exercised without a database.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<SentimentRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn compare(a: &SentimentRecord, b: &SentimentRecord, sort: RecordSort) -> Ordering {
    let by_date = match sort.date {
        SortOrder::Asc => a.date.cmp(&b.date),
        SortOrder::Desc => b.date.cmp(&a.date),
    };
    by_date.then_with(|| {
        b.sentiment_score
            .partial_cmp(&a.sentiment_score)
            .unwrap_or(Ordering::Equal)
    })
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create_one(&self, record: NewSentimentRecord) -> Result<SentimentRecord, AppError> {
        if record.sentiment.view.is_none() {
            return Err(AppError::Validation(
                "sentiment.view is required".to_string(),
            ));
        }
        let mut records = self.records.write().await;
        if records
            .iter()
            .any(|r| r.post_id == record.post_id && r.source_type == record.source_type)
        {
            return Err(AppError::DuplicateKey {
                post_id: record.post_id,
                source_type: record.source_type.as_str().to_string(),
            });
        }
        let stored = SentimentRecord {
            id: Uuid::new_v4(),
            post_id: record.post_id,
            date: record.date,
            ticker: record.ticker,
            title: record.title,
            sentiment: record.sentiment,
            source_link: record.source_link,
            source_type: record.source_type,
            sentiment_score: record.sentiment_score,
            created_at: Utc::now(),
        };
        records.push(stored.clone());
        Ok(stored)
    }

    async fn get_many(
        &self,
        filter: &RecordFilter,
        sort: RecordSort,
        page: Page,
    ) -> Result<Vec<SentimentRecord>, AppError> {
        let records = self.records.read().await;
        let mut matching: Vec<SentimentRecord> = records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| compare(a, b, sort));
        Ok(matching
            .into_iter()
            .skip(page.skip() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn count_by_filter(&self, filter: &RecordFilter) -> Result<u64, AppError> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| filter.matches(r)).count() as u64)
    }

    async fn delete_many(&self, filter: &RecordFilter) -> Result<u64, AppError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !filter.matches(r));
        Ok((before - records.len()) as u64)
    }

    async fn get_by_post_id(&self, post_id: &str) -> Result<SentimentRecord, AppError> {
        let records = self.records.read().await;
        records
            .iter()
            .find(|r| r.post_id == post_id)
            .cloned()
            .ok_or(AppError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Sentiment, SentimentView, SourceType};
    use chrono::NaiveDate;

    fn make_record(post_id: &str, ticker: &str, date: (i32, u32, u32), score: f64) -> NewSentimentRecord {
        NewSentimentRecord {
            post_id: post_id.to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            ticker: ticker.to_string(),
            title: format!("post {post_id}"),
            sentiment: Sentiment {
                summary: "summary".to_string(),
                view: Some(SentimentView::Neutral),
                tone: "flat".to_string(),
            },
            source_link: None,
            source_type: SourceType::Reddit,
            sentiment_score: score,
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_post_id_and_type() {
        let store = MemoryRecordStore::new();
        store.create_one(make_record("p1", "AAPL", (2024, 1, 1), 0.5)).await.unwrap();

        let err = store
            .create_one(make_record("p1", "MSFT", (2024, 1, 2), 0.1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey { .. }));

        // Same post_id under a different source type is a distinct record.
        let mut other = make_record("p1", "AAPL", (2024, 1, 1), 0.5);
        other.source_type = SourceType::Google;
        store.create_one(other).await.unwrap();
    }

    #[tokio::test]
    async fn sorts_date_desc_with_score_tiebreak() {
        let store = MemoryRecordStore::new();
        store.create_one(make_record("a", "AAPL", (2024, 1, 1), 0.1)).await.unwrap();
        store.create_one(make_record("b", "AAPL", (2024, 1, 3), 0.2)).await.unwrap();
        store.create_one(make_record("c", "AAPL", (2024, 1, 3), 0.9)).await.unwrap();

        let records = store
            .get_many(
                &RecordFilter::default(),
                RecordSort::default(),
                Page::new(0, 10).unwrap(),
            )
            .await
            .unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.post_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn count_matches_get_many_length() {
        let store = MemoryRecordStore::new();
        for i in 0..7 {
            store
                .create_one(make_record(&format!("p{i}"), "TSLA", (2024, 2, 1 + i as u32), 0.0))
                .await
                .unwrap();
        }
        store.create_one(make_record("x", "AAPL", (2024, 2, 1), 0.0)).await.unwrap();

        let filter = RecordFilter {
            ticker: Some("TSLA".to_string()),
            ..Default::default()
        };
        let count = store.count_by_filter(&filter).await.unwrap();
        let records = store
            .get_many(&filter, RecordSort::default(), Page::new(0, count as u32).unwrap())
            .await
            .unwrap();
        assert_eq!(count as usize, records.len());
    }

    #[tokio::test]
    async fn pagination_skips_and_limits() {
        let store = MemoryRecordStore::new();
        for i in 0..5 {
            store
                .create_one(make_record(&format!("p{i}"), "NVDA", (2024, 3, 1 + i as u32), 0.0))
                .await
                .unwrap();
        }
        let page = store
            .get_many(
                &RecordFilter::default(),
                RecordSort::default(),
                Page::new(2, 2).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        // Desc by date: p4, p3, [p2, p1], p0
        assert_eq!(page[0].post_id, "p2");
        assert_eq!(page[1].post_id, "p1");
    }

    #[tokio::test]
    async fn delete_many_returns_removed_count() {
        let store = MemoryRecordStore::new();
        store.create_one(make_record("a", "AAPL", (2024, 1, 1), 0.0)).await.unwrap();
        store.create_one(make_record("b", "AAPL", (2024, 1, 5), 0.0)).await.unwrap();
        store.create_one(make_record("c", "MSFT", (2024, 1, 5), 0.0)).await.unwrap();

        let deleted = store
            .delete_many(&RecordFilter {
                ticker: Some("AAPL".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.count_by_filter(&RecordFilter::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_post_id_is_not_found() {
        let store = MemoryRecordStore::new();
        let err = store.get_by_post_id("ghost").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }
}
