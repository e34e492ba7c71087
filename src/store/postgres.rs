use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::Postgres;
use sqlx::{PgPool, QueryBuilder};
use tracing::{error, info};
use uuid::Uuid;

use super::{Page, RecordFilter, RecordSort, RecordStore, SortOrder};
use crate::errors::AppError;
use crate::models::{NewSentimentRecord, Sentiment, SentimentRecord, SentimentView, SourceType};

const COLUMNS: &str = "id, post_id, date, ticker, title, sentiment_summary, sentiment_view, \
                       sentiment_tone, source_link, source_type, sentiment_score, created_at";

/// Postgres-backed record store. One row per record, sentiment fields
/// flattened into columns, `(post_id, source_type)` unique.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: Uuid,
    post_id: String,
    date: NaiveDate,
    ticker: String,
    title: String,
    sentiment_summary: String,
    sentiment_view: String,
    sentiment_tone: String,
    source_link: Option<String>,
    source_type: String,
    sentiment_score: f64,
    created_at: DateTime<Utc>,
}

impl From<RecordRow> for SentimentRecord {
    fn from(row: RecordRow) -> Self {
        SentimentRecord {
            id: row.id,
            post_id: row.post_id,
            date: row.date,
            ticker: row.ticker,
            title: row.title,
            sentiment: Sentiment {
                summary: row.sentiment_summary,
                // An unrecognized stored value surfaces as unclassified
                // downstream instead of failing the read.
                view: SentimentView::parse(&row.sentiment_view),
                tone: row.sentiment_tone,
            },
            source_link: row.source_link,
            source_type: SourceType::from(row.source_type),
            sentiment_score: row.sentiment_score,
            created_at: row.created_at,
        }
    }
}

/// Starts a query with the given head and appends the filter as a
/// conjunctive WHERE clause. All binds are owned so the builder is 'static.
fn filtered(head: &str, filter: &RecordFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(head);
    qb.push(" WHERE TRUE");
    if let Some(ticker) = &filter.ticker {
        qb.push(" AND ticker = ").push_bind(ticker.clone());
    }
    if let Some(date) = filter.date {
        qb.push(" AND date = ").push_bind(date);
    }
    if let Some(from) = filter.date_from {
        qb.push(" AND date >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        qb.push(" AND date <= ").push_bind(to);
    }
    if let Some(view) = filter.view {
        qb.push(" AND sentiment_view = ").push_bind(view.as_str());
    }
    if let Some(source_type) = &filter.source_type {
        qb.push(" AND source_type = ")
            .push_bind(source_type.as_str().to_string());
    }
    if let Some(min) = filter.min_score {
        qb.push(" AND sentiment_score >= ").push_bind(min);
    }
    if let Some(post_id) = &filter.post_id {
        qb.push(" AND post_id = ").push_bind(post_id.clone());
    }
    qb
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn create_one(&self, record: NewSentimentRecord) -> Result<SentimentRecord, AppError> {
        let view = record
            .sentiment
            .view
            .ok_or_else(|| AppError::Validation("sentiment.view is required".to_string()))?;

        let id = Uuid::new_v4();
        let result = sqlx::query_as::<_, RecordRow>(
            "INSERT INTO sentiment_records \
             (id, post_id, date, ticker, title, sentiment_summary, sentiment_view, \
              sentiment_tone, source_link, source_type, sentiment_score) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING id, post_id, date, ticker, title, sentiment_summary, sentiment_view, \
                       sentiment_tone, source_link, source_type, sentiment_score, created_at",
        )
        .bind(id)
        .bind(&record.post_id)
        .bind(record.date)
        .bind(&record.ticker)
        .bind(&record.title)
        .bind(&record.sentiment.summary)
        .bind(view.as_str())
        .bind(&record.sentiment.tone)
        .bind(&record.source_link)
        .bind(record.source_type.as_str())
        .bind(record.sentiment_score)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => {
                info!("Created sentiment record {} for ticker {}", record.post_id, record.ticker);
                Ok(row.into())
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(AppError::DuplicateKey {
                    post_id: record.post_id,
                    source_type: record.source_type.as_str().to_string(),
                })
            }
            Err(e) => {
                error!("Failed to insert sentiment record {}: {}", record.post_id, e);
                Err(e.into())
            }
        }
    }

    async fn get_many(
        &self,
        filter: &RecordFilter,
        sort: RecordSort,
        page: Page,
    ) -> Result<Vec<SentimentRecord>, AppError> {
        let mut qb = filtered(
            &format!("SELECT {COLUMNS} FROM sentiment_records"),
            filter,
        );
        let direction = match sort.date {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        qb.push(format!(
            " ORDER BY date {direction}, sentiment_score DESC"
        ));
        qb.push(" OFFSET ").push_bind(page.skip() as i64);
        qb.push(" LIMIT ").push_bind(page.limit() as i64);

        let rows = qb
            .build_query_as::<RecordRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(SentimentRecord::from).collect())
    }

    async fn count_by_filter(&self, filter: &RecordFilter) -> Result<u64, AppError> {
        let mut qb = filtered("SELECT COUNT(*) FROM sentiment_records", filter);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    async fn delete_many(&self, filter: &RecordFilter) -> Result<u64, AppError> {
        let mut qb = filtered("DELETE FROM sentiment_records", filter);
        let result = qb.build().execute(&self.pool).await?;
        info!("Deleted {} sentiment records", result.rows_affected());
        Ok(result.rows_affected())
    }

    async fn get_by_post_id(&self, post_id: &str) -> Result<SentimentRecord, AppError> {
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {COLUMNS} FROM sentiment_records \
             WHERE post_id = $1 \
             ORDER BY date DESC, sentiment_score DESC \
             LIMIT 1"
        ))
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SentimentRecord::from).ok_or(AppError::NotFound)
    }
}
