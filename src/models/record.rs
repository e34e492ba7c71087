use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Three-way sentiment classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SentimentView {
    Positive,
    Neutral,
    Negative,
}

impl SentimentView {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(SentimentView::Positive),
            "neutral" => Some(SentimentView::Neutral),
            "negative" => Some(SentimentView::Negative),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentView::Positive => "positive",
            SentimentView::Neutral => "neutral",
            SentimentView::Negative => "negative",
        }
    }
}

impl fmt::Display for SentimentView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source/category of a record. Open set: unknown sources round-trip
/// through `Other` instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum SourceType {
    Reddit,
    Google,
    Other(String),
}

impl SourceType {
    pub fn as_str(&self) -> &str {
        match self {
            SourceType::Reddit => "reddit",
            SourceType::Google => "google",
            SourceType::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for SourceType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "reddit" => SourceType::Reddit,
            "google" => SourceType::Google,
            _ => SourceType::Other(s),
        }
    }
}

impl From<SourceType> for String {
    fn from(t: SourceType) -> String {
        t.as_str().to_string()
    }
}

impl From<&str> for SourceType {
    fn from(s: &str) -> Self {
        SourceType::from(s.to_string())
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured sentiment judgment attached to a record.
///
/// `view` is lenient on the read path: a missing or unrecognized stored value
/// becomes `None` so old or dirty rows surface as unclassified in tallies
/// instead of breaking reads. Ingestion rejects `None` before anything is
/// written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sentiment {
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_view")]
    pub view: Option<SentimentView>,
    pub tone: String,
}

fn lenient_view<'de, D>(deserializer: D) -> Result<Option<SentimentView>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(SentimentView::parse))
}

/// One analyzed post/article with its sentiment judgment.
///
/// `(post_id, type)` uniquely identifies a record; `date` is a calendar date
/// without time-of-day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentRecord {
    pub id: Uuid,
    pub post_id: String,
    pub date: NaiveDate,
    pub ticker: String,
    pub title: String,
    pub sentiment: Sentiment,
    pub source_link: Option<String>,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub sentiment_score: f64,
    pub created_at: DateTime<Utc>,
}

/// Ingestion payload: a record before the store assigns id and created_at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewSentimentRecord {
    pub post_id: String,
    pub date: NaiveDate,
    pub ticker: String,
    pub title: String,
    pub sentiment: Sentiment,
    #[serde(default)]
    pub source_link: Option<String>,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    #[serde(default)]
    pub sentiment_score: f64,
}
