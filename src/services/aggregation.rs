use serde::Serialize;
use std::collections::HashSet;

use crate::models::{SentimentRecord, SentimentView};

/// Count of records per sentiment view for a batch.
///
/// Records whose view did not survive the read path as a valid
/// classification are reported as `unclassified`, never folded into
/// neutral. `positive + neutral + negative + unclassified == total` holds
/// for every input including the empty batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentTally {
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
    pub unclassified: u64,
    pub total: u64,
}

pub fn tally(records: &[SentimentRecord]) -> SentimentTally {
    let mut out = SentimentTally::default();
    for record in records {
        match record.sentiment.view {
            Some(SentimentView::Positive) => out.positive += 1,
            Some(SentimentView::Neutral) => out.neutral += 1,
            Some(SentimentView::Negative) => out.negative += 1,
            None => out.unclassified += 1,
        }
        out.total += 1;
    }
    out
}

/// Flattens a batch into the text handed to the summarizer: one
/// `"{title}: {summary}"` line per record, input order preserved.
pub fn build_corpus(records: &[SentimentRecord]) -> String {
    records
        .iter()
        .map(|r| format!("{}: {}", r.title, r.sentiment.summary))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLink {
    pub title: String,
    pub url: String,
}

/// Ordered `(title, url)` pairs for records carrying both a non-empty
/// title and a source link. Identical pairs are deduplicated, first
/// occurrence wins.
pub fn collect_source_links(records: &[SentimentRecord]) -> Vec<SourceLink> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut out = Vec::new();
    for record in records {
        let url = match &record.source_link {
            Some(url) if !url.is_empty() => url,
            _ => continue,
        };
        if record.title.is_empty() {
            continue;
        }
        if seen.insert((record.title.clone(), url.clone())) {
            out.push(SourceLink {
                title: record.title.clone(),
                url: url.clone(),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Sentiment, SourceType};
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn record(title: &str, summary: &str, view: Option<SentimentView>, link: Option<&str>) -> SentimentRecord {
        SentimentRecord {
            id: Uuid::new_v4(),
            post_id: Uuid::new_v4().to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            ticker: "AAPL".to_string(),
            title: title.to_string(),
            sentiment: Sentiment {
                summary: summary.to_string(),
                view,
                tone: "measured".to_string(),
            },
            source_link: link.map(str::to_string),
            source_type: SourceType::Reddit,
            sentiment_score: 0.0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn tally_counts_each_view_bucket() {
        let records = vec![
            record("a", "s", Some(SentimentView::Positive), None),
            record("b", "s", Some(SentimentView::Positive), None),
            record("c", "s", Some(SentimentView::Negative), None),
        ];
        assert_eq!(
            tally(&records),
            SentimentTally {
                positive: 2,
                neutral: 0,
                negative: 1,
                unclassified: 0,
                total: 3,
            }
        );
    }

    #[test]
    fn tally_reports_unclassified_separately() {
        let records = vec![
            record("a", "s", Some(SentimentView::Neutral), None),
            record("b", "s", None, None),
            record("c", "s", None, None),
        ];
        let t = tally(&records);
        assert_eq!(t.neutral, 1);
        assert_eq!(t.unclassified, 2);
        assert_eq!(t.positive + t.neutral + t.negative + t.unclassified, t.total);
        assert_eq!(t.total, 3);
    }

    #[test]
    fn tally_of_empty_batch_is_all_zero() {
        assert_eq!(tally(&[]), SentimentTally::default());
    }

    #[test]
    fn corpus_has_one_line_per_record_in_input_order() {
        let records = vec![
            record("First", "went up", Some(SentimentView::Positive), None),
            record("Second", "", Some(SentimentView::Neutral), None),
            record("Third", "went down", Some(SentimentView::Negative), None),
        ];
        let corpus = build_corpus(&records);
        let lines: Vec<&str> = corpus.split('\n').collect();
        assert_eq!(lines.len(), records.len());
        assert_eq!(lines[0], "First: went up");
        assert_eq!(lines[1], "Second: ");
        assert_eq!(lines[2], "Third: went down");
    }

    #[test]
    fn corpus_of_empty_batch_is_empty_string() {
        assert_eq!(build_corpus(&[]), "");
    }

    #[test]
    fn source_links_drop_empty_titles_and_dedup_pairs() {
        let records = vec![
            record("A", "s", None, Some("u1")),
            record("", "s", None, Some("u2")),
            record("A", "s", None, Some("u1")),
        ];
        let links = collect_source_links(&records);
        assert_eq!(
            links,
            vec![SourceLink {
                title: "A".to_string(),
                url: "u1".to_string()
            }]
        );
    }

    #[test]
    fn source_links_preserve_input_order() {
        let records = vec![
            record("B", "s", None, Some("u2")),
            record("A", "s", None, Some("u1")),
            record("A", "s", None, None),
        ];
        let links = collect_source_links(&records);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].title, "B");
        assert_eq!(links[1].title, "A");
    }
}
