mod record;

pub use record::{
    NewSentimentRecord, Sentiment, SentimentRecord, SentimentView, SourceType,
};
