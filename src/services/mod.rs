pub mod aggregation;
pub mod overview_service;
pub mod summarizer;

pub use overview_service::OverviewService;
pub use summarizer::SummarizerService;
