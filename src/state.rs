use std::sync::Arc;

use crate::services::{OverviewService, SummarizerService};

#[derive(Clone)]
pub struct AppState {
    pub overview: Arc<OverviewService>,
    pub summarizer: Arc<SummarizerService>,
}
