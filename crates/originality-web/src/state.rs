use std::sync::Arc;

use originality_core::{AnalysisStore, Config, Pipeline};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub store: Arc<dyn AnalysisStore>,
    pub pipeline: Pipeline,
    pub config: Config,
}
