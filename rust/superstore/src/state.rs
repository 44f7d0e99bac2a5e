use crate::{config::AppConfig, reports::ReportEngine};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub reports: ReportEngine,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, reports: ReportEngine) -> Self {
        Self { config, reports }
    }
}
