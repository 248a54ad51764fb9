use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::Database;

use crate::clock::{Clock, SystemClock};

/// State shared by every router in the service.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: Arc<Database>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(config: AppConfig, db: Arc<Database>) -> Self {
        Self::with_clock(config, db, Arc::new(SystemClock))
    }

    pub fn with_clock(config: AppConfig, db: Arc<Database>, clock: Arc<dyn Clock>) -> Self {
        Self { config, db, clock }
    }
}
