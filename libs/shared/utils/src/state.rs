use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::DocumentStore;

use crate::clock::{Clock, SystemClock};

/// Shared handler state: configuration plus the injected collaborators.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Self {
        let store = shared_database::connect(&config);
        let clock = Arc::new(SystemClock::new(config.clinic.utc_offset));

        Self {
            config: Arc::new(config),
            store,
            clock,
        }
    }

    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            clock,
        }
    }
}
