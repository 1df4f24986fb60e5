use shared_config::AppConfig;
use shared_database::Database;

/// Shared application state handed to every router. The store handle is
/// opened once at process start; no ambient global.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database) -> Self {
        Self { config, db }
    }
}
