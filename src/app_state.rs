use crate::pipeline::AnalysisService;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub service: AnalysisService,
    pub db_pool: SqlitePool,
}

impl AppState {
    pub fn new(service: AnalysisService, pool: SqlitePool) -> Self {
        Self {
            service,
            db_pool: pool,
        }
    }
}
