use std::sync::Arc;

use crate::db::Database;
use crate::error::Fault;
use crate::jsonapi::Formatter;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub jsonapi: Arc<Formatter>,
}

impl AppState {
    pub fn new(db: Database, formatter: Formatter) -> Self {
        AppState {
            db: Arc::new(db),
            jsonapi: Arc::new(formatter),
        }
    }
}

pub async fn not_found() -> Fault {
    Fault::not_found()
}
