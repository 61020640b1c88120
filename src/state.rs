use crate::db::DbConn;

/// Application state containing all shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DbConn,
}

impl AppState {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}
