use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::db::UserRepository;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub users: UserRepository,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            pool,
            config,
        }
    }
}
