use std::sync::Arc;

use config::Config;
use redis::Client as RedisClient;
use sqlx::PgPool;

pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod middleware;
pub mod models;
pub mod result;
pub mod router;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub redis: Arc<RedisClient>,
    /// Outbound client for the identity provider and the hosted auth service.
    pub http: reqwest::Client,
}
