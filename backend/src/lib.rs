pub mod models;
pub mod store;
pub mod matching;
pub mod lifecycle;
pub mod services;
pub mod handlers;
pub mod utils;
pub mod constants;
pub mod error;

#[cfg(test)]
pub mod test_helpers;

pub use utils::config::Config;
pub use error::EngineError;
pub use store::postgres::{DatabaseConfig, get_db_pool};

// Re-export common types
pub use sqlx::PgPool;
pub use anyhow::Result;
pub use uuid::Uuid;
pub use chrono::{DateTime, Utc};
