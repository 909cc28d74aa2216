pub mod models;
pub mod queries;
pub mod store;

pub use store::PgStore;

/// Schema migrations under `crates/db/migrations`, embedded at build time.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();
