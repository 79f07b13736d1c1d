//! Typed SQLite store for the HealApp health-services platform.
//! Each entity gets one accessor; every accessor shares the query layer in [`query`].

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;

pub use config::{ConfigError, DatabaseConfig, LoggingConfig, QueryLimits, StoreConfig};
pub use db::{
    open_db, open_db_in_memory, open_db_with_config, register_functions, ConstraintKind, DbError,
    DbResult,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::ValidationError;
pub use query::{Direction, Entity, Filter, Page, PageRequest, Sort};
pub use repo::{Accessor, RepoError, RepoResult};

/// Returns the store crate version.
pub fn store_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
