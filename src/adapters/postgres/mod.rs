//! PostgreSQL adapters.

mod pool;
mod profile_store;

pub use pool::{connect, run_migrations};
pub use profile_store::PostgresProfileStore;
