//! In-memory adapters for development and tests.

mod profile_store;

pub use profile_store::InMemoryProfileStore;
