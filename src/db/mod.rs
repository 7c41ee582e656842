//! Database access layer

pub mod connection;
pub mod repositories;

pub use connection::{connect, run_migrations};
