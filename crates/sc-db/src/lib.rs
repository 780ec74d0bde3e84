//! sc-db: job bookkeeping persistence.
//!
//! SQLite-backed storage with connection pooling, embedded migrations, and
//! the job queries the download path reads finished assemblies through.
//! Writers exist so the bookkeeping side (and tests) can record jobs.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
