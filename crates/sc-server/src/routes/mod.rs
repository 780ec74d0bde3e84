//! Route handlers.

pub mod download;
pub mod health;
