//! Shared utilities

pub mod routine;
pub mod time;
