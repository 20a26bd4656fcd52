//! HTTP request handlers.

pub mod cache_stats;
pub mod features;
pub mod health;
