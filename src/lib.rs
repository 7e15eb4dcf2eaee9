pub mod ai;
pub mod analytics;
pub mod config;
pub mod core;
pub mod error;
pub mod export;
pub mod journal;
pub mod models;
pub mod store;
#[cfg(test)]
pub mod test_helpers;
