pub mod metrics;
pub mod mistakes;
pub mod sizing;
