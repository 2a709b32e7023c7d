//! Data store modules for player records

pub mod stats;

pub use stats::StatsStore;
