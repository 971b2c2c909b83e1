pub mod models;
pub mod tracker;

#[cfg(test)]
mod tracker_tests;

pub use models::*;
pub use tracker::ScoreHistoryTracker;
