pub mod indicators;
pub mod momentum;

#[cfg(test)]
mod indicators_tests;

pub use indicators::*;
pub use momentum::*;
