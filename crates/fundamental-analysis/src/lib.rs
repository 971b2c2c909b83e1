pub mod benchmarks;
mod narrative;
pub mod scoring;

pub use benchmarks::*;
pub use narrative::MOMENTUM_UNAVAILABLE;
pub use scoring::*;
