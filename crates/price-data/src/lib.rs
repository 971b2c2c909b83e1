pub mod fallback;
pub mod synthetic;
pub mod yahoo;

pub use fallback::FallbackPriceSource;
pub use synthetic::SyntheticPriceSource;
pub use yahoo::YahooPriceSource;
