pub mod adaptive;
pub mod error;
pub mod tiers;
pub mod traits;
pub mod types;

pub use error::*;
pub use tiers::*;
pub use traits::*;
pub use types::*;
