pub mod db;
pub mod memory;

pub use db::ScoreDb;
pub use memory::MemoryRepository;
