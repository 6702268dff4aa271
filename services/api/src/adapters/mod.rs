pub mod db;
pub mod memory;
pub mod timeout;

pub use db::DbAdapter;
pub use memory::MemoryAdapter;
pub use timeout::TimeoutAdapter;
