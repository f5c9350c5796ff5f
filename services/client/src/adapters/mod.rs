pub mod clock;
pub mod inventory;
pub mod navigator;
pub mod storage;

pub use clock::SystemClock;
pub use inventory::ApiInventoryFeed;
pub use navigator::ShellNavigator;
pub use storage::{FileStore, MemoryStore};
