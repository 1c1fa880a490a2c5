mod memory;
mod postgres;
mod r#trait;

pub use memory::MemoryGraphStore;
pub use postgres::PostgresGraphStore;
pub use r#trait::{FollowWrite, SocialGraphStore};
