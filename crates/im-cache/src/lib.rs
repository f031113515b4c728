//! # im-cache
//!
//! Redis infrastructure for the connection tier: a managed connection pool
//! and the shared presence store other gateway instances and backend
//! services read to locate a user's live socket.

pub mod pool;
pub mod presence;

// Re-export pool types
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};

// Re-export presence types
pub use presence::PresenceStore;
