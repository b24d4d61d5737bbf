//! Durable client storage.
//!
//! Holds only refresh-token metadata; the access token never reaches it.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::Result;

/// Storage key names as constants.
pub mod keys {
    /// Legacy key; only ever removed, never written.
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Expiry as Unix epoch milliseconds
    pub const EXPIRES_AT: &str = "expires_at";
    pub const TOKEN_TYPE: &str = "token_type";
}

/// Key-value storage that survives the process.
pub trait DurableStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}
