//! Personal memories library
//!
//! This library keeps anniversaries on a timeline, photos in a date-bucketed
//! album, and diary entries with comment threads, all persisted as whole
//! collections in a local key/value store.

mod album;
mod blob;
mod cli;
mod config;
mod diary;
mod errors;
mod helper;
mod records;
mod storage;
mod timeline;
mod types;

// Re-export key components
pub use album::*;
pub use blob::*;
pub use cli::*;
pub use config::*;
pub use diary::*;
pub use errors::*;
pub use helper::*;
pub use records::*;
pub use storage::*;
pub use timeline::*;
pub use types::*;
