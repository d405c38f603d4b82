//! Error types for the keepsake application.
//!
//! This module defines the error kinds that can occur while loading,
//! transforming and persisting memory records.

use std::{io, path::PathBuf};

use thiserror::Error;

/// The main error type for the keepsake application.
#[derive(Error, Debug)]
pub enum KeepsakeError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A required field is missing or a submitted value is unusable.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// A single blob exceeds the configured byte ceiling.
    #[error("File {name} is {size} bytes, the limit is {limit} bytes")]
    BlobTooLarge { name: String, size: u64, limit: u64 },

    /// An upload batch carries more files than allowed.
    #[error("Upload of {count} files rejected, at most {limit} files per batch")]
    BatchTooLarge { count: usize, limit: usize },

    /// A stored collection could not be decoded.
    #[error("Failed to read collection {collection}: {message}")]
    StorageRead { collection: String, message: String },

    /// A collection could not be written back to the store.
    #[error("Failed to save collection {collection}: {message}")]
    StorageWrite { collection: String, message: String },

    /// A record addressed by id does not exist.
    #[error("{kind} not found: {id}")]
    RecordNotFound { kind: &'static str, id: String },

    /// The platform failed to deliver the bytes of a selected file.
    #[error("Failed to load {name}: {message}")]
    BlobLoadFailed { name: String, message: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    /// for mutex lock acquisition issues
    #[error("{message}")]
    LockAcquisitionFailed { message: String },

    #[error("{message}")]
    EditorError { message: String },
}

impl KeepsakeError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        KeepsakeError::Validation {
            message: message.into(),
        }
    }

    /// True for both per-file and per-batch size ceilings.
    pub fn is_size_limit(&self) -> bool {
        matches!(
            self,
            KeepsakeError::BlobTooLarge { .. } | KeepsakeError::BatchTooLarge { .. }
        )
    }
}
