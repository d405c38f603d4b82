//! Encoded blob loading.
//!
//! Turns a user-selected image file into a `data:` URL that can be stored
//! inline in a collection and handed straight to an image viewer.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, error, trace};
use tokio::task::JoinSet;

use crate::{EncodedBlob, KeepsakeError, Result};

/// Default per-file ceiling: 5 MiB.
pub const DEFAULT_MAX_BLOB_BYTES: u64 = 5 * 1024 * 1024;

/// A file that has been read and encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedBlob {
    /// File name the blob was read from, without directories
    pub file_name: String,
    pub blob: EncodedBlob,
}

#[derive(Debug, Clone)]
pub struct BlobLoader {
    max_bytes: u64,
}

impl Default for BlobLoader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BLOB_BYTES)
    }
}

impl BlobLoader {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Encodes in-memory bytes, enforcing the size ceiling.
    pub fn encode(&self, file_name: &str, bytes: &[u8]) -> Result<EncodedBlob> {
        self.check_size(file_name, bytes.len() as u64)?;
        let mime = mime_for(file_name);
        trace!("Encoding {} ({} bytes) as {}", file_name, bytes.len(), mime);
        Ok(EncodedBlob::new(format!(
            "data:{};base64,{}",
            mime,
            STANDARD.encode(bytes)
        )))
    }

    /// Reads and encodes one file. The size is checked from metadata before
    /// any bytes are read.
    pub async fn load(&self, path: &Path) -> Result<LoadedBlob> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| load_failed(&file_name, e))?;
        self.check_size(&file_name, metadata.len())?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| load_failed(&file_name, e))?;
        let blob = self.encode(&file_name, &bytes)?;

        debug!("Loaded blob from {}", path.display());
        Ok(LoadedBlob { file_name, blob })
    }

    /// Loads every file concurrently and returns them in input order once
    /// all have completed. The first failure aborts the whole batch.
    pub async fn load_all(&self, paths: &[PathBuf]) -> Result<Vec<LoadedBlob>> {
        let mut tasks = JoinSet::new();
        for (index, path) in paths.iter().cloned().enumerate() {
            let loader = self.clone();
            tasks.spawn(async move { (index, loader.load(&path).await) });
        }

        let mut loaded: Vec<(usize, LoadedBlob)> = Vec::with_capacity(paths.len());
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined.map_err(|e| {
                error!("Blob load task failed: {}", e);
                KeepsakeError::BlobLoadFailed {
                    name: "<batch>".to_string(),
                    message: e.to_string(),
                }
            })?;
            loaded.push((index, result?));
        }

        loaded.sort_by_key(|(index, _)| *index);
        Ok(loaded.into_iter().map(|(_, blob)| blob).collect())
    }

    fn check_size(&self, file_name: &str, size: u64) -> Result<()> {
        if size > self.max_bytes {
            error!(
                "Rejecting {}: {} bytes exceeds limit of {}",
                file_name, size, self.max_bytes
            );
            return Err(KeepsakeError::BlobTooLarge {
                name: file_name.to_string(),
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}

fn load_failed(file_name: &str, e: std::io::Error) -> KeepsakeError {
    error!("Failed to read {}: {}", file_name, e);
    KeepsakeError::BlobLoadFailed {
        name: file_name.to_string(),
        message: e.to_string(),
    }
}

/// MIME type inferred from the file extension.
fn mime_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn encodes_data_url() {
        let blob = BlobLoader::default().encode("dot.png", b"abc").unwrap();
        assert_eq!(blob.as_str(), "data:image/png;base64,YWJj");
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        let blob = BlobLoader::default().encode("notes.xyz", b"").unwrap();
        assert_eq!(blob.mime_type(), Some("application/octet-stream"));
    }

    #[test]
    fn ceiling_is_inclusive() {
        let loader = BlobLoader::new(4);
        assert!(loader.encode("a.jpg", b"1234").is_ok());
        let err = loader.encode("a.jpg", b"12345").unwrap_err();
        assert!(matches!(
            err,
            KeepsakeError::BlobTooLarge { size: 5, limit: 4, .. }
        ));
    }

    #[tokio::test]
    async fn load_rejects_oversized_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.jpg");
        std::fs::write(&path, vec![0u8; 16]).unwrap();

        let err = BlobLoader::new(8).load(&path).await.unwrap_err();
        assert!(err.is_size_limit());
    }

    #[tokio::test]
    async fn load_all_keeps_input_order() {
        let dir = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = (0..5)
            .map(|i| {
                let path = dir.path().join(format!("p{}.png", i));
                std::fs::write(&path, vec![i as u8; 10 + i]).unwrap();
                path
            })
            .collect();

        let loaded = BlobLoader::default().load_all(&paths).await.unwrap();
        let names: Vec<_> = loaded.iter().map(|b| b.file_name.as_str()).collect();
        assert_eq!(names, ["p0.png", "p1.png", "p2.png", "p3.png", "p4.png"]);
    }

    #[tokio::test]
    async fn missing_file_fails_the_batch() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("ok.png");
        std::fs::write(&good, b"x").unwrap();
        let paths = vec![good, dir.path().join("gone.png")];

        let err = BlobLoader::default().load_all(&paths).await.unwrap_err();
        assert!(matches!(err, KeepsakeError::BlobLoadFailed { ref name, .. } if name == "gone.png"));
    }
}
