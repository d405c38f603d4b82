use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use which::which;

use crate::{
    KeepsakeError, Result, DEFAULT_AUTHOR, DEFAULT_MAX_BLOB_BYTES, DEFAULT_MAX_UPLOAD_BATCH,
    DEFAULT_SUMMARY_LENGTH,
};

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory where the collection files are stored
    pub data_dir: PathBuf,

    /// Largest image accepted by the blob loader, in bytes
    pub max_blob_bytes: u64,

    /// Most files accepted in one album upload
    pub max_upload_batch: usize,

    /// Characters shown in diary summaries
    pub summary_length: usize,

    /// Author recorded for comments left without a name
    pub default_author: String,

    /// Editor used to write diary content
    pub editor_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".keepsake"));

        Self {
            data_dir,
            max_blob_bytes: DEFAULT_MAX_BLOB_BYTES,
            max_upload_batch: DEFAULT_MAX_UPLOAD_BATCH,
            summary_length: DEFAULT_SUMMARY_LENGTH,
            default_author: DEFAULT_AUTHOR.to_string(),
            editor_command: None,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "keepsake")
}

impl Config {
    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Reads the configuration from `path`, or the default location when no
    /// path is given. A missing file yields the defaults; an unreadable or
    /// malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => {
                    debug!("No configuration directory available, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path)?;
        let config: Config =
            serde_json::from_str(&text).map_err(|e| KeepsakeError::ConfigError {
                message: format!("{}: {}", path.display(), e),
            })?;
        config.validate()?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_upload_batch == 0 {
            return Err(KeepsakeError::ConfigError {
                message: "max_upload_batch must be at least 1".to_string(),
            });
        }
        if self.max_blob_bytes == 0 {
            return Err(KeepsakeError::ConfigError {
                message: "max_blob_bytes must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    // This method provides smart fallbacks when no editor is configured
    pub fn get_editor_command(&self) -> String {
        if let Some(editor) = &self.editor_command {
            return editor.clone();
        }

        if let Ok(editor) = std::env::var("EDITOR") {
            return editor;
        }

        if cfg!(windows) {
            "notepad".to_string()
        } else if cfg!(target_os = "macos") {
            "open -W -t".to_string()
        } else {
            for editor in &["nano", "vim", "vi", "emacs"] {
                if which(editor).is_ok() {
                    return editor.to_string();
                }
            }
            "nano".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("none.json"))).unwrap();
        assert_eq!(config.max_upload_batch, 9);
        assert_eq!(config.max_blob_bytes, 5 * 1024 * 1024);
        assert_eq!(config.summary_length, 60);
        assert_eq!(config.default_author, "anonymous");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"data_dir":"/tmp/mem","default_author":"me"}"#).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/mem"));
        assert_eq!(config.default_author, "me");
        assert_eq!(config.max_upload_batch, 9);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{").unwrap();
        assert!(matches!(
            Config::load(Some(&path)).unwrap_err(),
            KeepsakeError::ConfigError { .. }
        ));
    }

    #[test]
    fn zero_batch_limit_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"max_upload_batch":0}"#).unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
