//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services as
//! `Arc<CoreConfig>`. Request handling never reads process-wide environment variables.

use crate::constants::{RECORDS_DIR_NAME, USERS_FILENAME};
use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    model_path: Option<PathBuf>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// The data directory is created if it does not exist yet. A model path, when given,
    /// must point at an existing file.
    pub fn new(data_dir: PathBuf, model_path: Option<PathBuf>) -> CoreResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(CoreError::InvalidInput("data_dir cannot be empty".into()));
        }
        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir).map_err(CoreError::StorageDirCreation)?;
        }
        if !data_dir.is_dir() {
            return Err(CoreError::InvalidInput(format!(
                "data_dir is not a directory: {}",
                data_dir.display()
            )));
        }

        if let Some(path) = &model_path {
            if !path.is_file() {
                return Err(CoreError::InvalidInput(format!(
                    "model artifact does not exist: {}",
                    path.display()
                )));
            }
        }

        Ok(Self {
            data_dir,
            model_path,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn users_file(&self) -> PathBuf {
        self.data_dir.join(USERS_FILENAME)
    }

    pub fn records_dir(&self) -> PathBuf {
        self.data_dir.join(RECORDS_DIR_NAME)
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }
}

/// Parse an optional model path from an environment value.
///
/// `None`, empty and whitespace-only values all mean "no model configured".
pub fn model_path_from_env_value(value: Option<String>) -> Option<PathBuf> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_creates_missing_data_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join("nested").join("data");

        let cfg = CoreConfig::new(data_dir.clone(), None).expect("config should build");

        assert!(data_dir.is_dir());
        assert_eq!(cfg.users_file(), data_dir.join(USERS_FILENAME));
        assert_eq!(cfg.records_dir(), data_dir.join(RECORDS_DIR_NAME));
        assert!(cfg.model_path().is_none());
    }

    #[test]
    fn new_rejects_missing_model_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let err = CoreConfig::new(
            temp_dir.path().to_path_buf(),
            Some(temp_dir.path().join("model.json")),
        )
        .expect_err("missing model should be rejected");

        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn model_path_from_env_value_ignores_blank() {
        assert_eq!(model_path_from_env_value(None), None);
        assert_eq!(model_path_from_env_value(Some("  ".into())), None);
        assert_eq!(
            model_path_from_env_value(Some(" model.json ".into())),
            Some(PathBuf::from("model.json"))
        );
    }
}
