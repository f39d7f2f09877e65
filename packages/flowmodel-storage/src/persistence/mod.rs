//! Model file persistence
//!
//! The model map for one database lives in a single data extension file at a
//! path derived from the workspace, the database language and the database
//! name. Saving overwrites the file wholesale; loading replaces the caller's
//! map wholesale and never fails (a missing or unreadable file is "no data").

pub mod data_extension;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::domain::ModelMap;
use crate::error::{Result, StorageError};

pub use data_extension::{library_pack, AddsTo, DataExtension, DataExtensionFile};

/// Name of the workspace folder holding the QL libraries
pub const QL_WORKSPACE_FOLDER: &str = "ql";

/// Suffix of every model file
pub const MODEL_FILE_SUFFIX: &str = ".model.yml";

/// File name for a database's models
///
/// Path separators in the database name become `.` so the name is a single
/// path component (`foo/bar` → `foo.bar.model.yml`). Distinct names that
/// already contain `.` can map to the same file.
pub fn model_file_name(database_name: &str) -> String {
    let flattened: String = database_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '.' } else { c })
        .collect();
    format!("{}{}", flattened, MODEL_FILE_SUFFIX)
}

/// `<workspace_root>/<language>/ql/lib/ext/<database>.model.yml`
pub fn model_file_path(workspace_root: &Path, language: &str, database_name: &str) -> PathBuf {
    workspace_root
        .join(language)
        .join("ql")
        .join("lib")
        .join("ext")
        .join(model_file_name(database_name))
}

/// Pick the `ql` folder out of the open workspace folders
pub fn find_ql_workspace_folder(folders: &[PathBuf]) -> Option<&Path> {
    folders
        .iter()
        .find(|folder| {
            folder
                .file_name()
                .is_some_and(|name| name == QL_WORKSPACE_FOLDER)
        })
        .map(PathBuf::as_path)
}

/// Model file path for a database, if the workspace has a `ql` folder
pub fn resolve_model_file(
    folders: &[PathBuf],
    language: &str,
    database_name: &str,
) -> Result<PathBuf> {
    let root = find_ql_workspace_folder(folders).ok_or_else(|| {
        StorageError::location_not_found(format!(
            "No workspace folder '{}' found",
            QL_WORKSPACE_FOLDER
        ))
    })?;
    Ok(model_file_path(root, language, database_name))
}

/// Port for persisting a model map
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Write `models` to `path`, replacing whatever was there
    async fn save(&self, path: &Path, models: &ModelMap) -> Result<()>;

    /// Read the models at `path`; `None` when absent or unreadable
    async fn load(&self, path: &Path) -> Option<ModelMap>;
}

/// Stores models as a CodeQL data extension YAML file
#[derive(Debug, Clone)]
pub struct YamlModelStore {
    language: String,
}

impl YamlModelStore {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    async fn read(path: &Path) -> Result<ModelMap> {
        let yaml = tokio::fs::read_to_string(path).await?;
        Ok(DataExtensionFile::from_yaml(&yaml)?.into_models())
    }
}

#[async_trait]
impl ModelStore for YamlModelStore {
    async fn save(&self, path: &Path, models: &ModelMap) -> Result<()> {
        let yaml = DataExtensionFile::from_models(&self.language, models).to_yaml()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, yaml).await?;

        info!("Saved {} models to {}", models.len(), path.display());
        Ok(())
    }

    async fn load(&self, path: &Path) -> Option<ModelMap> {
        match Self::read(path).await {
            Ok(models) => {
                info!("Loaded {} models from {}", models.len(), path.display());
                Some(models)
            }
            Err(e) => {
                warn!("Unable to read data extension YAML {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_file_name_replaces_separators() {
        assert_eq!(model_file_name("foo/bar"), "foo.bar.model.yml");
        assert_eq!(model_file_name("foo\\bar"), "foo.bar.model.yml");
        assert_eq!(model_file_name("plain"), "plain.model.yml");
    }

    #[test]
    fn test_model_file_name_collision_is_preserved() {
        assert_eq!(model_file_name("a/b"), model_file_name("a.b"));
    }

    #[test]
    fn test_model_file_path_layout() {
        let path = model_file_path(Path::new("/ws/ql"), "java", "foo/bar");
        assert_eq!(path, PathBuf::from("/ws/ql/java/ql/lib/ext/foo.bar.model.yml"));
    }

    #[test]
    fn test_find_ql_workspace_folder() {
        let folders = vec![PathBuf::from("/src/app"), PathBuf::from("/src/ql")];
        assert_eq!(find_ql_workspace_folder(&folders), Some(Path::new("/src/ql")));
        assert_eq!(find_ql_workspace_folder(&folders[..1]), None);
    }

    #[test]
    fn test_resolve_model_file_without_ql_folder() {
        let err = resolve_model_file(&[PathBuf::from("/src/app")], "java", "db").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::LocationNotFound);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let store = YamlModelStore::new("java");

        assert!(store.load(&dir.path().join("absent.model.yml")).await.is_none());
    }

    #[tokio::test]
    async fn test_load_malformed_file_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.model.yml");
        tokio::fs::write(&path, "extensions: {{ nope").await.unwrap();

        assert!(YamlModelStore::new("java").load(&path).await.is_none());
    }
}
