//! Generator configuration (YAML + CLI overrides)
//!
//! ```yaml
//! version: 1
//! codeql: /opt/codeql/codeql
//! query_storage_dir: /tmp/flowmodel-queries
//! workspace_folders:
//!   - /home/me/src/ql
//! ```

use flowmodel_storage::persistence::find_ql_workspace_folder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

pub const CONFIG_VERSION: u32 = 1;

/// YAML schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFileV1 {
    /// Schema version (always 1 for v1)
    version: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    codeql: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    ql_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    query_storage_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    workspace_folders: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// `codeql` executable
    pub codeql_path: PathBuf,
    /// Checkout holding `<language>/ql/src/utils/modelgenerator`; defaults to the `ql` workspace folder
    pub ql_dir: Option<PathBuf>,
    /// Where query runs write their results
    pub query_storage_dir: PathBuf,
    pub workspace_folders: Vec<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            codeql_path: PathBuf::from("codeql"),
            ql_dir: None,
            query_storage_dir: std::env::temp_dir().join("flowmodel-queries"),
            workspace_folders: Vec::new(),
        }
    }
}

impl GeneratorConfig {
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let file: ConfigFileV1 = serde_yaml::from_str(content)?;

        match file.version {
            None => return Err(ConfigError::MissingVersion),
            Some(CONFIG_VERSION) => {}
            Some(found) => {
                return Err(ConfigError::UnsupportedVersion {
                    found,
                    supported: vec![CONFIG_VERSION],
                })
            }
        }

        let defaults = Self::default();
        Ok(Self {
            codeql_path: file.codeql.unwrap_or(defaults.codeql_path),
            ql_dir: file.ql_dir,
            query_storage_dir: file.query_storage_dir.unwrap_or(defaults.query_storage_dir),
            workspace_folders: file.workspace_folders,
        })
    }

    pub fn from_yaml(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        let file = ConfigFileV1 {
            version: Some(CONFIG_VERSION),
            codeql: Some(self.codeql_path.clone()),
            ql_dir: self.ql_dir.clone(),
            query_storage_dir: Some(self.query_storage_dir.clone()),
            workspace_folders: self.workspace_folders.clone(),
        };
        Ok(serde_yaml::to_string(&file)?)
    }

    /// Explicit `ql_dir`, else the `ql` workspace folder
    pub fn resolve_ql_dir(&self) -> ConfigResult<PathBuf> {
        self.ql_dir
            .clone()
            .or_else(|| find_ql_workspace_folder(&self.workspace_folders).map(Path::to_path_buf))
            .ok_or_else(|| ConfigError::MissingSetting("ql_dir".to_string()))
    }
}
