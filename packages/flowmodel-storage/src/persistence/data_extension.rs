//! Data extension YAML schema
//!
//! ```yaml
//! extensions:
//!   - addsTo:
//!       pack: codeql/java-all
//!       extensible: sinkModel
//!     data:
//!       - ["java.sql", "Statement", true, "execute", "(String)", "", "Argument[0]", "sql", "manual"]
//! ```

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::domain::rows::{read_yaml_row, write_modeled_method};
use crate::domain::{ModelKind, ModelMap};
use crate::error::Result;

/// Top-level document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataExtensionFile {
    #[serde(default)]
    pub extensions: Vec<DataExtension>,
}

/// Rows added to one extensible predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataExtension {
    #[serde(rename = "addsTo")]
    pub adds_to: AddsTo,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddsTo {
    pub pack: String,
    pub extensible: String,
}

/// Library pack that models for `language` extend
pub fn library_pack(language: &str) -> String {
    format!("codeql/{}-all", language)
}

impl DataExtensionFile {
    /// Build the document for a model map
    ///
    /// One block per kind in stage order, rows in signature order. `none`
    /// entries are skipped.
    pub fn from_models(language: &str, models: &ModelMap) -> Self {
        let mut blocks: Vec<DataExtension> = ModelKind::ALL
            .iter()
            .map(|kind| DataExtension {
                adds_to: AddsTo {
                    pack: library_pack(language),
                    extensible: kind.extensible_predicate().to_string(),
                },
                data: Vec::new(),
            })
            .collect();

        for (signature, method) in models.iter() {
            if let Some((kind, row)) = write_modeled_method(signature, method) {
                blocks[kind as usize].data.push(row);
            }
        }

        Self { extensions: blocks }
    }

    /// Collect every parseable row into a model map
    ///
    /// Unknown extensible predicates and unparseable rows are logged and
    /// skipped. Later rows win on duplicate signatures.
    pub fn into_models(self) -> ModelMap {
        let mut models = ModelMap::new();

        for extension in self.extensions {
            let Some(kind) = ModelKind::from_extensible_predicate(&extension.adds_to.extensible)
            else {
                warn!(
                    "Skipping data extension for unsupported predicate '{}'",
                    extension.adds_to.extensible
                );
                continue;
            };

            let total = extension.data.len();
            let mut dropped = 0;
            for row in &extension.data {
                match read_yaml_row(kind, row) {
                    Some((signature, method)) => {
                        models.insert(signature, method);
                    }
                    None => dropped += 1,
                }
            }

            if dropped > 0 {
                warn!(
                    "Dropped {} of {} unparseable {} rows",
                    dropped,
                    total,
                    kind.extensible_predicate()
                );
            } else {
                debug!("Read {} {} rows", total, kind.extensible_predicate());
            }
        }

        models
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}
