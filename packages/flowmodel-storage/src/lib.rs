//! Flow model storage
//!
//! Typed data-flow models for external API methods (summaries, sinks,
//! sources, neutrals), the row grammar the capture queries emit them in, and
//! the data extension file they are saved to.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use flowmodel_storage::{resolve_model_file, ModelStore, YamlModelStore};
//!
//! let path = resolve_model_file(&workspace_folders, "java", "github/codeql")?;
//! let store = YamlModelStore::new("java");
//!
//! // Load replaces the in-memory map; a missing file yields None
//! let mut models = store.load(&path).await.unwrap_or_default();
//! models.extend(stage_results);
//!
//! // Save overwrites the file
//! store.save(&path, &models).await?;
//! ```

pub mod domain;
pub mod error;
pub mod persistence;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::rows::{parse_tuple, read_modeled_method};
pub use domain::{
    MethodSignature, ModelKind, ModelMap, ModeledMethod, ModeledMethodType, Provenance,
    SummaryKind,
};
pub use persistence::{
    model_file_name, model_file_path, resolve_model_file, DataExtensionFile, ModelStore,
    YamlModelStore,
};
