/*
 * Ports to the query engine and the result decoder
 *
 * The generator only talks to these traits. `infrastructure::CodeQlCli`
 * implements both on top of the `codeql` executable; tests use in-memory fakes.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::progress::LocalProgress;

// ============================================================================
// DTOs
// ============================================================================

/// Database the capture queries run against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseItem {
    /// Display name, e.g. `github/codeql`
    pub name: String,
    /// Extractor language, e.g. `java`
    pub language: String,
    /// Database directory on disk
    pub path: PathBuf,
}

impl DatabaseItem {
    pub fn new(name: impl Into<String>, language: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            path: path.into(),
        }
    }
}

/// One query to compile and evaluate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    pub query_path: PathBuf,
    /// Directory the run may write its results under
    pub storage_dir: PathBuf,
}

/// Outcome of a completed query run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRun {
    pub results_path: PathBuf,
}

/// `bqrs info` output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BqrsInfo {
    #[serde(rename = "result-sets", default)]
    pub result_sets: Vec<ResultSetInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSetInfo {
    pub name: String,
    pub rows: u64,
    #[serde(default)]
    pub columns: Vec<ColumnSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Column kind code (`s` string, `i` integer, `e` entity, ...)
    pub kind: String,
}

/// `bqrs decode` output for one result set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedResultSet {
    #[serde(default)]
    pub columns: Vec<ColumnSchema>,
    #[serde(default)]
    pub tuples: Vec<Vec<CellValue>>,
}

/// One cell of a decoded tuple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    String(String),
    Boolean(bool),
    Number(serde_json::Number),
    Entity(EntityValue),
}

impl CellValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<serde_json::Value>,
}

// ============================================================================
// Ports
// ============================================================================

/// Compiles and evaluates queries against a database
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Run `query` to completion, reporting local progress
    ///
    /// Implementations check `token` between units of work and fail with
    /// `GeneratorError::Cancelled` once it fires. Compilation failures are
    /// errors, not empty results.
    async fn compile_and_run(
        &self,
        database: &DatabaseItem,
        query: &QueryDescriptor,
        progress: &LocalProgress,
        token: &CancellationToken,
    ) -> Result<QueryRun>;
}

/// Reads binary query results
#[async_trait]
pub trait ResultDecoder: Send + Sync {
    async fn info(&self, results_path: &Path) -> Result<BqrsInfo>;

    async fn decode(&self, results_path: &Path, result_set: &str) -> Result<DecodedResultSet>;
}
