//! Scripted query engine and decoder for generator tests

#![allow(dead_code)]

use async_trait::async_trait;
use flowmodel_orchestration::progress::LocalProgress;
use flowmodel_orchestration::{
    BqrsInfo, CellValue, DatabaseItem, DecodedResultSet, GeneratorError, QueryDescriptor,
    QueryEngine, QueryRun, ResultDecoder, ResultSetInfo, Result,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// What one capture query produces
#[derive(Clone, Default)]
pub struct ScriptedQuery {
    pub progress: Vec<(u32, &'static str)>,
    pub result_sets: usize,
    pub tuples: Vec<String>,
}

impl ScriptedQuery {
    pub fn rows(tuples: &[&str]) -> Self {
        Self {
            progress: vec![],
            result_sets: 1,
            tuples: tuples.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn with_result_sets(mut self, result_sets: usize) -> Self {
        self.result_sets = result_sets;
        self
    }

    pub fn with_progress(mut self, progress: &[(u32, &'static str)]) -> Self {
        self.progress = progress.to_vec();
        self
    }
}

/// Query engine + decoder keyed by query file name
#[derive(Default)]
pub struct ScriptedCodeQl {
    queries: HashMap<String, ScriptedQuery>,
    failing: HashSet<String>,
    pub executed: Mutex<Vec<String>>,
}

impl ScriptedCodeQl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, file: &str, script: ScriptedQuery) -> Self {
        self.queries.insert(file.to_string(), script);
        self
    }

    pub fn failing(mut self, file: &str) -> Self {
        self.failing.insert(file.to_string());
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    fn script_for(&self, results_path: &Path) -> ScriptedQuery {
        let file = results_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.trim_end_matches(".bqrs").to_string())
            .unwrap_or_default();
        self.queries.get(&file).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl QueryEngine for ScriptedCodeQl {
    async fn compile_and_run(
        &self,
        _database: &DatabaseItem,
        query: &QueryDescriptor,
        progress: &LocalProgress,
        token: &CancellationToken,
    ) -> Result<QueryRun> {
        if token.is_cancelled() {
            return Err(GeneratorError::Cancelled);
        }

        let file = query
            .query_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        self.executed.lock().push(file.clone());

        if self.failing.contains(&file) {
            return Err(GeneratorError::QueryCompilation(format!(
                "could not compile {}",
                file
            )));
        }

        if let Some(script) = self.queries.get(&file) {
            for (step, message) in &script.progress {
                progress(*step, message);
            }
        }

        Ok(QueryRun {
            results_path: query.storage_dir.join(format!("{}.bqrs", file)),
        })
    }
}

#[async_trait]
impl ResultDecoder for ScriptedCodeQl {
    async fn info(&self, results_path: &Path) -> Result<BqrsInfo> {
        let script = self.script_for(results_path);
        Ok(BqrsInfo {
            result_sets: (0..script.result_sets)
                .map(|i| ResultSetInfo {
                    name: if i == 0 {
                        "#select".to_string()
                    } else {
                        format!("extra{}", i)
                    },
                    rows: script.tuples.len() as u64,
                    columns: vec![],
                })
                .collect(),
        })
    }

    async fn decode(&self, results_path: &Path, result_set: &str) -> Result<DecodedResultSet> {
        assert_eq!(result_set, "#select");
        let script = self.script_for(results_path);
        Ok(DecodedResultSet {
            columns: vec![],
            tuples: script
                .tuples
                .into_iter()
                .map(|t| vec![CellValue::String(t)])
                .collect(),
        })
    }
}
