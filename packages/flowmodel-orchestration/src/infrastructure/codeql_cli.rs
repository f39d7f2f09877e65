//! `codeql` executable as query engine and result decoder

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{GeneratorError, Result};
use crate::ports::{
    BqrsInfo, DatabaseItem, DecodedResultSet, QueryDescriptor, QueryEngine, QueryRun,
    ResultDecoder,
};
use crate::progress::{LocalProgress, STEPS_PER_STAGE};

/// Lines of stderr kept for error reports
const STDERR_TAIL: usize = 20;

#[derive(Debug, Clone)]
pub struct CodeQlCli {
    codeql_path: PathBuf,
}

impl CodeQlCli {
    pub fn new(codeql_path: impl Into<PathBuf>) -> Self {
        Self {
            codeql_path: codeql_path.into(),
        }
    }

    /// Run a `codeql` subcommand and parse its stdout as JSON
    async fn run_json<T: DeserializeOwned>(&self, args: Vec<OsString>) -> Result<T> {
        debug!("{} {:?}", self.codeql_path.display(), args);

        let output = Command::new(&self.codeql_path)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(GeneratorError::decode(format!(
                "codeql exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

/// Progress position implied by a line of `codeql query run` output
fn phase_step(line: &str) -> Option<u32> {
    let line = line.trim_start();
    if line.starts_with("Compiling") {
        Some(STEPS_PER_STAGE / 10)
    } else if line.contains("Evaluation done") {
        Some(STEPS_PER_STAGE * 9 / 10)
    } else if line.starts_with("Starting evaluation") || line.contains(" eval ") {
        Some(STEPS_PER_STAGE / 2)
    } else {
        None
    }
}

fn is_compilation_error(line: &str) -> bool {
    line.trim_start().starts_with("ERROR:")
}

#[async_trait]
impl QueryEngine for CodeQlCli {
    async fn compile_and_run(
        &self,
        database: &DatabaseItem,
        query: &QueryDescriptor,
        progress: &LocalProgress,
        token: &CancellationToken,
    ) -> Result<QueryRun> {
        if token.is_cancelled() {
            return Err(GeneratorError::Cancelled);
        }

        let run_dir = query.storage_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&run_dir).await?;
        let results_path = run_dir.join("results.bqrs");

        info!(
            "Running {} against {}",
            query.query_path.display(),
            database.path.display()
        );
        progress(0, "Compiling and running query");

        let mut database_arg = OsString::from("--database=");
        database_arg.push(&database.path);
        let mut output_arg = OsString::from("--output=");
        output_arg.push(&results_path);

        let mut child = Command::new(&self.codeql_path)
            .arg("query")
            .arg("run")
            .arg(database_arg)
            .arg(output_arg)
            .arg("--")
            .arg(&query.query_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| GeneratorError::query_engine("codeql stderr not captured"))?;
        let mut lines = BufReader::new(stderr).lines();

        let mut step = 0;
        let mut tail: Vec<String> = Vec::new();
        let mut compilation_failed = false;

        let status = loop {
            tokio::select! {
                _ = token.cancelled() => {
                    warn!("Cancelling query {}", query.query_path.display());
                    child.kill().await.ok();
                    return Err(GeneratorError::Cancelled);
                }
                line = lines.next_line() => match line? {
                    Some(line) => {
                        if let Some(s) = phase_step(&line) {
                            step = step.max(s);
                        }
                        compilation_failed |= is_compilation_error(&line);
                        progress(step, &line);

                        if tail.len() == STDERR_TAIL {
                            tail.remove(0);
                        }
                        tail.push(line);
                    }
                    None => break child.wait().await?,
                },
            }
        };

        if !status.success() {
            let message = format!(
                "{} exited with {}: {}",
                query.query_path.display(),
                status,
                tail.join("\n")
            );
            return Err(if compilation_failed {
                GeneratorError::QueryCompilation(message)
            } else {
                GeneratorError::QueryEngine(message)
            });
        }

        progress(STEPS_PER_STAGE, "Query finished");
        Ok(QueryRun { results_path })
    }
}

#[async_trait]
impl ResultDecoder for CodeQlCli {
    async fn info(&self, results_path: &Path) -> Result<BqrsInfo> {
        self.run_json(vec![
            "bqrs".into(),
            "info".into(),
            "--format=json".into(),
            "--".into(),
            results_path.into(),
        ])
        .await
    }

    async fn decode(&self, results_path: &Path, result_set: &str) -> Result<DecodedResultSet> {
        self.run_json(vec![
            "bqrs".into(),
            "decode".into(),
            "--format=json".into(),
            "--entities=url,string".into(),
            format!("--result-set={}", result_set).into(),
            "--".into(),
            results_path.into(),
        ])
        .await
    }
}
