use async_trait::async_trait;
use flowmodel_storage::{
    parse_tuple, MethodSignature, ModelKind, ModelMap, ModelStore, ModeledMethod,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{GeneratorError, Result};
use crate::ports::{DatabaseItem, QueryDescriptor, QueryEngine, ResultDecoder};
use crate::progress::{no_progress, stage_progress, ProgressCallback};
use crate::stage::{model_generator_query, STAGES};

/// Models produced by one stage, in tuple order
pub type StageResults = Vec<(MethodSignature, ModeledMethod)>;

/// Receives each stage's results as soon as the stage finishes
#[async_trait]
pub trait ResultSink: Send {
    async fn accept(&mut self, kind: ModelKind, results: StageResults) -> Result<()>;
}

/// Folds stages into the map; later stages replace earlier models
#[async_trait]
impl ResultSink for ModelMap {
    async fn accept(&mut self, _kind: ModelKind, results: StageResults) -> Result<()> {
        self.extend(results);
        Ok(())
    }
}

/// Forwards each stage to a channel drained elsewhere
#[async_trait]
impl ResultSink for UnboundedSender<(ModelKind, StageResults)> {
    async fn accept(&mut self, kind: ModelKind, results: StageResults) -> Result<()> {
        self.send((kind, results)).map_err(GeneratorError::sink)
    }
}

/// Adapts a plain closure into a [`ResultSink`]
pub struct FnSink<F>(pub F);

#[async_trait]
impl<F> ResultSink for FnSink<F>
where
    F: FnMut(ModelKind, StageResults) + Send,
{
    async fn accept(&mut self, kind: ModelKind, results: StageResults) -> Result<()> {
        (self.0)(kind, results);
        Ok(())
    }
}

/// Runs the summary, sink, source and neutral capture queries in turn
pub struct FlowModelGenerator {
    engine: Arc<dyn QueryEngine>,
    decoder: Arc<dyn ResultDecoder>,
    database: DatabaseItem,
    ql_dir: PathBuf,
    query_storage_dir: PathBuf,
    progress: ProgressCallback,
    token: CancellationToken,
}

impl FlowModelGenerator {
    pub fn new(
        engine: Arc<dyn QueryEngine>,
        decoder: Arc<dyn ResultDecoder>,
        database: DatabaseItem,
        ql_dir: impl Into<PathBuf>,
        query_storage_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            engine,
            decoder,
            database,
            ql_dir: ql_dir.into(),
            query_storage_dir: query_storage_dir.into(),
            progress: no_progress(),
            token: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    /// Share `token` with every engine call of this generator
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn database(&self) -> &DatabaseItem {
        &self.database
    }

    /// Run all four stages, handing each stage's models to `sink`
    ///
    /// A stage whose results cannot be read is skipped without calling the
    /// sink. Engine and sink errors abort the run. Once the token fires no
    /// further stage is started.
    pub async fn run<S>(&self, sink: &mut S) -> Result<()>
    where
        S: ResultSink + ?Sized,
    {
        let start = Instant::now();
        info!(
            "Generating flow models for database {} ({})",
            self.database.name, self.database.language
        );

        for stage in STAGES {
            if self.token.is_cancelled() {
                info!("Model generation cancelled before {} stage", stage.kind);
                return Err(GeneratorError::Cancelled);
            }

            match self
                .get_adds_to(stage.kind, stage.query_file, stage.index)
                .await?
            {
                Some(results) => sink.accept(stage.kind, results).await?,
                None => warn!("Skipping {} stage: no usable results", stage.kind),
            }
        }

        info!(
            "Flow model generation finished in {}ms",
            start.elapsed().as_millis()
        );
        Ok(())
    }

    /// Run one capture query and parse its rows
    ///
    /// `Ok(None)` when the query did not produce exactly one result set.
    /// Malformed rows are dropped.
    pub async fn get_adds_to(
        &self,
        kind: ModelKind,
        query_name: &str,
        query_step: u32,
    ) -> Result<Option<StageResults>> {
        let query = QueryDescriptor {
            query_path: model_generator_query(&self.ql_dir, &self.database.language, query_name),
            storage_dir: self.query_storage_dir.clone(),
        };
        debug!("Running {} query {}", kind, query.query_path.display());

        let on_progress = stage_progress(kind, query_step, self.progress.clone());
        let run = self
            .engine
            .compile_and_run(&self.database, &query, &on_progress, &self.token)
            .await?;

        let info = self.decoder.info(&run.results_path).await?;
        if info.result_sets.len() != 1 {
            warn!(
                "Expected exactly one result set, got {}",
                info.result_sets.len()
            );
            return Ok(None);
        }
        let result_set = &info.result_sets[0];

        let decoded = self
            .decoder
            .decode(&run.results_path, &result_set.name)
            .await?;

        let total = decoded.tuples.len();
        let results: StageResults = decoded
            .tuples
            .iter()
            .filter_map(|tuple| parse_tuple(kind, tuple.first()?.as_str()?))
            .collect();

        let dropped = total - results.len();
        if dropped > 0 {
            warn!(
                "Dropped {} of {} unparseable {} rows",
                dropped, total, kind
            );
        }
        info!("Captured {} {} models", results.len(), kind);

        Ok(Some(results))
    }
}

/// Build a generator and run it once
#[allow(clippy::too_many_arguments)]
pub async fn generate_flow_model<S>(
    engine: Arc<dyn QueryEngine>,
    decoder: Arc<dyn ResultDecoder>,
    query_storage_dir: impl Into<PathBuf>,
    ql_dir: impl Into<PathBuf>,
    database: DatabaseItem,
    sink: &mut S,
    progress: ProgressCallback,
    token: CancellationToken,
) -> Result<()>
where
    S: ResultSink + ?Sized,
{
    FlowModelGenerator::new(engine, decoder, database, ql_dir, query_storage_dir)
        .with_progress(progress)
        .with_cancellation(token)
        .run(sink)
        .await
}

/// Persist the models of a generation run
///
/// A completed run is saved. A cancelled run saves the stages delivered
/// before cancellation and still reports [`GeneratorError::Cancelled`]. Any
/// other failure leaves the file untouched.
pub async fn save_generated<M>(
    store: &M,
    path: &Path,
    models: &ModelMap,
    outcome: Result<()>,
) -> Result<()>
where
    M: ModelStore + ?Sized,
{
    match outcome {
        Ok(()) => {
            store.save(path, models).await?;
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            warn!(
                "Saving {} models collected before cancellation",
                models.len()
            );
            store.save(path, models).await?;
            Err(e)
        }
        Err(e) => Err(e),
    }
}
