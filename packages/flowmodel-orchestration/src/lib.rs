/*
 * Flow Model Orchestration
 *
 * Mines data-flow models for the external APIs a database references by
 * running the four capture queries (summary, sink, source, neutral) in
 * order and streaming each stage's parsed models to the caller.
 *
 * Architecture:
 * - Ports: query engine + result decoder (async traits)
 * - Generator: sequential stages, one progress bar, cooperative cancellation
 * - Infrastructure: `codeql` CLI adapter
 */

// Public modules
pub mod config;
pub mod error;
pub mod generator;
pub mod infrastructure;
pub mod ports;
pub mod progress;
pub mod stage;

// Re-exports
pub use config::GeneratorConfig;
pub use error::{ConfigError, GeneratorError, Result};
pub use generator::{
    generate_flow_model, save_generated, FlowModelGenerator, FnSink, ResultSink, StageResults,
};
pub use infrastructure::CodeQlCli;
pub use ports::{
    BqrsInfo, CellValue, ColumnSchema, DatabaseItem, DecodedResultSet, QueryDescriptor,
    QueryEngine, QueryRun, ResultDecoder, ResultSetInfo,
};
pub use progress::{ProgressCallback, ProgressUpdate, MAX_STEP, STEPS_PER_STAGE};
pub use stage::{Stage, STAGES};
