//! Flow model generation CLI
//!
//! # Usage
//!
//! ```bash
//! # Generate models for a Java database, merging into the existing model file
//! generate-flow-model --database ~/dbs/codeql-java --language java \
//!     --name github/codeql --workspace ~/src/ql
//!
//! # Same, with settings from a config file
//! generate-flow-model --config flowmodel.yml --database ~/dbs/codeql-java --language java
//! ```

use anyhow::Context;
use clap::Parser;
use flowmodel_orchestration::{
    generate_flow_model, save_generated, CodeQlCli, DatabaseItem, GeneratorConfig,
    ProgressCallback, ProgressUpdate,
};
use flowmodel_storage::{resolve_model_file, ModelKind, ModelMap, ModelStore, YamlModelStore};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "generate-flow-model")]
#[command(about = "Generate data-flow models for the external APIs used by a CodeQL database", long_about = None)]
struct Cli {
    /// Database directory
    #[arg(short, long)]
    database: PathBuf,

    /// Database language (e.g. java)
    #[arg(short, long)]
    language: String,

    /// Database name; defaults to the database directory name
    #[arg(short, long)]
    name: Option<String>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Checkout containing the model generator queries
    #[arg(long)]
    ql_dir: Option<PathBuf>,

    /// Workspace folder (repeatable); the one named `ql` receives the model file
    #[arg(short, long = "workspace")]
    workspace_folders: Vec<PathBuf>,

    /// `codeql` executable
    #[arg(long)]
    codeql: Option<PathBuf>,

    /// Directory for query results
    #[arg(long)]
    query_storage_dir: Option<PathBuf>,

    /// Ignore the existing model file instead of merging into it
    #[arg(long)]
    fresh: bool,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::from_yaml(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => GeneratorConfig::default(),
        };

        if let Some(codeql) = &self.codeql {
            config.codeql_path = codeql.clone();
        }
        if let Some(ql_dir) = &self.ql_dir {
            config.ql_dir = Some(ql_dir.clone());
        }
        if let Some(dir) = &self.query_storage_dir {
            config.query_storage_dir = dir.clone();
        }
        config
            .workspace_folders
            .extend(self.workspace_folders.iter().cloned());

        Ok(config)
    }

    fn database_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.database
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "database".to_string())
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling model generation");
                token.cancel();
            }
        });
    }

    let progress: ProgressCallback = Arc::new(|update: ProgressUpdate| {
        if update.is_clear() {
            debug!("Progress cleared");
        } else {
            info!("[{}/{}] {}", update.step, update.max_step, update.message);
        }
    });

    let result = run(cli, progress.clone(), token).await;
    progress(ProgressUpdate::clear());

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, progress: ProgressCallback, token: CancellationToken) -> anyhow::Result<()> {
    let config = cli.load_config()?;
    let ql_dir = config.resolve_ql_dir()?;
    let database = DatabaseItem::new(cli.database_name(), cli.language.clone(), cli.database.clone());

    let store = YamlModelStore::new(&database.language);
    let model_file = match resolve_model_file(
        &config.workspace_folders,
        &database.language,
        &database.name,
    ) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("{}; generated models will not be saved", e);
            None
        }
    };

    let mut models = match &model_file {
        Some(path) if !cli.fresh => store.load(path).await.unwrap_or_default(),
        _ => ModelMap::new(),
    };
    let existing = models.len();

    let codeql = Arc::new(CodeQlCli::new(&config.codeql_path));
    let outcome = generate_flow_model(
        codeql.clone(),
        codeql,
        config.query_storage_dir.clone(),
        ql_dir,
        database,
        &mut models,
        progress,
        token,
    )
    .await;

    for kind in ModelKind::ALL {
        info!("{} models: {}", kind, models.of_kind(kind).count());
    }
    info!("{} models total ({} before generation)", models.len(), existing);

    match model_file {
        Some(path) => save_generated(&store, &path, &models, outcome)
            .await
            .with_context(|| format!("generating models for {}", path.display()))?,
        None => outcome?,
    }

    Ok(())
}
