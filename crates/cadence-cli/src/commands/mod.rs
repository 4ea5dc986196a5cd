pub mod config;
pub mod day_index;
pub mod distribute;
pub mod focus;
pub mod reindex;
pub mod resolve;

use cadence_core::{ContentScope, EngineConfig, InMemoryStore, ProgramEngine, Snapshot};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Snapshot file shared by every data command.
#[derive(Args)]
pub struct SnapshotArg {
    /// JSON snapshot of programs, enrollments and content
    #[arg(long)]
    pub snapshot: PathBuf,
}

/// View scope; template when neither flag is given.
#[derive(Args)]
pub struct ScopeArgs {
    /// Cohort id
    #[arg(long, conflicts_with = "client")]
    pub cohort: Option<String>,
    /// Enrollment id of the client
    #[arg(long)]
    pub client: Option<String>,
}

impl ScopeArgs {
    pub fn scope(&self) -> ContentScope {
        match (&self.cohort, &self.client) {
            (Some(cohort), _) => ContentScope::cohort(cohort.clone()),
            (None, Some(client)) => ContentScope::client(client.clone()),
            (None, None) => ContentScope::Template,
        }
    }
}

pub fn open_engine(
    path: &Path,
) -> Result<ProgramEngine<InMemoryStore>, Box<dyn std::error::Error>> {
    let store = InMemoryStore::from_snapshot(Snapshot::load(path)?)?;
    tracing::debug!(path = %path.display(), "loaded snapshot");
    Ok(ProgramEngine::new(store, EngineConfig::load_or_default()))
}

pub fn save_engine(engine: &ProgramEngine<InMemoryStore>, path: &Path) -> CliResult {
    engine.store().to_snapshot()?.save(path)?;
    tracing::info!(path = %path.display(), "wrote snapshot");
    Ok(())
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
