use cadence_core::StructuralEdit;
use clap::Args;
use std::path::PathBuf;

use super::{open_engine, print_json, save_engine, CliResult, SnapshotArg};

#[derive(Args)]
pub struct ReindexArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArg,
    /// Program id
    #[arg(long)]
    pub program: String,
    /// JSON array of structural edits to apply before reindexing
    #[arg(long)]
    pub edits: Option<PathBuf>,
    /// Write the result back to the snapshot; otherwise only print the plan
    #[arg(long)]
    pub write: bool,
}

pub fn run(args: ReindexArgs) -> CliResult {
    let edits: Vec<StructuralEdit> = match &args.edits {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => Vec::new(),
    };
    let engine = open_engine(&args.snapshot.snapshot)?;
    let plan = if args.write {
        let plan = engine.apply_structural_edits(&args.program, &edits)?;
        save_engine(&engine, &args.snapshot.snapshot)?;
        plan
    } else {
        engine.plan_structural_edits(&args.program, &edits)?
    };
    print_json(&plan)
}
