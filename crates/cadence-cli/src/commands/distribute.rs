use clap::Args;

use super::{open_engine, print_json, save_engine, CliResult, ScopeArgs, SnapshotArg};

#[derive(Args)]
pub struct DistributeArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArg,
    /// Program id
    #[arg(long)]
    pub program: String,
    /// Week number, 1-based
    #[arg(long)]
    pub week: u32,
    #[command(flatten)]
    pub scope: ScopeArgs,
    /// Write the result back to the snapshot; otherwise only print the plan
    #[arg(long)]
    pub write: bool,
}

pub fn run(args: DistributeArgs) -> CliResult {
    let engine = open_engine(&args.snapshot.snapshot)?;
    let scope = args.scope.scope();
    let plan = if args.write {
        let plan = engine.distribute_week(&args.program, args.week, &scope)?;
        save_engine(&engine, &args.snapshot.snapshot)?;
        plan
    } else {
        engine.preview_distribution(&args.program, args.week, &scope)?
    };
    print_json(&plan)
}
