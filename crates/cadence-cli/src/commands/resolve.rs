use clap::{Args, Subcommand};

use super::{open_engine, print_json, CliResult, ScopeArgs, SnapshotArg};

#[derive(Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArg,
    /// Program id
    #[arg(long)]
    pub program: String,
    /// Day index or week number, 1-based
    #[arg(long)]
    pub index: u32,
    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Subcommand)]
pub enum ResolveAction {
    /// Resolve a day
    Day(ResolveArgs),
    /// Resolve a week
    Week(ResolveArgs),
}

pub fn run(action: ResolveAction) -> CliResult {
    match action {
        ResolveAction::Day(args) => {
            let engine = open_engine(&args.snapshot.snapshot)?;
            let day = engine.resolve_day(&args.program, args.index, &args.scope.scope())?;
            print_json(&day)
        }
        ResolveAction::Week(args) => {
            let engine = open_engine(&args.snapshot.snapshot)?;
            let week = engine.resolve_week(&args.program, args.index, &args.scope.scope())?;
            print_json(&week)
        }
    }
}
