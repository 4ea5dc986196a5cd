use clap::{Args, Subcommand};
use serde::Serialize;

use super::{open_engine, print_json, CliResult, SnapshotArg};

#[derive(Args)]
pub struct CapacityArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArg,
    /// User id
    #[arg(long)]
    pub user: String,
}

#[derive(Subcommand)]
pub enum FocusAction {
    /// Focus list capacity from the user's active enrollments
    Capacity(CapacityArgs),
}

#[derive(Serialize)]
struct CapacityOutput<'a> {
    user_id: &'a str,
    capacity: u32,
}

pub fn run(action: FocusAction) -> CliResult {
    match action {
        FocusAction::Capacity(args) => {
            let engine = open_engine(&args.snapshot.snapshot)?;
            let capacity = engine.focus_capacity(&args.user)?;
            print_json(&CapacityOutput {
                user_id: &args.user,
                capacity,
            })
        }
    }
}
