use cadence_core::SystemClock;
use chrono::{DateTime, Utc};
use clap::Args;

use super::{open_engine, print_json, CliResult, SnapshotArg};

#[derive(Args)]
pub struct DayIndexArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArg,
    /// Enrollment id
    #[arg(long)]
    pub enrollment: String,
    /// Evaluate at this instant (RFC 3339) instead of now
    #[arg(long)]
    pub as_of: Option<String>,
}

pub fn run(args: DayIndexArgs) -> CliResult {
    let engine = open_engine(&args.snapshot.snapshot)?;
    let result = match args.as_of {
        Some(raw) => {
            let as_of = DateTime::parse_from_rfc3339(&raw)
                .map_err(|e| format!("invalid --as-of '{raw}': {e}"))?
                .with_timezone(&Utc);
            engine.day_index_as_of(&args.enrollment, as_of)?
        }
        None => engine.current_day_index(&args.enrollment, &SystemClock)?,
    };
    print_json(&result)
}
