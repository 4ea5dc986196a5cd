//! # Cadence Core Library
//!
//! Schedule and content resolution for coaching programs. Given a program's
//! structure, an enrollment and an instant, the library answers "which day
//! of the program is it", "what does that day look like for this client",
//! "which tasks go on which day", and keeps the daily focus list within its
//! bounds. It is CLI-first: every operation is reachable through the
//! `cadence-cli` binary, and host applications link the same library.
//!
//! ## Architecture
//!
//! - **Calendar**: pure date math, weekday-only counting
//! - **Cycle / Day index**: current day of an enrollment, evergreen cycles
//! - **Resolver**: template → cohort → client override merge with
//!   per-field provenance, copy-on-first-edit saves
//! - **Distribution**: weekly tasks into day records
//! - **Reindex**: contiguous day ranges after structural edits
//! - **Focus**: bounded focus list and backlog
//!
//! Persistence is a collaborator concern; see the traits in [`store`].
//!
//! ## Key Components
//!
//! - [`ProgramEngine`]: all of the above over a [`Store`]
//! - [`InMemoryStore`]: reference store, loadable from a JSON [`Snapshot`]
//! - [`EngineConfig`]: engine configuration management

pub mod calendar;
pub mod clock;
pub mod config;
pub mod cycle;
pub mod day_index;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod focus;
pub mod program;
pub mod reindex;
pub mod resolver;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use cycle::{active_cycle, ActiveCycle};
pub use day_index::{current_day_index, DayIndexResult, IntegrityWarning};
pub use distribution::{distribute, plan_distribution, DayAssignment, DistributionPlan};
pub use engine::ProgramEngine;
pub use error::{ConfigError, CoreError, Result, TransitionError, ValidationError};
pub use focus::{focus_capacity, FocusEntry, FocusList, FocusListSnapshot, FocusListState};
pub use program::{
    Cohort, DayContent, DayRange, DistributionPolicy, DurationType, Enrollment, EnrollmentStatus,
    Module, Program, ProgramTask, Week, WeekContent,
};
pub use reindex::{
    plan_edits, reindex, ModuleDeletePolicy, ProgramTree, ReindexPlan, StructuralEdit,
};
pub use resolver::{ContentScope, EffectiveDay, EffectiveWeek, Layer, LayerKey, SaveOutcome};
pub use store::{InMemoryStore, Snapshot, Store};
