//! Collaborator interfaces the engine reads and writes through.
//!
//! Persistence belongs to the host application. Lookups return `Ok(None)`
//! for "not found" rather than a default value; the engine decides whether
//! that is an error. [`memory::InMemoryStore`] is the reference
//! implementation used by tests and the CLI.

pub mod memory;

use crate::error::Result;
use crate::program::{Cohort, DayContent, DayRange, Enrollment, Module, Program, Week, WeekContent};
use crate::reindex::ReindexPlan;
use crate::resolver::LayerKey;

pub use memory::{InMemoryStore, Snapshot};

/// Result of a create-if-absent write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome<T> {
    Inserted,
    /// Another writer created the record first; here is what it holds.
    AlreadyExists(T),
}

/// Program structure: modules, weeks and their ranges.
pub trait ProgramStore: Send + Sync {
    fn program(&self, program_id: &str) -> Result<Option<Program>>;

    fn modules(&self, program_id: &str) -> Result<Vec<Module>>;

    fn weeks(&self, program_id: &str) -> Result<Vec<Week>>;

    /// Replace the program's modules and weeks with the plan's and set its
    /// length, atomically.
    fn apply_reindex(&self, program_id: &str, plan: &ReindexPlan) -> Result<()>;
}

/// Read access to enrollments and cohorts.
pub trait EnrollmentStore: Send + Sync {
    fn enrollment(&self, enrollment_id: &str) -> Result<Option<Enrollment>>;

    fn enrollments_for_user(&self, user_id: &str) -> Result<Vec<Enrollment>>;

    fn cohort(&self, cohort_id: &str) -> Result<Option<Cohort>>;
}

/// Week and day content per layer.
///
/// For [`LayerKey::Template`] the week content is the structural week's own
/// content. Every layer's week content belongs to the week node, not its
/// number: after a reorder it follows the week, and writing to a number with
/// no week is `NotFound`.
pub trait ContentStore: Send + Sync {
    fn week_content(
        &self,
        program_id: &str,
        layer: &LayerKey,
        week_number: u32,
    ) -> Result<Option<WeekContent>>;

    fn day_content(
        &self,
        program_id: &str,
        layer: &LayerKey,
        day_index: u32,
    ) -> Result<Option<DayContent>>;

    /// Day records of one layer whose index falls in `range`, ordered by index.
    fn days_in_range(
        &self,
        program_id: &str,
        layer: &LayerKey,
        range: DayRange,
    ) -> Result<Vec<DayContent>>;

    /// Create the week record only if the layer has none for `week_number`.
    fn insert_week_content(
        &self,
        program_id: &str,
        layer: &LayerKey,
        week_number: u32,
        content: WeekContent,
    ) -> Result<InsertOutcome<WeekContent>>;

    /// Create or replace the week record.
    fn put_week_content(
        &self,
        program_id: &str,
        layer: &LayerKey,
        week_number: u32,
        content: WeekContent,
    ) -> Result<()>;

    /// Create the day record only if the layer has none for its index.
    fn insert_day_content(
        &self,
        program_id: &str,
        layer: &LayerKey,
        content: DayContent,
    ) -> Result<InsertOutcome<DayContent>>;

    /// Create or replace the day record.
    fn put_day_content(
        &self,
        program_id: &str,
        layer: &LayerKey,
        content: DayContent,
    ) -> Result<()>;

    /// Returns whether a record was removed.
    fn delete_week_content(
        &self,
        program_id: &str,
        layer: &LayerKey,
        week_number: u32,
    ) -> Result<bool>;

    fn delete_day_content(
        &self,
        program_id: &str,
        layer: &LayerKey,
        day_index: u32,
    ) -> Result<bool>;
}

/// Everything the [`crate::engine::ProgramEngine`] needs.
pub trait Store: ProgramStore + EnrollmentStore + ContentStore {}

impl<T: ProgramStore + EnrollmentStore + ContentStore> Store for T {}
