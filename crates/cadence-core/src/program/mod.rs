//! Program structure types: programs, modules, weeks and their day ranges.
//!
//! Content records (tasks, habits, prompts) live in [`content`]; enrollment
//! and cohort state lives in [`enrollment`].

pub mod content;
pub mod enrollment;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, IndexKind, Result, ValidationError};

pub use content::{CourseAssignment, DayContent, Habit, ProgramTask, WeekContent};
pub use enrollment::{Cohort, Enrollment, EnrollmentStatus};

/// Smallest and largest number of focus slots a single program may contribute.
pub const MIN_FOCUS_SLOTS: u32 = 1;
pub const MAX_FOCUS_SLOTS: u32 = 4;

/// Whether a program ends or repeats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DurationType {
    /// Runs once for `length_days` program days.
    #[default]
    Fixed,
    /// Restarts after every `length_days` program days.
    Evergreen,
}

/// Rule for turning weekly tasks into daily task lists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistributionPolicy {
    /// Every day of the week receives the full weekly list.
    #[default]
    RepeatDaily,
    /// Weekly tasks are dealt round-robin across the week's days.
    Spread,
}

/// A coach-authored curriculum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Program {
    pub id: String,
    pub name: String,
    /// Program length in program days. For evergreen programs this is the
    /// length of one cycle.
    pub length_days: u32,
    pub include_weekends: bool,
    #[serde(default)]
    pub duration_type: DurationType,
    /// Focus list capacity contributed by an active enrollment (1-4).
    pub daily_focus_slots: u32,
    /// Default distribution policy for weeks that don't name one.
    #[serde(default)]
    pub task_distribution: Option<DistributionPolicy>,
}

impl Program {
    /// Program days per structural week: 7 with weekends, 5 without.
    pub fn days_per_week(&self) -> u32 {
        if self.include_weekends {
            7
        } else {
            5
        }
    }

    /// Number of structural weeks needed to cover `length_days`.
    pub fn week_count(&self) -> u32 {
        self.length_days.div_ceil(self.days_per_week())
    }

    pub fn is_evergreen(&self) -> bool {
        self.duration_type == DurationType::Evergreen
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.length_days < 1 {
            return Err(ValidationError::InvalidValue {
                field: "length_days".into(),
                message: "must be at least 1".into(),
            });
        }
        if !(MIN_FOCUS_SLOTS..=MAX_FOCUS_SLOTS).contains(&self.daily_focus_slots) {
            return Err(ValidationError::InvalidValue {
                field: "daily_focus_slots".into(),
                message: format!(
                    "must be between {MIN_FOCUS_SLOTS} and {MAX_FOCUS_SLOTS}, got {}",
                    self.daily_focus_slots
                ),
            });
        }
        Ok(())
    }

    /// Reject a day index outside `1..=length_days`.
    pub fn check_day(&self, day_index: u32) -> Result<()> {
        if day_index == 0 || day_index > self.length_days {
            return Err(CoreError::OutOfRange {
                kind: IndexKind::Day,
                index: day_index,
                max: self.length_days,
            });
        }
        Ok(())
    }

    /// Reject a week number outside `1..=week_count`.
    pub fn check_week(&self, week_number: u32) -> Result<()> {
        let max = self.week_count();
        if week_number == 0 || week_number > max {
            return Err(CoreError::OutOfRange {
                kind: IndexKind::Week,
                index: week_number,
                max,
            });
        }
        Ok(())
    }
}

/// Inclusive, 1-based range of program days.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayRange {
    pub start: u32,
    pub end: u32,
}

impl DayRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, day_index: u32) -> bool {
        day_index >= self.start && day_index <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

/// Top-level grouping of consecutive weeks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Module {
    pub id: String,
    pub program_id: String,
    pub title: String,
    /// Position among the program's modules.
    pub order: u32,
    /// Union of the module's week ranges; `None` while it has no weeks.
    #[serde(default)]
    pub range: Option<DayRange>,
}

impl Module {
    /// A new module with a generated id and no range. It is placed by a
    /// structural edit and gets its range from the next reindex.
    pub fn new(program_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: format!("module-{}", uuid::Uuid::new_v4()),
            program_id: program_id.into(),
            title: title.into(),
            order: 0,
            range: None,
        }
    }
}

/// A structural week. Its `content` is the template layer for the week.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Week {
    pub id: String,
    pub program_id: String,
    pub module_id: String,
    /// Global 1-based week number, contiguous across the program.
    pub week_number: u32,
    /// Position within the owning module.
    pub order: u32,
    #[serde(default)]
    pub range: Option<DayRange>,
    #[serde(default)]
    pub content: WeekContent,
}

impl Week {
    /// A new, empty week in `module_id` with a generated id. Week number and
    /// range are assigned by the next reindex.
    pub fn new(program_id: impl Into<String>, module_id: impl Into<String>) -> Self {
        Self {
            id: format!("week-{}", uuid::Uuid::new_v4()),
            program_id: program_id.into(),
            module_id: module_id.into(),
            week_number: 0,
            order: 0,
            range: None,
            content: WeekContent::default(),
        }
    }
}
