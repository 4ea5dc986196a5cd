//! Enrollments, cohorts and the enrollment status machine.
//!
//! ```text
//!   UPCOMING ──> ACTIVE ──> COMPLETED
//!      |           |
//!      +───────────+──────> STOPPED
//!
//!   evergreen only: COMPLETED | STOPPED | ACTIVE ──restart──> ACTIVE
//! ```
//!
//! Transitions are one-directional. The only way back to `Active` is a
//! cycle restart on an evergreen program, which appends to
//! `cycle_started_at`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Program;
use crate::error::{TransitionError, ValidationError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    #[default]
    Upcoming,
    Active,
    Completed,
    Stopped,
}

impl EnrollmentStatus {
    /// Check if a regular (non-restart) transition is valid.
    pub fn can_transition_to(&self, to: &EnrollmentStatus) -> bool {
        if self == to {
            return true;
        }
        match self {
            EnrollmentStatus::Upcoming => {
                matches!(to, EnrollmentStatus::Active | EnrollmentStatus::Stopped)
            }
            EnrollmentStatus::Active => {
                matches!(to, EnrollmentStatus::Completed | EnrollmentStatus::Stopped)
            }
            EnrollmentStatus::Completed | EnrollmentStatus::Stopped => false,
        }
    }
}

/// A time-bound group instance of a group program.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cohort {
    pub id: String,
    pub program_id: String,
    pub name: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub enrollment_open: bool,
    #[serde(default)]
    pub capacity: Option<u32>,
}

/// Binding of one user to one program (and cohort, for group programs).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Enrollment {
    pub id: String,
    pub user_id: String,
    pub program_id: String,
    #[serde(default)]
    pub cohort_id: Option<String>,
    #[serde(default)]
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// One entry per evergreen restart, in the order they were logged.
    #[serde(default)]
    pub cycle_started_at: Vec<DateTime<Utc>>,
}

impl Enrollment {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        program_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            program_id: program_id.into(),
            cohort_id: None,
            status: EnrollmentStatus::Upcoming,
            started_at: None,
            cycle_started_at: Vec::new(),
        }
    }

    /// Move to `to` if the status machine allows it.
    pub fn transition_to(&mut self, to: EnrollmentStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(&to) {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Activate an upcoming enrollment, stamping its start.
    pub fn activate(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.transition_to(EnrollmentStatus::Active)?;
        if self.started_at.is_none() {
            self.started_at = Some(at);
        }
        Ok(())
    }

    /// Begin a new cycle of an evergreen program at `at`.
    pub fn restart_cycle(
        &mut self,
        program: &Program,
        at: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        if !program.is_evergreen() {
            return Err(ValidationError::InvalidValue {
                field: "duration_type".into(),
                message: format!("program '{}' is not evergreen", program.id),
            });
        }
        if self.status == EnrollmentStatus::Upcoming {
            return Err(ValidationError::InvalidValue {
                field: "status".into(),
                message: "an upcoming enrollment has no cycle to restart".into(),
            });
        }
        self.cycle_started_at.push(at);
        self.status = EnrollmentStatus::Active;
        Ok(())
    }
}
