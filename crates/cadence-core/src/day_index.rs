//! Current day-of-program for an enrollment.
//!
//! ## Policy by status
//!
//! ```text
//! upcoming  -> 0            (nothing to show yet)
//! stopped   -> 0            (frozen, no "today")
//! completed -> length_days  (always the final day)
//! active    -> days_between(cycle start, today) + 1, clamped to 1..=length_days
//! ```
//!
//! An active enrollment without a start timestamp degrades to 0 and reports
//! an integrity warning instead of failing.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::{days_between, to_calendar_date};
use crate::cycle::{active_cycle, ActiveCycle};
use crate::error::CoreError;
use crate::program::{Enrollment, EnrollmentStatus, Program};

/// Recoverable data problem detected while computing a day index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityWarning {
    InconsistentEnrollment { enrollment_id: String, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayIndexResult {
    /// 0 when there is no current day, else `1..=length_days`.
    pub day_index: u32,
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub cycle: Option<ActiveCycle>,
    /// The raw count ran past the end of an evergreen cycle; the caller
    /// should start a new cycle.
    #[serde(default)]
    pub cycle_overrun: bool,
    #[serde(default)]
    pub warning: Option<IntegrityWarning>,
}

impl DayIndexResult {
    fn terminal(status: EnrollmentStatus, day_index: u32) -> Self {
        Self {
            day_index,
            status,
            cycle: None,
            cycle_overrun: false,
            warning: None,
        }
    }

    pub fn has_current_day(&self) -> bool {
        self.day_index > 0
    }
}

/// Compute the current day index of `enrollment` as of `as_of`, with dates
/// taken in the reference `zone`.
pub fn current_day_index(
    enrollment: &Enrollment,
    program: &Program,
    as_of: DateTime<Utc>,
    zone: FixedOffset,
) -> DayIndexResult {
    match enrollment.status {
        EnrollmentStatus::Upcoming | EnrollmentStatus::Stopped => {
            DayIndexResult::terminal(enrollment.status, 0)
        }
        EnrollmentStatus::Completed => {
            DayIndexResult::terminal(enrollment.status, program.length_days)
        }
        EnrollmentStatus::Active => active_day_index(enrollment, program, as_of, zone),
    }
}

fn active_day_index(
    enrollment: &Enrollment,
    program: &Program,
    as_of: DateTime<Utc>,
    zone: FixedOffset,
) -> DayIndexResult {
    let cycle = match active_cycle(enrollment, program) {
        Ok(cycle) => cycle,
        Err(CoreError::InconsistentEnrollment {
            enrollment_id,
            reason,
        }) => {
            tracing::warn!(
                enrollment_id = %enrollment_id,
                reason = %reason,
                "active enrollment has no start; reporting day 0"
            );
            let mut result = DayIndexResult::terminal(EnrollmentStatus::Active, 0);
            result.warning = Some(IntegrityWarning::InconsistentEnrollment {
                enrollment_id,
                reason,
            });
            return result;
        }
        Err(other) => {
            let mut result = DayIndexResult::terminal(EnrollmentStatus::Active, 0);
            result.warning = Some(IntegrityWarning::InconsistentEnrollment {
                enrollment_id: enrollment.id.clone(),
                reason: other.to_string(),
            });
            return result;
        }
    };

    let start = to_calendar_date(cycle.started_at, zone);
    let today = to_calendar_date(as_of, zone);
    let raw = days_between(start, today, program.include_weekends).saturating_add(1);
    let length = program.length_days.max(1);
    let cycle_overrun = program.is_evergreen() && raw > length;
    if cycle_overrun {
        tracing::warn!(
            enrollment_id = %enrollment.id,
            cycle = cycle.number,
            raw_day = raw,
            length_days = length,
            "evergreen cycle has run past its last day"
        );
    }

    DayIndexResult {
        day_index: raw.clamp(1, length),
        status: EnrollmentStatus::Active,
        cycle: Some(cycle),
        cycle_overrun,
        warning: None,
    }
}
