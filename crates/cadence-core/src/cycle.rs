//! Cycle resolution for evergreen programs.
//!
//! An evergreen enrollment restarts "day 1" each time a restart is logged.
//! The active cycle is the most recent restart; fixed programs only ever
//! have cycle 1.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::program::{Enrollment, Program};

/// The repetition of a program an enrollment is currently in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveCycle {
    /// 1-based cycle number.
    pub number: u32,
    pub started_at: DateTime<Utc>,
}

/// Resolve the active cycle for `enrollment`.
///
/// # Errors
/// `InconsistentEnrollment` if the cycle start cannot be determined (no
/// `started_at` and, for evergreen programs, no logged restart).
pub fn active_cycle(enrollment: &Enrollment, program: &Program) -> Result<ActiveCycle> {
    if program.is_evergreen() {
        if let Some(latest) = enrollment.cycle_started_at.iter().max() {
            let restarts = u32::try_from(enrollment.cycle_started_at.len()).unwrap_or(u32::MAX);
            return Ok(ActiveCycle {
                number: restarts.saturating_add(1),
                started_at: *latest,
            });
        }
    }

    let started_at = enrollment
        .started_at
        .ok_or_else(|| CoreError::InconsistentEnrollment {
            enrollment_id: enrollment.id.clone(),
            reason: "missing started_at".into(),
        })?;
    Ok(ActiveCycle {
        number: 1,
        started_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{DurationType, EnrollmentStatus};
    use chrono::{Duration, TimeZone};

    fn program(duration_type: DurationType) -> Program {
        Program {
            id: "p".into(),
            name: "P".into(),
            length_days: 21,
            include_weekends: true,
            duration_type,
            daily_focus_slots: 1,
            task_distribution: None,
        }
    }

    fn enrollment(started_at: Option<DateTime<Utc>>, log: Vec<DateTime<Utc>>) -> Enrollment {
        Enrollment {
            status: EnrollmentStatus::Active,
            started_at,
            cycle_started_at: log,
            ..Enrollment::new("e1", "u1", "p")
        }
    }

    #[test]
    fn fixed_program_is_always_cycle_one() {
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        // A stray restart log on a fixed program is ignored.
        let e = enrollment(Some(start), vec![start + Duration::days(30)]);
        let cycle = active_cycle(&e, &program(DurationType::Fixed)).unwrap();
        assert_eq!(cycle, ActiveCycle { number: 1, started_at: start });
    }

    #[test]
    fn evergreen_without_restarts_starts_at_enrollment() {
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let cycle = active_cycle(
            &enrollment(Some(start), vec![]),
            &program(DurationType::Evergreen),
        )
        .unwrap();
        assert_eq!(cycle.number, 1);
        assert_eq!(cycle.started_at, start);
    }

    #[test]
    fn evergreen_uses_latest_restart_regardless_of_log_order() {
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let second = start + Duration::days(21);
        let third = start + Duration::days(42);
        let e = enrollment(Some(start), vec![third, second]);
        let cycle = active_cycle(&e, &program(DurationType::Evergreen)).unwrap();
        assert_eq!(cycle, ActiveCycle { number: 3, started_at: third });
    }

    #[test]
    fn missing_start_is_inconsistent() {
        let err =
            active_cycle(&enrollment(None, vec![]), &program(DurationType::Fixed)).unwrap_err();
        assert!(matches!(err, CoreError::InconsistentEnrollment { .. }));
    }
}
