//! Weekly task distribution.
//!
//! Turns a week's task list into per-day task lists. This is a write-time
//! operation run when weekly content changes and the author asks for it;
//! viewing content never distributes.
//!
//! - `RepeatDaily`: every day in the week's range gets the whole list.
//! - `Spread`: tasks are dealt round-robin in list order. The deal runs for
//!   `max(tasks, days)` steps, step `k` giving day `k % days` the task
//!   `k % tasks`, so long lists wrap onto earlier days and short lists
//!   repeat until every day has one.
//!
//! Only the `tasks` field of a day is written. Titles, prompts and habits
//! survive redistribution untouched.

use serde::{Deserialize, Serialize};

use crate::program::{DayContent, DayRange, DistributionPolicy, ProgramTask};

/// Tasks a single day receives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayAssignment {
    pub day_index: u32,
    pub tasks: Vec<ProgramTask>,
}

/// Day-by-day result of distributing one week.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DistributionPlan {
    pub week_number: u32,
    pub policy: DistributionPolicy,
    pub range: DayRange,
    /// One entry per day in `range`, in day order.
    pub assignments: Vec<DayAssignment>,
}

/// Compute assignments for every day in `range`.
pub fn plan_distribution(
    week_number: u32,
    range: DayRange,
    policy: DistributionPolicy,
    weekly_tasks: &[ProgramTask],
) -> DistributionPlan {
    let days: Vec<u32> = range.days().collect();
    let mut assignments: Vec<DayAssignment> = days
        .iter()
        .map(|&day_index| DayAssignment {
            day_index,
            tasks: Vec::new(),
        })
        .collect();

    if !weekly_tasks.is_empty() && !assignments.is_empty() {
        match policy {
            DistributionPolicy::RepeatDaily => {
                for assignment in &mut assignments {
                    assignment.tasks = weekly_tasks.to_vec();
                }
            }
            DistributionPolicy::Spread => {
                let day_count = assignments.len();
                let task_count = weekly_tasks.len();
                for step in 0..day_count.max(task_count) {
                    assignments[step % day_count]
                        .tasks
                        .push(weekly_tasks[step % task_count].clone());
                }
            }
        }
    }

    tracing::debug!(
        week_number,
        ?policy,
        days = assignments.len(),
        tasks = weekly_tasks.len(),
        "planned weekly task distribution"
    );

    DistributionPlan {
        week_number,
        policy,
        range,
        assignments,
    }
}

impl DistributionPlan {
    pub fn tasks_for(&self, day_index: u32) -> Option<&[ProgramTask]> {
        self.assignments
            .iter()
            .find(|a| a.day_index == day_index)
            .map(|a| a.tasks.as_slice())
    }

    /// Overwrite the `tasks` of the days in range, leaving every other field
    /// alone.
    ///
    /// Returns the records that must be written: every existing day in range,
    /// plus new day records for days that receive tasks but had none. Days
    /// outside the range are not returned.
    pub fn apply(&self, days: &[DayContent]) -> Vec<DayContent> {
        self.apply_to_layer(days, false)
    }

    /// [`apply`](Self::apply) for a cohort or client layer. Every day in range
    /// gets a record, so an empty assignment hides the tasks the day would
    /// otherwise inherit from a lower layer.
    pub fn apply_override(&self, days: &[DayContent]) -> Vec<DayContent> {
        self.apply_to_layer(days, true)
    }

    fn apply_to_layer(&self, days: &[DayContent], write_empty: bool) -> Vec<DayContent> {
        let mut writes = Vec::with_capacity(self.assignments.len());
        for assignment in &self.assignments {
            match days.iter().find(|d| d.day_index == assignment.day_index) {
                Some(existing) => {
                    let mut day = existing.clone();
                    day.tasks = Some(assignment.tasks.clone());
                    writes.push(day);
                }
                None if write_empty || !assignment.tasks.is_empty() => {
                    let mut day = DayContent::new(assignment.day_index);
                    day.tasks = Some(assignment.tasks.clone());
                    writes.push(day);
                }
                None => {}
            }
        }
        writes
    }
}

/// Distribute a week's tasks over `days` and return the updated day list,
/// including untouched days outside the range, ordered by day index.
pub fn distribute(
    week_number: u32,
    range: DayRange,
    policy: DistributionPolicy,
    weekly_tasks: &[ProgramTask],
    days: &[DayContent],
) -> (DistributionPlan, Vec<DayContent>) {
    let plan = plan_distribution(week_number, range, policy, weekly_tasks);
    let mut updated: Vec<DayContent> = days
        .iter()
        .filter(|d| !range.contains(d.day_index))
        .cloned()
        .collect();
    updated.extend(plan.apply(days));
    updated.sort_by_key(|d| d.day_index);
    (plan, updated)
}
