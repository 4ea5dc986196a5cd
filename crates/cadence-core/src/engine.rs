//! `ProgramEngine`: the components wired over a [`Store`].
//!
//! The free functions in the component modules stay usable on their own;
//! the engine adds store lookups, configuration and the per-program
//! structural edit guard.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use std::collections::HashSet;
use std::sync::{Condvar, Mutex};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::day_index::{self, DayIndexResult};
use crate::distribution::{plan_distribution, DistributionPlan};
use crate::error::{CoreError, EntityKind, Result};
use crate::focus::{self, FocusListState};
use crate::program::{DayContent, EnrollmentStatus, WeekContent};
use crate::reindex::{plan_edits, ProgramTree, ReindexPlan, StructuralEdit};
use crate::resolver::{
    self, require_program, ContentScope, EffectiveDay, EffectiveWeek, LayerKey, SaveOutcome,
};
use crate::store::Store;

/// Programs with a structural edit in flight.
#[derive(Debug, Default)]
struct EditGuards {
    busy: Mutex<HashSet<String>>,
    released: Condvar,
}

/// Held while a structural edit runs; releases the program on drop.
struct EditGuard<'a> {
    guards: &'a EditGuards,
    program_id: String,
}

impl EditGuards {
    fn acquire(&self, program_id: &str, wait: bool) -> Result<EditGuard<'_>> {
        let poisoned = |e: String| CoreError::Store(format!("edit guard poisoned: {e}"));
        let mut busy = self.busy.lock().map_err(|e| poisoned(e.to_string()))?;
        while busy.contains(program_id) {
            if !wait {
                return Err(CoreError::StructuralEditInProgress {
                    program_id: program_id.to_string(),
                });
            }
            busy = self
                .released
                .wait(busy)
                .map_err(|e| poisoned(e.to_string()))?;
        }
        busy.insert(program_id.to_string());
        Ok(EditGuard {
            guards: self,
            program_id: program_id.to_string(),
        })
    }
}

impl Drop for EditGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut busy) = self.guards.busy.lock() {
            busy.remove(&self.program_id);
        }
        self.guards.released.notify_all();
    }
}

pub struct ProgramEngine<S: Store> {
    store: S,
    config: EngineConfig,
    edits: EditGuards,
}

impl<S: Store> ProgramEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            edits: EditGuards::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reference zone for instant to date conversion.
    pub fn zone(&self) -> FixedOffset {
        self.config.zone().unwrap_or_else(|| Utc.fix())
    }

    // ── Day index ────────────────────────────────────────────────────

    pub fn day_index_as_of(
        &self,
        enrollment_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<DayIndexResult> {
        let enrollment = self
            .store
            .enrollment(enrollment_id)?
            .ok_or_else(|| CoreError::not_found(EntityKind::Enrollment, enrollment_id))?;
        let program = require_program(&self.store, &enrollment.program_id)?;
        Ok(day_index::current_day_index(&enrollment, &program, as_of, self.zone()))
    }

    pub fn current_day_index(
        &self,
        enrollment_id: &str,
        clock: &dyn Clock,
    ) -> Result<DayIndexResult> {
        self.day_index_as_of(enrollment_id, clock.now())
    }

    /// Today's content for an enrollment, or `None` when it has no current
    /// day (upcoming, stopped, or inconsistent).
    pub fn today(&self, enrollment_id: &str, clock: &dyn Clock) -> Result<Option<EffectiveDay>> {
        let result = self.current_day_index(enrollment_id, clock)?;
        if !result.has_current_day() {
            return Ok(None);
        }
        let program_id = self
            .store
            .enrollment(enrollment_id)?
            .map(|e| e.program_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Enrollment, enrollment_id))?;
        resolver::resolve_day(
            &self.store,
            &program_id,
            result.day_index,
            &ContentScope::client(enrollment_id),
        )
        .map(Some)
    }

    // ── Content ──────────────────────────────────────────────────────

    pub fn resolve_day(
        &self,
        program_id: &str,
        day_index: u32,
        scope: &ContentScope,
    ) -> Result<EffectiveDay> {
        resolver::resolve_day(&self.store, program_id, day_index, scope)
    }

    pub fn resolve_week(
        &self,
        program_id: &str,
        week_number: u32,
        scope: &ContentScope,
    ) -> Result<EffectiveWeek> {
        resolver::resolve_week(&self.store, program_id, week_number, scope)
    }

    pub fn save_day(
        &self,
        program_id: &str,
        day_index: u32,
        scope: &ContentScope,
        patch: &DayContent,
    ) -> Result<SaveOutcome<DayContent>> {
        resolver::save_day(
            &self.store,
            program_id,
            day_index,
            scope,
            patch,
            self.config.content.copy_on_first_edit,
        )
    }

    pub fn save_week(
        &self,
        program_id: &str,
        week_number: u32,
        scope: &ContentScope,
        patch: &WeekContent,
    ) -> Result<SaveOutcome<WeekContent>> {
        resolver::save_week(
            &self.store,
            program_id,
            week_number,
            scope,
            patch,
            self.config.content.copy_on_first_edit,
        )
    }

    pub fn reset_day(
        &self,
        program_id: &str,
        day_index: u32,
        scope: &ContentScope,
    ) -> Result<bool> {
        resolver::reset_day(&self.store, program_id, day_index, scope)
    }

    pub fn reset_week(
        &self,
        program_id: &str,
        week_number: u32,
        scope: &ContentScope,
    ) -> Result<bool> {
        resolver::reset_week(&self.store, program_id, week_number, scope)
    }

    // ── Distribution ─────────────────────────────────────────────────

    /// The plan `distribute_week` would apply, without writing.
    pub fn preview_distribution(
        &self,
        program_id: &str,
        week_number: u32,
        scope: &ContentScope,
    ) -> Result<DistributionPlan> {
        let program = require_program(&self.store, program_id)?;
        let week = self.resolve_week(program_id, week_number, scope)?;
        let range = week.range.ok_or_else(|| {
            CoreError::not_found(EntityKind::Week, format!("{program_id}#{week_number}"))
        })?;
        let policy = week.effective_policy(&program, self.config.distribution.default_policy);
        let tasks = week.weekly_tasks.value.unwrap_or_default();
        Ok(plan_distribution(week_number, range, policy, &tasks))
    }

    /// Write the week's tasks into the day records of the scope's layer.
    pub fn distribute_week(
        &self,
        program_id: &str,
        week_number: u32,
        scope: &ContentScope,
    ) -> Result<DistributionPlan> {
        let plan = self.preview_distribution(program_id, week_number, scope)?;
        let layer = scope.write_key();
        let existing = self.store.days_in_range(program_id, &layer, plan.range)?;
        let writes = match layer {
            LayerKey::Template => plan.apply(&existing),
            _ => plan.apply_override(&existing),
        };
        for day in &writes {
            self.store.put_day_content(program_id, &layer, day.clone())?;
        }
        tracing::info!(
            program_id,
            week_number,
            layer = ?layer.layer(),
            policy = ?plan.policy,
            days_written = writes.len(),
            "distributed weekly tasks"
        );
        Ok(plan)
    }

    // ── Structure ────────────────────────────────────────────────────

    /// Reindex result of applying `edits`, without writing. An empty batch
    /// recomputes the current structure.
    pub fn plan_structural_edits(
        &self,
        program_id: &str,
        edits: &[StructuralEdit],
    ) -> Result<ReindexPlan> {
        let program = require_program(&self.store, program_id)?;
        let tree = ProgramTree::new(
            program,
            self.store.modules(program_id)?,
            self.store.weeks(program_id)?,
        );
        plan_edits(&tree, edits)
    }

    /// Apply `edits` as one transaction and persist the reindexed structure.
    ///
    /// # Errors
    /// `StructuralEditInProgress` if another edit on the program is running
    /// and `structure.reject_concurrent_edits` is set. Any edit or reindex
    /// failure leaves the stored structure untouched.
    pub fn apply_structural_edits(
        &self,
        program_id: &str,
        edits: &[StructuralEdit],
    ) -> Result<ReindexPlan> {
        let wait = !self.config.structure.reject_concurrent_edits;
        let _guard = self.edits.acquire(program_id, wait)?;
        let plan = self.plan_structural_edits(program_id, edits)?;
        self.store.apply_reindex(program_id, &plan)?;
        tracing::info!(
            program_id,
            edits = edits.len(),
            changed = plan.changes.len(),
            removed_weeks = plan.removed_week_ids.len(),
            "applied structural edits"
        );
        Ok(plan)
    }

    // ── Focus ────────────────────────────────────────────────────────

    /// Focus capacity from the user's active enrollments.
    pub fn focus_capacity(&self, user_id: &str) -> Result<u32> {
        let mut programs = Vec::new();
        for enrollment in self.store.enrollments_for_user(user_id)? {
            if enrollment.status == EnrollmentStatus::Active {
                programs.push(require_program(&self.store, &enrollment.program_id)?);
            }
        }
        Ok(focus::focus_capacity(&programs, self.config.focus.default_capacity))
    }

    /// An empty focus list for `user_id` on `date`, sized to their capacity.
    pub fn new_focus_list(&self, user_id: &str, date: NaiveDate) -> Result<FocusListState> {
        Ok(FocusListState::new(user_id, date, self.focus_capacity(user_id)?))
    }
}
