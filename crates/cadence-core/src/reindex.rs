//! Structural reindexing of modules and weeks.
//!
//! After any structural edit the program's weeks are laid end to end in
//! module order, then week order, and each gets a fresh contiguous range of
//! `days_per_week` days (the last one truncated at `length_days`). Week
//! numbers are reassigned in the same walk and every module's range becomes
//! the span of its weeks.
//!
//! Day records are keyed by day index and are never moved here, so after a
//! reorder a day's content belongs to whichever week now covers its index.
//!
//! Everything is computed on copies. A result that does not partition
//! `1..=length_days` exactly is rejected as a whole.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{CoreError, EntityKind, Result, ValidationError};
use crate::program::{DayRange, Module, Program, Week};

/// What happens to a deleted module's weeks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModuleDeletePolicy {
    /// Delete the module's weeks with it.
    Delete,
    /// Hand the weeks to the previous module, or the next if there is none.
    Move,
}

/// A single change to the program tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StructuralEdit {
    ReorderModules {
        module_ids: Vec<String>,
    },
    ReorderWeeks {
        module_id: String,
        week_ids: Vec<String>,
    },
    MoveWeek {
        week_id: String,
        to_module_id: String,
        position: usize,
    },
    InsertModule {
        module: Module,
        position: usize,
    },
    /// Inserts `week` into `week.module_id` at `position`.
    InsertWeek {
        week: Week,
        position: usize,
    },
    DeleteModule {
        module_id: String,
        policy: ModuleDeletePolicy,
    },
    DeleteWeek {
        week_id: String,
    },
    /// Change the program length, usually together with adding or removing
    /// weeks in the same batch.
    SetLength {
        length_days: u32,
    },
}

/// Working copy of a program's structure.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramTree {
    pub program: Program,
    pub modules: Vec<Module>,
    pub weeks: Vec<Week>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Module,
    Week,
}

/// A module or week whose range moved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RangeChange {
    pub kind: NodeKind,
    pub id: String,
    pub before: Option<DayRange>,
    pub after: Option<DayRange>,
}

/// Full result of a reindex, ready to persist in one write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReindexPlan {
    pub program_id: String,
    pub length_days: u32,
    pub modules: Vec<Module>,
    pub weeks: Vec<Week>,
    pub changes: Vec<RangeChange>,
    #[serde(default)]
    pub removed_module_ids: Vec<String>,
    #[serde(default)]
    pub removed_week_ids: Vec<String>,
}

impl ProgramTree {
    pub fn new(program: Program, modules: Vec<Module>, weeks: Vec<Week>) -> Self {
        Self {
            program,
            modules,
            weeks,
        }
    }

    fn module_ids_in_order(&self) -> Vec<String> {
        let mut modules: Vec<&Module> = self.modules.iter().collect();
        modules.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        modules.into_iter().map(|m| m.id.clone()).collect()
    }

    fn week_ids_in_order(&self, module_id: &str) -> Vec<String> {
        let mut weeks: Vec<&Week> = self
            .weeks
            .iter()
            .filter(|w| w.module_id == module_id)
            .collect();
        weeks.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        weeks.into_iter().map(|w| w.id.clone()).collect()
    }

    fn require_module(&self, module_id: &str) -> Result<()> {
        if self.modules.iter().any(|m| m.id == module_id) {
            Ok(())
        } else {
            Err(CoreError::not_found(EntityKind::Module, module_id))
        }
    }

    fn set_module_order(&mut self, ids: &[String]) {
        for module in &mut self.modules {
            if let Some(pos) = ids.iter().position(|id| *id == module.id) {
                module.order = pos as u32;
            }
        }
    }

    fn set_week_order(&mut self, module_id: &str, ids: &[String]) {
        for week in &mut self.weeks {
            if let Some(pos) = ids.iter().position(|id| *id == week.id) {
                week.module_id = module_id.to_string();
                week.order = pos as u32;
            }
        }
    }

    /// Apply one edit in place. Ranges are stale until [`reindex`] runs.
    pub fn apply(&mut self, edit: &StructuralEdit) -> Result<()> {
        match edit {
            StructuralEdit::ReorderModules { module_ids } => {
                let current = self.module_ids_in_order();
                ensure_permutation("modules", &current, module_ids)?;
                self.set_module_order(module_ids);
            }
            StructuralEdit::ReorderWeeks { module_id, week_ids } => {
                self.require_module(module_id)?;
                let current = self.week_ids_in_order(module_id);
                ensure_permutation("weeks", &current, week_ids)?;
                self.set_week_order(module_id, week_ids);
            }
            StructuralEdit::MoveWeek {
                week_id,
                to_module_id,
                position,
            } => {
                self.require_module(to_module_id)?;
                let from_module_id = self
                    .weeks
                    .iter()
                    .find(|w| w.id == *week_id)
                    .map(|w| w.module_id.clone())
                    .ok_or_else(|| CoreError::not_found(EntityKind::Week, week_id))?;

                let mut source = self.week_ids_in_order(&from_module_id);
                source.retain(|id| id != week_id);
                let mut target = if from_module_id == *to_module_id {
                    source.clone()
                } else {
                    self.week_ids_in_order(to_module_id)
                };
                target.insert((*position).min(target.len()), week_id.clone());

                if from_module_id != *to_module_id {
                    self.set_week_order(&from_module_id, &source);
                }
                self.set_week_order(to_module_id, &target);
            }
            StructuralEdit::InsertModule { module, position } => {
                if self.modules.iter().any(|m| m.id == module.id) {
                    return Err(ValidationError::InvalidValue {
                        field: "module.id".into(),
                        message: format!("module '{}' already exists", module.id),
                    }
                    .into());
                }
                let mut ids = self.module_ids_in_order();
                ids.insert((*position).min(ids.len()), module.id.clone());
                let mut module = module.clone();
                module.program_id = self.program.id.clone();
                module.range = None;
                self.modules.push(module);
                self.set_module_order(&ids);
            }
            StructuralEdit::InsertWeek { week, position } => {
                self.require_module(&week.module_id)?;
                if self.weeks.iter().any(|w| w.id == week.id) {
                    return Err(ValidationError::InvalidValue {
                        field: "week.id".into(),
                        message: format!("week '{}' already exists", week.id),
                    }
                    .into());
                }
                let mut ids = self.week_ids_in_order(&week.module_id);
                ids.insert((*position).min(ids.len()), week.id.clone());
                let mut week = week.clone();
                week.program_id = self.program.id.clone();
                week.range = None;
                let module_id = week.module_id.clone();
                self.weeks.push(week);
                self.set_week_order(&module_id, &ids);
            }
            StructuralEdit::DeleteModule { module_id, policy } => {
                self.require_module(module_id)?;
                match policy {
                    ModuleDeletePolicy::Delete => {
                        self.weeks.retain(|w| w.module_id != *module_id);
                    }
                    ModuleDeletePolicy::Move => self.hand_over_weeks(module_id)?,
                }
                self.modules.retain(|m| m.id != *module_id);
                let ids = self.module_ids_in_order();
                self.set_module_order(&ids);
            }
            StructuralEdit::DeleteWeek { week_id } => {
                let module_id = self
                    .weeks
                    .iter()
                    .find(|w| w.id == *week_id)
                    .map(|w| w.module_id.clone())
                    .ok_or_else(|| CoreError::not_found(EntityKind::Week, week_id))?;
                self.weeks.retain(|w| w.id != *week_id);
                let ids = self.week_ids_in_order(&module_id);
                self.set_week_order(&module_id, &ids);
            }
            StructuralEdit::SetLength { length_days } => {
                if *length_days < 1 {
                    return Err(ValidationError::InvalidValue {
                        field: "length_days".into(),
                        message: "must be at least 1".into(),
                    }
                    .into());
                }
                self.program.length_days = *length_days;
            }
        }
        Ok(())
    }

    /// Move a module's weeks to its previous sibling (appended) or, for the
    /// first module, its next sibling (prepended).
    fn hand_over_weeks(&mut self, module_id: &str) -> Result<()> {
        let moving = self.week_ids_in_order(module_id);
        if moving.is_empty() {
            return Ok(());
        }
        let order = self.module_ids_in_order();
        let pos = order.iter().position(|id| id == module_id).unwrap_or(0);

        if pos > 0 {
            let target = order[pos - 1].clone();
            let mut ids = self.week_ids_in_order(&target);
            ids.extend(moving);
            self.set_week_order(&target, &ids);
        } else if let Some(target) = order.get(pos + 1).cloned() {
            let mut ids = moving;
            ids.extend(self.week_ids_in_order(&target));
            self.set_week_order(&target, &ids);
        } else {
            return Err(ValidationError::InvalidValue {
                field: "policy".into(),
                message: format!("module '{module_id}' has no sibling to receive its weeks"),
            }
            .into());
        }
        Ok(())
    }
}

fn ensure_permutation(list: &str, current: &[String], proposed: &[String]) -> Result<()> {
    let a: HashSet<&String> = current.iter().collect();
    let b: HashSet<&String> = proposed.iter().collect();
    if current.len() != proposed.len() || a != b || b.len() != proposed.len() {
        return Err(ValidationError::NotAPermutation {
            list: list.to_string(),
            len: current.len(),
        }
        .into());
    }
    Ok(())
}

/// Recompute every range, week number and order in `tree`.
///
/// # Errors
/// `StructuralInvariantViolation` when a week references a missing module,
/// when weeks run past `length_days`, or when they stop short of it.
pub fn reindex(tree: &ProgramTree) -> Result<ReindexPlan> {
    let program = &tree.program;
    let program_id = program.id.as_str();
    let module_ids: HashSet<&str> = tree.modules.iter().map(|m| m.id.as_str()).collect();
    if let Some(orphan) = tree
        .weeks
        .iter()
        .find(|w| !module_ids.contains(w.module_id.as_str()))
    {
        return Err(CoreError::structural(
            program_id,
            format!("week '{}' belongs to unknown module '{}'", orphan.id, orphan.module_id),
        ));
    }

    let before_modules: HashMap<&str, Option<DayRange>> =
        tree.modules.iter().map(|m| (m.id.as_str(), m.range)).collect();
    let before_weeks: HashMap<&str, Option<DayRange>> =
        tree.weeks.iter().map(|w| (w.id.as_str(), w.range)).collect();

    let per_week = program.days_per_week();
    let length = program.length_days;
    let mut cursor = 1u32;
    let mut week_number = 1u32;
    let mut modules = Vec::with_capacity(tree.modules.len());
    let mut weeks = Vec::with_capacity(tree.weeks.len());

    for (module_pos, module_id) in tree.module_ids_in_order().iter().enumerate() {
        let Some(source) = tree.modules.iter().find(|m| m.id == *module_id) else {
            continue;
        };
        let mut module = source.clone();
        module.order = module_pos as u32;
        module.range = None;

        for (week_pos, week_id) in tree.week_ids_in_order(module_id).iter().enumerate() {
            let Some(source) = tree.weeks.iter().find(|w| w.id == *week_id) else {
                continue;
            };
            if cursor > length {
                return Err(CoreError::structural(
                    program_id,
                    format!(
                        "week '{}' would start on day {cursor}, past the program's {length} days",
                        source.id
                    ),
                ));
            }
            let range = DayRange::new(cursor, (cursor + per_week - 1).min(length));
            cursor = range.end + 1;

            let mut week = source.clone();
            week.order = week_pos as u32;
            week.week_number = week_number;
            week.range = Some(range);
            week_number += 1;

            module.range = Some(match module.range {
                Some(r) => DayRange::new(r.start.min(range.start), r.end.max(range.end)),
                None => range,
            });
            weeks.push(week);
        }
        modules.push(module);
    }

    if cursor <= length {
        return Err(CoreError::structural(
            program_id,
            format!("days {cursor}..={length} are not covered by any week"),
        ));
    }
    verify_partition(program_id, length, &weeks)?;

    let mut changes = Vec::new();
    for module in &modules {
        let before = before_modules.get(module.id.as_str()).copied().flatten();
        if before != module.range {
            changes.push(RangeChange {
                kind: NodeKind::Module,
                id: module.id.clone(),
                before,
                after: module.range,
            });
        }
    }
    for week in &weeks {
        let before = before_weeks.get(week.id.as_str()).copied().flatten();
        if before != week.range {
            changes.push(RangeChange {
                kind: NodeKind::Week,
                id: week.id.clone(),
                before,
                after: week.range,
            });
        }
    }

    tracing::debug!(
        program_id,
        modules = modules.len(),
        weeks = weeks.len(),
        changed = changes.len(),
        "reindexed program structure"
    );

    Ok(ReindexPlan {
        program_id: program_id.to_string(),
        length_days: length,
        modules,
        weeks,
        changes,
        removed_module_ids: Vec::new(),
        removed_week_ids: Vec::new(),
    })
}

/// Apply `edits` in order to a copy of `tree`, then reindex. Nothing is
/// returned unless every edit and the final reindex succeed.
pub fn plan_edits(tree: &ProgramTree, edits: &[StructuralEdit]) -> Result<ReindexPlan> {
    let mut working = tree.clone();
    for edit in edits {
        working.apply(edit)?;
    }
    let mut plan = reindex(&working)?;

    let kept_modules: HashSet<&str> = plan.modules.iter().map(|m| m.id.as_str()).collect();
    let kept_weeks: HashSet<&str> = plan.weeks.iter().map(|w| w.id.as_str()).collect();
    plan.removed_module_ids = tree
        .modules
        .iter()
        .filter(|m| !kept_modules.contains(m.id.as_str()))
        .map(|m| m.id.clone())
        .collect();
    plan.removed_week_ids = tree
        .weeks
        .iter()
        .filter(|w| !kept_weeks.contains(w.id.as_str()))
        .map(|w| w.id.clone())
        .collect();
    Ok(plan)
}

/// Check that the week ranges tile `1..=length_days` with no gaps or
/// overlaps and contiguous week numbers.
pub fn verify_partition(program_id: &str, length_days: u32, weeks: &[Week]) -> Result<()> {
    let mut ranged: Vec<(u32, DayRange)> = Vec::with_capacity(weeks.len());
    for week in weeks {
        let range = week.range.ok_or_else(|| {
            CoreError::structural(program_id, format!("week '{}' has no day range", week.id))
        })?;
        if range.is_empty() {
            return Err(CoreError::structural(
                program_id,
                format!("week '{}' has an empty range", week.id),
            ));
        }
        ranged.push((week.week_number, range));
    }
    ranged.sort_by_key(|(_, r)| r.start);

    let mut expected_start = 1;
    for (position, (week_number, range)) in ranged.iter().enumerate() {
        if range.start != expected_start {
            return Err(CoreError::structural(
                program_id,
                format!("expected a week starting on day {expected_start}, found {}", range.start),
            ));
        }
        if *week_number != position as u32 + 1 {
            return Err(CoreError::structural(
                program_id,
                format!("week numbers are not contiguous at day {}", range.start),
            ));
        }
        expected_start = range.end + 1;
    }
    if expected_start != length_days + 1 {
        return Err(CoreError::structural(
            program_id,
            format!("weeks cover 1..{expected_start} but the program has {length_days} days"),
        ));
    }
    Ok(())
}

/// The week whose range covers `day_index`.
pub fn week_for_day(weeks: &[Week], day_index: u32) -> Option<&Week> {
    weeks
        .iter()
        .find(|w| w.range.is_some_and(|r| r.contains(day_index)))
}

/// The module whose range covers `day_index`.
pub fn module_for_day(modules: &[Module], day_index: u32) -> Option<&Module> {
    modules
        .iter()
        .find(|m| m.range.is_some_and(|r| r.contains(day_index)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{DurationType, WeekContent};

    fn program(length_days: u32, include_weekends: bool) -> Program {
        Program {
            id: "p".into(),
            name: "P".into(),
            length_days,
            include_weekends,
            duration_type: DurationType::Fixed,
            daily_focus_slots: 1,
            task_distribution: None,
        }
    }

    fn module(id: &str, order: u32) -> Module {
        Module {
            id: id.into(),
            program_id: "p".into(),
            title: id.to_uppercase(),
            order,
            range: None,
        }
    }

    fn week(id: &str, module_id: &str, order: u32) -> Week {
        Week {
            id: id.into(),
            program_id: "p".into(),
            module_id: module_id.into(),
            week_number: 0,
            order,
            range: None,
            content: WeekContent::default(),
        }
    }

    /// 30 weekday program: m1 = [w1, w2, w3], m2 = [w4, w5, w6].
    fn tree() -> ProgramTree {
        ProgramTree::new(
            program(30, false),
            vec![module("m1", 0), module("m2", 1)],
            vec![
                week("w1", "m1", 0),
                week("w2", "m1", 1),
                week("w3", "m1", 2),
                week("w4", "m2", 0),
                week("w5", "m2", 1),
                week("w6", "m2", 2),
            ],
        )
    }

    fn range_of(plan: &ReindexPlan, week_id: &str) -> (u32, DayRange) {
        let w = plan.weeks.iter().find(|w| w.id == week_id).unwrap();
        (w.week_number, w.range.unwrap())
    }

    #[test]
    fn initial_reindex_assigns_contiguous_ranges() {
        let plan = reindex(&tree()).unwrap();
        assert_eq!(range_of(&plan, "w1"), (1, DayRange::new(1, 5)));
        assert_eq!(range_of(&plan, "w6"), (6, DayRange::new(26, 30)));
        assert_eq!(plan.modules[0].range, Some(DayRange::new(1, 15)));
        assert_eq!(plan.modules[1].range, Some(DayRange::new(16, 30)));
        assert_eq!(plan.changes.len(), 8);
    }

    #[test]
    fn final_week_is_truncated() {
        let mut t = tree();
        t.program.length_days = 28;
        let plan = reindex(&t).unwrap();
        assert_eq!(range_of(&plan, "w6"), (6, DayRange::new(26, 28)));
    }

    #[test]
    fn too_many_weeks_is_a_violation() {
        let mut t = tree();
        t.program.length_days = 20;
        let err = reindex(&t).unwrap_err();
        assert!(matches!(err, CoreError::StructuralInvariantViolation { .. }));
    }

    #[test]
    fn gap_at_the_end_is_a_violation() {
        let mut t = tree();
        t.program.length_days = 40;
        assert!(matches!(
            reindex(&t),
            Err(CoreError::StructuralInvariantViolation { .. })
        ));
    }

    #[test]
    fn module_reorder_moves_week_ranges() {
        let plan = plan_edits(
            &tree(),
            &[StructuralEdit::ReorderModules {
                module_ids: vec!["m2".into(), "m1".into()],
            }],
        )
        .unwrap();
        assert_eq!(range_of(&plan, "w4"), (1, DayRange::new(1, 5)));
        assert_eq!(range_of(&plan, "w1"), (4, DayRange::new(16, 20)));
        assert_eq!(plan.modules[0].id, "m2");
    }

    #[test]
    fn reorder_must_be_a_permutation() {
        let err = plan_edits(
            &tree(),
            &[StructuralEdit::ReorderWeeks {
                module_id: "m1".into(),
                week_ids: vec!["w1".into(), "w1".into(), "w3".into()],
            }],
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::NotAPermutation { .. })));
    }

    #[test]
    fn move_week_across_modules() {
        let plan = plan_edits(
            &tree(),
            &[StructuralEdit::MoveWeek {
                week_id: "w1".into(),
                to_module_id: "m2".into(),
                position: 99,
            }],
        )
        .unwrap();
        assert_eq!(range_of(&plan, "w2"), (1, DayRange::new(1, 5)));
        assert_eq!(range_of(&plan, "w1"), (6, DayRange::new(26, 30)));
        assert_eq!(plan.modules[0].range, Some(DayRange::new(1, 10)));
    }

    #[test]
    fn delete_module_with_move_hands_weeks_to_previous() {
        let plan = plan_edits(
            &tree(),
            &[StructuralEdit::DeleteModule {
                module_id: "m2".into(),
                policy: ModuleDeletePolicy::Move,
            }],
        )
        .unwrap();
        assert_eq!(plan.modules.len(), 1);
        assert!(plan.weeks.iter().all(|w| w.module_id == "m1"));
        assert_eq!(plan.modules[0].range, Some(DayRange::new(1, 30)));
        assert_eq!(plan.removed_module_ids, vec!["m2".to_string()]);
        verify_partition("p", 30, &plan.weeks).unwrap();
    }

    #[test]
    fn delete_first_module_with_move_prepends_to_next() {
        let plan = plan_edits(
            &tree(),
            &[StructuralEdit::DeleteModule {
                module_id: "m1".into(),
                policy: ModuleDeletePolicy::Move,
            }],
        )
        .unwrap();
        assert_eq!(range_of(&plan, "w1"), (1, DayRange::new(1, 5)));
        assert_eq!(range_of(&plan, "w4"), (4, DayRange::new(16, 20)));
    }

    #[test]
    fn delete_module_cascade_needs_length_change() {
        let cascade = StructuralEdit::DeleteModule {
            module_id: "m2".into(),
            policy: ModuleDeletePolicy::Delete,
        };
        assert!(plan_edits(&tree(), &[cascade.clone()]).is_err());

        let edits = [cascade, StructuralEdit::SetLength { length_days: 15 }];
        let plan = plan_edits(&tree(), &edits).unwrap();
        assert_eq!(plan.length_days, 15);
        assert_eq!(plan.weeks.len(), 3);
        assert_eq!(plan.removed_week_ids.len(), 3);
    }

    #[test]
    fn insert_module_and_week() {
        let plan = plan_edits(
            &tree(),
            &[
                StructuralEdit::SetLength { length_days: 35 },
                StructuralEdit::InsertModule {
                    module: module("m0", 0),
                    position: 0,
                },
                StructuralEdit::InsertWeek {
                    week: week("w0", "m0", 0),
                    position: 0,
                },
            ],
        )
        .unwrap();
        assert_eq!(range_of(&plan, "w0"), (1, DayRange::new(1, 5)));
        assert_eq!(range_of(&plan, "w1"), (2, DayRange::new(6, 10)));
        assert_eq!(plan.modules[0].id, "m0");
    }

    #[test]
    fn generated_nodes_append_at_the_end() {
        let extra_module = Module::new("p", "Bonus");
        let extra_week = Week::new("p", extra_module.id.clone());
        assert_ne!(extra_module.id, Module::new("p", "Bonus").id);

        let plan = plan_edits(
            &tree(),
            &[
                StructuralEdit::SetLength { length_days: 33 },
                StructuralEdit::InsertModule {
                    module: extra_module.clone(),
                    position: usize::MAX,
                },
                StructuralEdit::InsertWeek {
                    week: extra_week.clone(),
                    position: 0,
                },
            ],
        )
        .unwrap();
        assert_eq!(range_of(&plan, &extra_week.id), (7, DayRange::new(31, 33)));
        assert_eq!(plan.modules[2].id, extra_module.id);
    }

    #[test]
    fn lookups_find_covering_nodes() {
        let plan = reindex(&tree()).unwrap();
        assert_eq!(week_for_day(&plan.weeks, 7).map(|w| w.id.as_str()), Some("w2"));
        assert_eq!(module_for_day(&plan.modules, 16).map(|m| m.id.as_str()), Some("m2"));
        assert!(week_for_day(&plan.weeks, 31).is_none());
    }
}
