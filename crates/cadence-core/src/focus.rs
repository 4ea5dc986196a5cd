//! Daily focus list and backlog.
//!
//! Each user has, per calendar day, a short ordered `focus` list bounded by a
//! capacity and an unbounded `backlog`. A task id lives in exactly one of the
//! two lists. Every operation either succeeds completely or leaves the state
//! untouched, so a rejected move never loses a task.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{CoreError, EntityKind, Result, ValidationError};
use crate::program::Program;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FocusList {
    Focus,
    Backlog,
}

impl FocusList {
    fn name(self) -> &'static str {
        match self {
            FocusList::Focus => "focus",
            FocusList::Backlog => "backlog",
        }
    }

    fn other(self) -> Self {
        match self {
            FocusList::Focus => FocusList::Backlog,
            FocusList::Backlog => FocusList::Focus,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FocusEntry {
    pub task_id: String,
    /// Position in its list, 0-based and contiguous.
    pub order: u32,
    #[serde(default)]
    pub completed: bool,
}

impl FocusEntry {
    fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            order: 0,
            completed: false,
        }
    }
}

/// Focus and backlog for one user on one day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FocusListState {
    pub user_id: String,
    pub date: NaiveDate,
    capacity: u32,
    focus: Vec<FocusEntry>,
    backlog: Vec<FocusEntry>,
}

/// Read-only view handed to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FocusListSnapshot {
    pub user_id: String,
    pub date: NaiveDate,
    pub focus: Vec<FocusEntry>,
    pub backlog: Vec<FocusEntry>,
    pub capacity: u32,
    /// The focus list holds more tasks than the current capacity allows,
    /// which happens when capacity shrinks after the list was filled.
    pub over_capacity: bool,
}

/// Capacity for a user whose active enrollments are in `programs`.
///
/// The sum of their focus slots, or `default_capacity` when there are none.
/// Never below 1.
pub fn focus_capacity<'a>(
    programs: impl IntoIterator<Item = &'a Program>,
    default_capacity: u32,
) -> u32 {
    let total: u32 = programs.into_iter().map(|p| p.daily_focus_slots).sum();
    if total == 0 {
        default_capacity.max(1)
    } else {
        total
    }
}

impl FocusListState {
    pub fn new(user_id: impl Into<String>, date: NaiveDate, capacity: u32) -> Self {
        Self {
            user_id: user_id.into(),
            date,
            capacity: capacity.max(1),
            focus: Vec::new(),
            backlog: Vec::new(),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Change the capacity. Existing focus entries are kept even if they no
    /// longer fit; see [`FocusListSnapshot::over_capacity`].
    pub fn set_capacity(&mut self, capacity: u32) {
        self.capacity = capacity.max(1);
    }

    pub fn focus(&self) -> &[FocusEntry] {
        &self.focus
    }

    pub fn backlog(&self) -> &[FocusEntry] {
        &self.backlog
    }

    pub fn is_over_capacity(&self) -> bool {
        self.focus.len() > self.capacity as usize
    }

    fn list(&self, list: FocusList) -> &Vec<FocusEntry> {
        match list {
            FocusList::Focus => &self.focus,
            FocusList::Backlog => &self.backlog,
        }
    }

    fn list_mut(&mut self, list: FocusList) -> &mut Vec<FocusEntry> {
        match list {
            FocusList::Focus => &mut self.focus,
            FocusList::Backlog => &mut self.backlog,
        }
    }

    /// Which list holds `task_id`, and where.
    pub fn locate(&self, task_id: &str) -> Option<(FocusList, usize)> {
        [FocusList::Focus, FocusList::Backlog]
            .into_iter()
            .find_map(|list| {
                self.list(list)
                    .iter()
                    .position(|e| e.task_id == task_id)
                    .map(|idx| (list, idx))
            })
    }

    fn require(&self, task_id: &str) -> Result<(FocusList, usize)> {
        self.locate(task_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Task, task_id))
    }

    fn ensure_room(&self) -> Result<()> {
        if self.focus.len() >= self.capacity as usize {
            return Err(CoreError::CapacityExceeded {
                capacity: self.capacity,
                len: self.focus.len() as u32,
            });
        }
        Ok(())
    }

    fn renumber(&mut self, list: FocusList) {
        for (i, entry) in self.list_mut(list).iter_mut().enumerate() {
            entry.order = i as u32;
        }
    }

    /// Append `task_id` to `list`.
    ///
    /// Adding a task that is already in `list` does nothing. A task that is
    /// in the other list has to be moved instead.
    pub fn add_task(&mut self, list: FocusList, task_id: &str) -> Result<()> {
        match self.locate(task_id) {
            Some((current, _)) if current == list => return Ok(()),
            Some((current, _)) => {
                return Err(ValidationError::DuplicateTask {
                    task_id: task_id.to_string(),
                    list: current.name().to_string(),
                }
                .into())
            }
            None => {}
        }
        if list == FocusList::Focus {
            self.ensure_room()?;
        }
        self.list_mut(list).push(FocusEntry::new(task_id));
        self.renumber(list);
        Ok(())
    }

    /// Move `task_id` to `target` at `index` (clamped to the end of the list).
    ///
    /// Moving into a full focus list fails with `CapacityExceeded`; a task
    /// already in focus does not count against itself.
    pub fn move_task(&mut self, task_id: &str, target: FocusList, index: usize) -> Result<()> {
        let (source, from) = self.require(task_id)?;
        if source != target && target == FocusList::Focus {
            self.ensure_room()?;
        }

        let target_len = self.list(target).len() - usize::from(source == target);
        let to = index.min(target_len);
        if source == target && from == to {
            return Ok(());
        }

        let entry = self.list_mut(source).remove(from);
        self.list_mut(target).insert(to, entry);
        self.renumber(source);
        self.renumber(target);
        tracing::debug!(
            task_id,
            from = source.name(),
            to = target.name(),
            index = to,
            "moved focus task"
        );
        Ok(())
    }

    /// Put `list` in the order given by `task_ids`, which must name exactly
    /// the tasks already in it.
    pub fn reorder(&mut self, list: FocusList, task_ids: &[String]) -> Result<()> {
        let current = self.list(list);
        let present: HashSet<&str> = current.iter().map(|e| e.task_id.as_str()).collect();
        let proposed: HashSet<&str> = task_ids.iter().map(String::as_str).collect();
        if task_ids.len() != current.len()
            || proposed.len() != task_ids.len()
            || present != proposed
        {
            return Err(ValidationError::NotAPermutation {
                list: list.name().to_string(),
                len: current.len(),
            }
            .into());
        }

        let mut reordered = Vec::with_capacity(task_ids.len());
        for id in task_ids {
            if let Some(entry) = current.iter().find(|e| e.task_id == *id) {
                reordered.push(entry.clone());
            }
        }
        *self.list_mut(list) = reordered;
        self.renumber(list);
        Ok(())
    }

    fn set_completed(&mut self, task_id: &str, completed: bool) -> Result<()> {
        let (list, idx) = self.require(task_id)?;
        self.list_mut(list)[idx].completed = completed;
        Ok(())
    }

    pub fn complete(&mut self, task_id: &str) -> Result<()> {
        self.set_completed(task_id, true)
    }

    pub fn uncomplete(&mut self, task_id: &str) -> Result<()> {
        self.set_completed(task_id, false)
    }

    /// Drop a task reference from whichever list holds it.
    pub fn remove_task(&mut self, task_id: &str) -> bool {
        match self.locate(task_id) {
            Some((list, idx)) => {
                self.list_mut(list).remove(idx);
                self.renumber(list);
                true
            }
            None => false,
        }
    }

    /// Verify the list invariants: unique ids across both lists and
    /// contiguous orders.
    pub fn check_invariants(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for list in [FocusList::Focus, FocusList::Backlog] {
            for (i, entry) in self.list(list).iter().enumerate() {
                if !seen.insert(entry.task_id.as_str()) {
                    return Err(ValidationError::DuplicateTask {
                        task_id: entry.task_id.clone(),
                        list: list.other().name().to_string(),
                    }
                    .into());
                }
                if entry.order != i as u32 {
                    return Err(ValidationError::InvalidValue {
                        field: format!("{}.order", list.name()),
                        message: format!(
                            "entry '{}' has order {} at position {i}",
                            entry.task_id, entry.order
                        ),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> FocusListSnapshot {
        FocusListSnapshot {
            user_id: self.user_id.clone(),
            date: self.date,
            focus: self.focus.clone(),
            backlog: self.backlog.clone(),
            capacity: self.capacity,
            over_capacity: self.is_over_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::DurationType;

    fn state(capacity: u32) -> FocusListState {
        FocusListState::new("u1", NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(), capacity)
    }

    fn ids(entries: &[FocusEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.task_id.as_str()).collect()
    }

    fn program(slots: u32) -> Program {
        Program {
            id: format!("p{slots}"),
            name: "P".into(),
            length_days: 30,
            include_weekends: true,
            duration_type: DurationType::Fixed,
            daily_focus_slots: slots,
            task_distribution: None,
        }
    }

    #[test]
    fn capacity_sums_active_programs() {
        let programs = [program(2), program(3)];
        assert_eq!(focus_capacity(&programs, 1), 5);
        assert_eq!(focus_capacity(std::iter::empty(), 0), 1);
        assert_eq!(focus_capacity(std::iter::empty(), 3), 3);
    }

    #[test]
    fn add_respects_capacity() {
        let mut s = state(2);
        s.add_task(FocusList::Focus, "a").unwrap();
        s.add_task(FocusList::Focus, "b").unwrap();
        let err = s.add_task(FocusList::Focus, "c").unwrap_err();
        assert!(matches!(err, CoreError::CapacityExceeded { capacity: 2, len: 2 }));
        s.add_task(FocusList::Backlog, "c").unwrap();
        assert_eq!(ids(s.backlog()), vec!["c"]);
    }

    #[test]
    fn add_is_idempotent_and_rejects_cross_list_duplicates() {
        let mut s = state(2);
        s.add_task(FocusList::Backlog, "a").unwrap();
        s.add_task(FocusList::Backlog, "a").unwrap();
        assert_eq!(s.backlog().len(), 1);
        let err = s.add_task(FocusList::Focus, "a").unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::DuplicateTask { .. })));
    }

    #[test]
    fn move_into_full_focus_is_rejected_without_losing_the_task() {
        let mut s = state(1);
        s.add_task(FocusList::Focus, "a").unwrap();
        s.add_task(FocusList::Backlog, "b").unwrap();
        let before = s.clone();
        assert!(s.move_task("b", FocusList::Focus, 0).is_err());
        assert_eq!(s, before);
    }

    #[test]
    fn move_within_full_focus_is_allowed() {
        let mut s = state(2);
        s.add_task(FocusList::Focus, "a").unwrap();
        s.add_task(FocusList::Focus, "b").unwrap();
        s.move_task("b", FocusList::Focus, 0).unwrap();
        assert_eq!(ids(s.focus()), vec!["b", "a"]);
        assert_eq!(s.focus()[0].order, 0);
        assert_eq!(s.focus()[1].order, 1);
    }

    #[test]
    fn replayed_move_is_a_no_op() {
        let mut s = state(3);
        s.add_task(FocusList::Backlog, "a").unwrap();
        s.add_task(FocusList::Backlog, "b").unwrap();
        s.move_task("b", FocusList::Focus, 5).unwrap();
        let after_first = s.clone();
        s.move_task("b", FocusList::Focus, 5).unwrap();
        assert_eq!(s, after_first);
        assert_eq!(ids(s.focus()), vec!["b"]);
        assert_eq!(ids(s.backlog()), vec!["a"]);
    }

    #[test]
    fn reorder_requires_a_permutation() {
        let mut s = state(3);
        for id in ["a", "b", "c"] {
            s.add_task(FocusList::Backlog, id).unwrap();
        }
        let bad = vec!["a".to_string(), "b".to_string()];
        assert!(s.reorder(FocusList::Backlog, &bad).is_err());
        let dup = vec!["a".to_string(), "a".to_string(), "b".to_string()];
        assert!(s.reorder(FocusList::Backlog, &dup).is_err());

        let good = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        s.reorder(FocusList::Backlog, &good).unwrap();
        assert_eq!(ids(s.backlog()), vec!["c", "a", "b"]);
        s.check_invariants().unwrap();
    }

    #[test]
    fn complete_toggles_in_place() {
        let mut s = state(2);
        s.add_task(FocusList::Focus, "a").unwrap();
        s.complete("a").unwrap();
        assert!(s.focus()[0].completed);
        s.uncomplete("a").unwrap();
        assert!(!s.focus()[0].completed);
        assert!(matches!(s.complete("zzz"), Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn shrinking_capacity_flags_over_capacity() {
        let mut s = state(3);
        for id in ["a", "b", "c"] {
            s.add_task(FocusList::Focus, id).unwrap();
        }
        s.set_capacity(1);
        let snap = s.snapshot();
        assert!(snap.over_capacity);
        assert_eq!(snap.focus.len(), 3);
        s.add_task(FocusList::Backlog, "d").unwrap();
        assert!(s.move_task("d", FocusList::Focus, 0).is_err());
        s.move_task("a", FocusList::Backlog, 0).unwrap();
        s.move_task("b", FocusList::Backlog, 0).unwrap();
        assert!(!s.snapshot().over_capacity);
    }

    #[test]
    fn remove_renumbers() {
        let mut s = state(3);
        for id in ["a", "b", "c"] {
            s.add_task(FocusList::Focus, id).unwrap();
        }
        assert!(s.remove_task("a"));
        assert!(!s.remove_task("a"));
        assert_eq!(s.focus()[0].order, 0);
        s.check_invariants().unwrap();
    }
}
