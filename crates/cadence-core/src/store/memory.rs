//! In-memory store and its JSON snapshot format.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{ContentStore, EnrollmentStore, InsertOutcome, ProgramStore};
use crate::error::{CoreError, EntityKind, Result};
use crate::program::{Cohort, DayContent, DayRange, Enrollment, Module, Program, Week, WeekContent};
use crate::reindex::ReindexPlan;
use crate::resolver::LayerKey;

type RecordKey = (String, LayerKey, u32);
type WeekKey = (String, LayerKey, String);

#[derive(Debug, Default)]
struct State {
    programs: HashMap<String, Program>,
    modules: HashMap<String, Vec<Module>>,
    weeks: HashMap<String, Vec<Week>>,
    cohorts: HashMap<String, Cohort>,
    enrollments: HashMap<String, Enrollment>,
    /// Cohort and client week overrides, keyed by week id so they follow
    /// their week through reorders. Template week content lives on the
    /// structural week.
    week_overrides: BTreeMap<WeekKey, WeekContent>,
    days: BTreeMap<RecordKey, DayContent>,
}

impl State {
    fn week(&self, program_id: &str, week_number: u32) -> Option<&Week> {
        self.weeks
            .get(program_id)
            .and_then(|weeks| weeks.iter().find(|w| w.week_number == week_number))
    }

    fn template_week_mut(&mut self, program_id: &str, week_number: u32) -> Result<&mut Week> {
        self.weeks
            .get_mut(program_id)
            .and_then(|weeks| weeks.iter_mut().find(|w| w.week_number == week_number))
            .ok_or_else(|| missing_week(program_id, week_number))
    }

    /// Override key for the week currently numbered `week_number`.
    fn week_key(&self, program_id: &str, layer: &LayerKey, week_number: u32) -> Option<WeekKey> {
        self.week(program_id, week_number)
            .map(|w| (program_id.to_string(), layer.clone(), w.id.clone()))
    }

    fn require_week_key(
        &self,
        program_id: &str,
        layer: &LayerKey,
        week_number: u32,
    ) -> Result<WeekKey> {
        self.week_key(program_id, layer, week_number)
            .ok_or_else(|| missing_week(program_id, week_number))
    }
}

fn missing_week(program_id: &str, week_number: u32) -> CoreError {
    CoreError::not_found(EntityKind::Week, format!("{program_id}#{week_number}"))
}

/// Reference [`super::Store`] backed by `RwLock`-guarded maps.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

fn key(program_id: &str, layer: &LayerKey, index: u32) -> RecordKey {
    (program_id.to_string(), layer.clone(), index)
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|e| CoreError::Store(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|e| CoreError::Store(format!("lock poisoned: {e}")))
    }

    pub fn insert_program(&self, program: Program) -> Result<()> {
        program.validate()?;
        self.write()?.programs.insert(program.id.clone(), program);
        Ok(())
    }

    pub fn insert_module(&self, module: Module) -> Result<()> {
        let mut state = self.write()?;
        let modules = state.modules.entry(module.program_id.clone()).or_default();
        modules.retain(|m| m.id != module.id);
        modules.push(module);
        Ok(())
    }

    pub fn insert_week(&self, week: Week) -> Result<()> {
        let mut state = self.write()?;
        let weeks = state.weeks.entry(week.program_id.clone()).or_default();
        weeks.retain(|w| w.id != week.id);
        weeks.push(week);
        Ok(())
    }

    pub fn insert_cohort(&self, cohort: Cohort) -> Result<()> {
        self.write()?.cohorts.insert(cohort.id.clone(), cohort);
        Ok(())
    }

    pub fn upsert_enrollment(&self, enrollment: Enrollment) -> Result<()> {
        self.write()?
            .enrollments
            .insert(enrollment.id.clone(), enrollment);
        Ok(())
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let store = Self::new();
        for program in snapshot.programs {
            store.insert_program(program)?;
        }
        for module in snapshot.modules {
            store.insert_module(module)?;
        }
        for week in snapshot.weeks {
            store.insert_week(week)?;
        }
        for cohort in snapshot.cohorts {
            store.insert_cohort(cohort)?;
        }
        for enrollment in snapshot.enrollments {
            store.upsert_enrollment(enrollment)?;
        }
        {
            let mut state = store.write()?;
            for record in snapshot.days {
                state.days.insert(
                    key(&record.program_id, &record.layer, record.day.day_index),
                    record.day,
                );
            }
            for record in snapshot.week_overrides {
                let week = state
                    .weeks
                    .get_mut(&record.program_id)
                    .and_then(|weeks| weeks.iter_mut().find(|w| w.id == record.week_id))
                    .ok_or_else(|| CoreError::not_found(EntityKind::Week, &record.week_id))?;
                if record.layer == LayerKey::Template {
                    week.content = record.content;
                } else {
                    state.week_overrides.insert(
                        (record.program_id, record.layer, record.week_id),
                        record.content,
                    );
                }
            }
        }
        Ok(store)
    }

    pub fn to_snapshot(&self) -> Result<Snapshot> {
        let state = self.read()?;
        let mut programs: Vec<Program> = state.programs.values().cloned().collect();
        programs.sort_by(|a, b| a.id.cmp(&b.id));
        let mut cohorts: Vec<Cohort> = state.cohorts.values().cloned().collect();
        cohorts.sort_by(|a, b| a.id.cmp(&b.id));
        let mut enrollments: Vec<Enrollment> = state.enrollments.values().cloned().collect();
        enrollments.sort_by(|a, b| a.id.cmp(&b.id));

        let mut modules = Vec::new();
        let mut weeks = Vec::new();
        for program in &programs {
            if let Some(list) = state.modules.get(&program.id) {
                let mut list = list.clone();
                list.sort_by_key(|m| m.order);
                modules.extend(list);
            }
            if let Some(list) = state.weeks.get(&program.id) {
                let mut list = list.clone();
                list.sort_by_key(|w| w.week_number);
                weeks.extend(list);
            }
        }

        Ok(Snapshot {
            programs,
            modules,
            weeks,
            cohorts,
            enrollments,
            days: state
                .days
                .iter()
                .map(|((program_id, layer, _), day)| LayeredDay {
                    program_id: program_id.clone(),
                    layer: layer.clone(),
                    day: day.clone(),
                })
                .collect(),
            week_overrides: state
                .week_overrides
                .iter()
                .map(|((program_id, layer, week_id), content)| LayeredWeek {
                    program_id: program_id.clone(),
                    layer: layer.clone(),
                    week_id: week_id.clone(),
                    content: content.clone(),
                })
                .collect(),
        })
    }
}

impl ProgramStore for InMemoryStore {
    fn program(&self, program_id: &str) -> Result<Option<Program>> {
        Ok(self.read()?.programs.get(program_id).cloned())
    }

    fn modules(&self, program_id: &str) -> Result<Vec<Module>> {
        let mut modules = self.read()?.modules.get(program_id).cloned().unwrap_or_default();
        modules.sort_by_key(|m| m.order);
        Ok(modules)
    }

    fn weeks(&self, program_id: &str) -> Result<Vec<Week>> {
        let mut weeks = self.read()?.weeks.get(program_id).cloned().unwrap_or_default();
        weeks.sort_by_key(|w| w.week_number);
        Ok(weeks)
    }

    fn apply_reindex(&self, program_id: &str, plan: &ReindexPlan) -> Result<()> {
        let mut state = self.write()?;
        let program = state
            .programs
            .get_mut(program_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Program, program_id))?;
        program.length_days = plan.length_days;
        state.modules.insert(program_id.to_string(), plan.modules.clone());
        state.weeks.insert(program_id.to_string(), plan.weeks.clone());
        state.week_overrides.retain(|(owner, _, week_id), _| {
            owner != program_id || plan.weeks.iter().any(|w| &w.id == week_id)
        });
        Ok(())
    }
}

impl EnrollmentStore for InMemoryStore {
    fn enrollment(&self, enrollment_id: &str) -> Result<Option<Enrollment>> {
        Ok(self.read()?.enrollments.get(enrollment_id).cloned())
    }

    fn enrollments_for_user(&self, user_id: &str) -> Result<Vec<Enrollment>> {
        let mut found: Vec<Enrollment> = self
            .read()?
            .enrollments
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    fn cohort(&self, cohort_id: &str) -> Result<Option<Cohort>> {
        Ok(self.read()?.cohorts.get(cohort_id).cloned())
    }
}

impl ContentStore for InMemoryStore {
    fn week_content(
        &self,
        program_id: &str,
        layer: &LayerKey,
        week_number: u32,
    ) -> Result<Option<WeekContent>> {
        let state = self.read()?;
        if *layer == LayerKey::Template {
            return Ok(state.week(program_id, week_number).map(|w| w.content.clone()));
        }
        Ok(state
            .week_key(program_id, layer, week_number)
            .and_then(|k| state.week_overrides.get(&k))
            .cloned())
    }

    fn day_content(
        &self,
        program_id: &str,
        layer: &LayerKey,
        day_index: u32,
    ) -> Result<Option<DayContent>> {
        Ok(self
            .read()?
            .days
            .get(&key(program_id, layer, day_index))
            .cloned())
    }

    fn days_in_range(
        &self,
        program_id: &str,
        layer: &LayerKey,
        range: DayRange,
    ) -> Result<Vec<DayContent>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .read()?
            .days
            .range(key(program_id, layer, range.start)..=key(program_id, layer, range.end))
            .map(|(_, day)| day.clone())
            .collect())
    }

    fn insert_week_content(
        &self,
        program_id: &str,
        layer: &LayerKey,
        week_number: u32,
        content: WeekContent,
    ) -> Result<InsertOutcome<WeekContent>> {
        let mut state = self.write()?;
        if *layer == LayerKey::Template {
            let week = state.template_week_mut(program_id, week_number)?;
            return Ok(InsertOutcome::AlreadyExists(week.content.clone()));
        }
        let record_key = state.require_week_key(program_id, layer, week_number)?;
        match state.week_overrides.get(&record_key) {
            Some(existing) => Ok(InsertOutcome::AlreadyExists(existing.clone())),
            None => {
                state.week_overrides.insert(record_key, content);
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    fn put_week_content(
        &self,
        program_id: &str,
        layer: &LayerKey,
        week_number: u32,
        content: WeekContent,
    ) -> Result<()> {
        let mut state = self.write()?;
        if *layer == LayerKey::Template {
            state.template_week_mut(program_id, week_number)?.content = content;
        } else {
            let record_key = state.require_week_key(program_id, layer, week_number)?;
            state.week_overrides.insert(record_key, content);
        }
        Ok(())
    }

    fn insert_day_content(
        &self,
        program_id: &str,
        layer: &LayerKey,
        content: DayContent,
    ) -> Result<InsertOutcome<DayContent>> {
        let mut state = self.write()?;
        let record_key = key(program_id, layer, content.day_index);
        match state.days.get(&record_key) {
            Some(existing) => Ok(InsertOutcome::AlreadyExists(existing.clone())),
            None => {
                state.days.insert(record_key, content);
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    fn put_day_content(
        &self,
        program_id: &str,
        layer: &LayerKey,
        content: DayContent,
    ) -> Result<()> {
        self.write()?
            .days
            .insert(key(program_id, layer, content.day_index), content);
        Ok(())
    }

    fn delete_week_content(
        &self,
        program_id: &str,
        layer: &LayerKey,
        week_number: u32,
    ) -> Result<bool> {
        let mut state = self.write()?;
        Ok(match state.week_key(program_id, layer, week_number) {
            Some(record_key) => state.week_overrides.remove(&record_key).is_some(),
            None => false,
        })
    }

    fn delete_day_content(
        &self,
        program_id: &str,
        layer: &LayerKey,
        day_index: u32,
    ) -> Result<bool> {
        Ok(self
            .write()?
            .days
            .remove(&key(program_id, layer, day_index))
            .is_some())
    }
}

fn template_layer() -> LayerKey {
    LayerKey::Template
}

/// A day record and the layer it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayeredDay {
    pub program_id: String,
    #[serde(default = "template_layer")]
    pub layer: LayerKey,
    pub day: DayContent,
}

/// A week content record, the week it belongs to and its layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayeredWeek {
    pub program_id: String,
    pub layer: LayerKey,
    pub week_id: String,
    pub content: WeekContent,
}

/// Everything an [`InMemoryStore`] holds, as one JSON document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Snapshot {
    #[serde(default)]
    pub programs: Vec<Program>,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub weeks: Vec<Week>,
    #[serde(default)]
    pub cohorts: Vec<Cohort>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub days: Vec<LayeredDay>,
    #[serde(default)]
    pub week_overrides: Vec<LayeredWeek>,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::DurationType;

    fn program() -> Program {
        Program {
            id: "p".into(),
            name: "P".into(),
            length_days: 14,
            include_weekends: true,
            duration_type: DurationType::Fixed,
            daily_focus_slots: 2,
            task_distribution: None,
        }
    }

    fn week(n: u32) -> Week {
        Week {
            id: format!("w{n}"),
            program_id: "p".into(),
            module_id: "m".into(),
            week_number: n,
            order: n - 1,
            range: Some(DayRange::new(n * 7 - 6, n * 7)),
            content: WeekContent::default(),
        }
    }

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.insert_program(program()).unwrap();
        store.insert_week(week(1)).unwrap();
        store.insert_week(week(2)).unwrap();
        store
    }

    #[test]
    fn insert_day_is_create_if_absent() {
        let store = store();
        let layer = LayerKey::Client("e1".into());
        let mut first = DayContent::new(3);
        first.title = Some("first".into());
        let mut second = DayContent::new(3);
        second.title = Some("second".into());

        assert_eq!(
            store.insert_day_content("p", &layer, first.clone()).unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert_day_content("p", &layer, second).unwrap(),
            InsertOutcome::AlreadyExists(first.clone())
        );
        assert_eq!(store.day_content("p", &layer, 3).unwrap(), Some(first));
    }

    #[test]
    fn template_week_content_is_the_structural_week() {
        let store = store();
        let content = WeekContent {
            theme: Some("Basics".into()),
            ..Default::default()
        };
        store.put_week_content("p", &LayerKey::Template, 2, content.clone()).unwrap();
        assert_eq!(store.weeks("p").unwrap()[1].content, content);
        assert!(store
            .put_week_content("p", &LayerKey::Template, 9, content)
            .is_err());
    }

    #[test]
    fn week_overrides_follow_their_week() {
        let store = store();
        let layer = LayerKey::Client("e1".into());
        let note = WeekContent {
            weekly_prompt: Some("note for w1".into()),
            ..Default::default()
        };
        store.put_week_content("p", &layer, 1, note.clone()).unwrap();
        assert!(store
            .put_week_content("p", &layer, 9, WeekContent::default())
            .is_err());

        // Renumber w1 as week 2 and w2 as week 1.
        let mut weeks = store.weeks("p").unwrap();
        for week in &mut weeks {
            week.week_number = 3 - week.week_number;
        }
        let plan = ReindexPlan {
            program_id: "p".into(),
            length_days: 14,
            modules: Vec::new(),
            weeks,
            changes: Vec::new(),
            removed_module_ids: Vec::new(),
            removed_week_ids: Vec::new(),
        };
        store.apply_reindex("p", &plan).unwrap();
        assert_eq!(store.week_content("p", &layer, 1).unwrap(), None);
        assert_eq!(store.week_content("p", &layer, 2).unwrap(), Some(note));

        let plan = ReindexPlan {
            weeks: store.weeks("p").unwrap().into_iter().filter(|w| w.id == "w2").collect(),
            removed_week_ids: vec!["w1".into()],
            ..plan
        };
        store.apply_reindex("p", &plan).unwrap();
        assert!(store.to_snapshot().unwrap().week_overrides.is_empty());
        assert!(!store.delete_week_content("p", &layer, 2).unwrap());
    }

    #[test]
    fn days_in_range_is_layer_local() {
        let store = store();
        for day in [1, 5, 8] {
            store.put_day_content("p", &LayerKey::Template, DayContent::new(day)).unwrap();
        }
        store
            .put_day_content("p", &LayerKey::Cohort("c".into()), DayContent::new(2))
            .unwrap();
        let days = store
            .days_in_range("p", &LayerKey::Template, DayRange::new(1, 7))
            .unwrap();
        assert_eq!(days.iter().map(|d| d.day_index).collect::<Vec<_>>(), vec![1, 5]);
    }

    #[test]
    fn snapshot_round_trips_through_a_file() {
        let store = store();
        store
            .put_day_content("p", &LayerKey::Client("e1".into()), DayContent::new(4))
            .unwrap();
        store
            .put_week_content("p", &LayerKey::Cohort("c".into()), 1, WeekContent::default())
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        store.to_snapshot().unwrap().save(&path).unwrap();
        let reloaded = InMemoryStore::from_snapshot(Snapshot::load(&path).unwrap()).unwrap();
        assert_eq!(reloaded.to_snapshot().unwrap(), store.to_snapshot().unwrap());
    }
}
