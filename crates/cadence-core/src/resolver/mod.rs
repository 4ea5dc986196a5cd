//! Content resolution through the template → cohort → client hierarchy.
//!
//! Resolution is an explicit field-by-field merge. Layers are applied in
//! increasing precedence and a field set at a higher layer replaces the
//! lower layer's value wholesale; lists are never merged element-wise. Each
//! resolved field remembers which layer supplied it, which is what the UI
//! uses for "customized" badges.
//!
//! Reads never write. Looking at a client day that has no client record
//! shows the template day; creating the client record happens only on save
//! (see [`materialize`]).

pub mod materialize;
pub mod scope;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, EntityKind, Result};
use crate::program::{
    CourseAssignment, DayContent, DayRange, DistributionPolicy, Habit, Program, ProgramTask,
    WeekContent,
};
use crate::store::{ContentStore, EnrollmentStore, ProgramStore};

pub use materialize::{reset_day, reset_week, save_day, save_week, SaveOutcome};
pub use scope::{ContentScope, Layer, LayerKey};

/// A merged field and the layer it came from. Both are `None` when no
/// layer sets the field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: Option<T>,
    pub source: Option<Layer>,
}

impl<T> Default for Resolved<T> {
    fn default() -> Self {
        Self {
            value: None,
            source: None,
        }
    }
}

impl<T> Resolved<T> {
    /// True when a layer above the template supplied the value.
    pub fn is_customized(&self) -> bool {
        matches!(self.source, Some(Layer::Cohort | Layer::Client))
    }
}

/// Pick the highest-precedence layer that sets the field. `layers` must be
/// ordered lowest precedence first.
fn merge_field<R, T: Clone>(
    layers: &[(Layer, &R)],
    get: impl Fn(&R) -> Option<&T>,
) -> Resolved<T> {
    layers
        .iter()
        .rev()
        .find_map(|(layer, record)| {
            get(record).map(|value| Resolved {
                value: Some(value.clone()),
                source: Some(*layer),
            })
        })
        .unwrap_or_default()
}

/// A day as seen through a scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EffectiveDay {
    pub day_index: u32,
    pub title: Resolved<String>,
    pub daily_prompt: Resolved<String>,
    pub tasks: Resolved<Vec<ProgramTask>>,
    pub habits: Resolved<Vec<Habit>>,
    pub courses: Resolved<Vec<CourseAssignment>>,
}

impl EffectiveDay {
    /// The merged content without provenance.
    pub fn content(&self) -> DayContent {
        DayContent {
            day_index: self.day_index,
            title: self.title.value.clone(),
            daily_prompt: self.daily_prompt.value.clone(),
            tasks: self.tasks.value.clone(),
            habits: self.habits.value.clone(),
            courses: self.courses.value.clone(),
        }
    }

    pub fn customized_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title.is_customized() {
            fields.push("title");
        }
        if self.daily_prompt.is_customized() {
            fields.push("daily_prompt");
        }
        if self.tasks.is_customized() {
            fields.push("tasks");
        }
        if self.habits.is_customized() {
            fields.push("habits");
        }
        if self.courses.is_customized() {
            fields.push("courses");
        }
        fields
    }

    pub fn is_customized(&self) -> bool {
        !self.customized_fields().is_empty()
    }
}

/// A week as seen through a scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EffectiveWeek {
    pub week_number: u32,
    /// Structural day range, if the week exists in the program tree.
    pub range: Option<DayRange>,
    pub theme: Resolved<String>,
    pub description: Resolved<String>,
    pub weekly_tasks: Resolved<Vec<ProgramTask>>,
    pub weekly_habits: Resolved<Vec<Habit>>,
    pub weekly_prompt: Resolved<String>,
    pub current_focus: Resolved<Vec<String>>,
    pub notes: Resolved<Vec<String>>,
    pub distribution: Resolved<DistributionPolicy>,
}

impl EffectiveWeek {
    pub fn content(&self) -> WeekContent {
        WeekContent {
            theme: self.theme.value.clone(),
            description: self.description.value.clone(),
            weekly_tasks: self.weekly_tasks.value.clone(),
            weekly_habits: self.weekly_habits.value.clone(),
            weekly_prompt: self.weekly_prompt.value.clone(),
            current_focus: self.current_focus.value.clone(),
            notes: self.notes.value.clone(),
            distribution: self.distribution.value,
        }
    }

    /// Week policy, else the program default, else `fallback`.
    pub fn effective_policy(
        &self,
        program: &Program,
        fallback: DistributionPolicy,
    ) -> DistributionPolicy {
        self.distribution
            .value
            .or(program.task_distribution)
            .unwrap_or(fallback)
    }

    pub fn customized_fields(&self) -> Vec<&'static str> {
        [
            ("theme", self.theme.is_customized()),
            ("description", self.description.is_customized()),
            ("weekly_tasks", self.weekly_tasks.is_customized()),
            ("weekly_habits", self.weekly_habits.is_customized()),
            ("weekly_prompt", self.weekly_prompt.is_customized()),
            ("current_focus", self.current_focus.is_customized()),
            ("notes", self.notes.is_customized()),
            ("distribution", self.distribution.is_customized()),
        ]
        .into_iter()
        .filter_map(|(name, customized)| customized.then_some(name))
        .collect()
    }
}

/// Merge day records, given lowest-precedence first.
pub fn merge_day(day_index: u32, layers: &[(Layer, &DayContent)]) -> EffectiveDay {
    EffectiveDay {
        day_index,
        title: merge_field(layers, |d| d.title.as_ref()),
        daily_prompt: merge_field(layers, |d| d.daily_prompt.as_ref()),
        tasks: merge_field(layers, |d| d.tasks.as_ref()),
        habits: merge_field(layers, |d| d.habits.as_ref()),
        courses: merge_field(layers, |d| d.courses.as_ref()),
    }
}

/// Merge week records, given lowest-precedence first.
pub fn merge_week(
    week_number: u32,
    range: Option<DayRange>,
    layers: &[(Layer, &WeekContent)],
) -> EffectiveWeek {
    EffectiveWeek {
        week_number,
        range,
        theme: merge_field(layers, |w| w.theme.as_ref()),
        description: merge_field(layers, |w| w.description.as_ref()),
        weekly_tasks: merge_field(layers, |w| w.weekly_tasks.as_ref()),
        weekly_habits: merge_field(layers, |w| w.weekly_habits.as_ref()),
        weekly_prompt: merge_field(layers, |w| w.weekly_prompt.as_ref()),
        current_focus: merge_field(layers, |w| w.current_focus.as_ref()),
        notes: merge_field(layers, |w| w.notes.as_ref()),
        distribution: merge_field(layers, |w| w.distribution.as_ref()),
    }
}

/// Load a program or fail with `NotFound`.
pub fn require_program<S: ProgramStore + ?Sized>(store: &S, program_id: &str) -> Result<Program> {
    store
        .program(program_id)?
        .ok_or_else(|| CoreError::not_found(EntityKind::Program, program_id))
}

/// The layers visible from `scope`, lowest precedence first.
///
/// # Errors
/// `NotFound` for an unknown cohort or enrollment, or one that belongs to a
/// different program.
pub fn layer_chain<S: EnrollmentStore + ?Sized>(
    store: &S,
    program_id: &str,
    scope: &ContentScope,
) -> Result<Vec<LayerKey>> {
    let mut chain = vec![LayerKey::Template];
    match scope {
        ContentScope::Template => {}
        ContentScope::Cohort { cohort_id } => {
            require_cohort(store, program_id, cohort_id)?;
            chain.push(LayerKey::Cohort(cohort_id.clone()));
        }
        ContentScope::Client { enrollment_id } => {
            let enrollment = store
                .enrollment(enrollment_id)?
                .filter(|e| e.program_id == program_id)
                .ok_or_else(|| CoreError::not_found(EntityKind::Enrollment, enrollment_id))?;
            if let Some(cohort_id) = &enrollment.cohort_id {
                require_cohort(store, program_id, cohort_id)?;
                chain.push(LayerKey::Cohort(cohort_id.clone()));
            }
            chain.push(LayerKey::Client(enrollment_id.clone()));
        }
    }
    Ok(chain)
}

fn require_cohort<S: EnrollmentStore + ?Sized>(
    store: &S,
    program_id: &str,
    cohort_id: &str,
) -> Result<()> {
    store
        .cohort(cohort_id)?
        .filter(|c| c.program_id == program_id)
        .map(|_| ())
        .ok_or_else(|| CoreError::not_found(EntityKind::Cohort, cohort_id))
}

/// Resolve day `day_index` of a program through `scope`.
pub fn resolve_day<S>(
    store: &S,
    program_id: &str,
    day_index: u32,
    scope: &ContentScope,
) -> Result<EffectiveDay>
where
    S: ProgramStore + EnrollmentStore + ContentStore + ?Sized,
{
    let program = require_program(store, program_id)?;
    program.check_day(day_index)?;
    let chain = layer_chain(store, program_id, scope)?;

    let mut records = Vec::with_capacity(chain.len());
    for key in &chain {
        if let Some(day) = store.day_content(program_id, key, day_index)? {
            records.push((key.layer(), day));
        }
    }
    let layers: Vec<(Layer, &DayContent)> = records.iter().map(|(l, d)| (*l, d)).collect();
    Ok(merge_day(day_index, &layers))
}

/// Resolve week `week_number` of a program through `scope`.
pub fn resolve_week<S>(
    store: &S,
    program_id: &str,
    week_number: u32,
    scope: &ContentScope,
) -> Result<EffectiveWeek>
where
    S: ProgramStore + EnrollmentStore + ContentStore + ?Sized,
{
    let program = require_program(store, program_id)?;
    program.check_week(week_number)?;
    let chain = layer_chain(store, program_id, scope)?;

    let week = store
        .weeks(program_id)?
        .into_iter()
        .find(|w| w.week_number == week_number)
        .ok_or_else(|| {
            CoreError::not_found(EntityKind::Week, format!("{program_id}#{week_number}"))
        })?;
    let range = week.range;

    let mut records = Vec::with_capacity(chain.len());
    for key in &chain {
        if let Some(week) = store.week_content(program_id, key, week_number)? {
            records.push((key.layer(), week));
        }
    }
    let layers: Vec<(Layer, &WeekContent)> = records.iter().map(|(l, w)| (*l, w)).collect();
    Ok(merge_week(week_number, range, &layers))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str) -> ProgramTask {
        ProgramTask::primary(id, id.to_uppercase())
    }

    #[test]
    fn template_only_round_trips() {
        let template = DayContent {
            day_index: 2,
            title: Some("Move".into()),
            tasks: Some(vec![task("walk")]),
            ..Default::default()
        };
        let empty_override = DayContent::new(2);
        let effective = merge_day(
            2,
            &[(Layer::Template, &template), (Layer::Client, &empty_override)],
        );

        assert_eq!(effective.content(), template);
        assert_eq!(effective.title.source, Some(Layer::Template));
        assert!(!effective.is_customized());
    }

    #[test]
    fn higher_layer_replaces_whole_field() {
        let template = DayContent {
            day_index: 1,
            title: Some("Template title".into()),
            tasks: Some(vec![task("a"), task("b")]),
            ..Default::default()
        };
        let cohort = DayContent {
            day_index: 1,
            tasks: Some(vec![task("c")]),
            ..Default::default()
        };
        let client = DayContent {
            day_index: 1,
            title: Some("Just for you".into()),
            ..Default::default()
        };

        let effective = merge_day(
            1,
            &[
                (Layer::Template, &template),
                (Layer::Cohort, &cohort),
                (Layer::Client, &client),
            ],
        );

        assert_eq!(effective.title.value.as_deref(), Some("Just for you"));
        assert_eq!(effective.title.source, Some(Layer::Client));
        assert_eq!(effective.tasks.value, Some(vec![task("c")]));
        assert_eq!(effective.tasks.source, Some(Layer::Cohort));
        assert_eq!(effective.customized_fields(), vec!["title", "tasks"]);
    }

    #[test]
    fn empty_list_in_override_is_a_value() {
        let template = DayContent {
            day_index: 1,
            tasks: Some(vec![task("a")]),
            ..Default::default()
        };
        let client = DayContent {
            day_index: 1,
            tasks: Some(vec![]),
            ..Default::default()
        };
        let effective = merge_day(1, &[(Layer::Template, &template), (Layer::Client, &client)]);
        assert_eq!(effective.tasks.value, Some(vec![]));
        assert_eq!(effective.tasks.source, Some(Layer::Client));
    }

    #[test]
    fn unset_everywhere_has_no_source() {
        let effective = merge_day(5, &[]);
        assert_eq!(effective.title, Resolved::default());
        assert_eq!(effective.content(), DayContent::new(5));
    }

    #[test]
    fn week_policy_falls_back_to_program_then_default() {
        let program = Program {
            id: "p".into(),
            name: "P".into(),
            length_days: 14,
            include_weekends: true,
            duration_type: Default::default(),
            daily_focus_slots: 1,
            task_distribution: Some(DistributionPolicy::Spread),
        };
        let week = merge_week(1, None, &[]);
        assert_eq!(
            week.effective_policy(&program, DistributionPolicy::RepeatDaily),
            DistributionPolicy::Spread
        );

        let cohort = WeekContent {
            distribution: Some(DistributionPolicy::RepeatDaily),
            ..Default::default()
        };
        let week = merge_week(1, None, &[(Layer::Cohort, &cohort)]);
        assert_eq!(
            week.effective_policy(&program, DistributionPolicy::Spread),
            DistributionPolicy::RepeatDaily
        );
        assert_eq!(week.customized_fields(), vec!["distribution"]);
    }
}
