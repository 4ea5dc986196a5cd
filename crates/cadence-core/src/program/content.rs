//! Week and day content records.
//!
//! The same shapes are used for the template, cohort and client layers.
//! Every field is optional: in an override record `None` means "inherit from
//! the layer below", never "empty". An empty list is a real value.

use serde::{Deserialize, Serialize};

use super::DistributionPolicy;

/// A task authored into a program week or day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgramTask {
    pub id: String,
    pub label: String,
    /// Primary tasks are the day's must-dos; secondary ones are optional.
    #[serde(default = "default_true")]
    pub is_primary: bool,
    #[serde(default)]
    pub estimated_minutes: Option<u32>,
}

impl ProgramTask {
    pub fn primary(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            is_primary: true,
            estimated_minutes: None,
        }
    }

    pub fn secondary(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            is_primary: false,
            ..Self::primary(id, label)
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Habit {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Target completions per week, if the coach set one.
    #[serde(default)]
    pub target_per_week: Option<u8>,
}

/// Course material assigned to a day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CourseAssignment {
    pub course_id: String,
    #[serde(default)]
    pub lesson_ids: Vec<String>,
}

/// Content for a single program day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DayContent {
    pub day_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<ProgramTask>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub habits: Option<Vec<Habit>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courses: Option<Vec<CourseAssignment>>,
}

impl DayContent {
    pub fn new(day_index: u32) -> Self {
        Self {
            day_index,
            ..Default::default()
        }
    }

    /// True when no field is set.
    pub fn is_sparse_empty(&self) -> bool {
        self.title.is_none()
            && self.daily_prompt.is_none()
            && self.tasks.is_none()
            && self.habits.is_none()
            && self.courses.is_none()
    }

    /// Overlay every field that `patch` sets onto `self`.
    pub fn apply_patch(&mut self, patch: &DayContent) {
        overlay(&mut self.title, &patch.title);
        overlay(&mut self.daily_prompt, &patch.daily_prompt);
        overlay(&mut self.tasks, &patch.tasks);
        overlay(&mut self.habits, &patch.habits);
        overlay(&mut self.courses, &patch.courses);
    }
}

/// Content attached to a structural week.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WeekContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_tasks: Option<Vec<ProgramTask>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_habits: Option<Vec<Habit>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_prompt: Option<String>,
    /// Short "this week, focus on..." bullet points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_focus: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<DistributionPolicy>,
}

impl WeekContent {
    pub fn is_sparse_empty(&self) -> bool {
        *self == WeekContent::default()
    }

    /// Overlay every field that `patch` sets onto `self`.
    pub fn apply_patch(&mut self, patch: &WeekContent) {
        overlay(&mut self.theme, &patch.theme);
        overlay(&mut self.description, &patch.description);
        overlay(&mut self.weekly_tasks, &patch.weekly_tasks);
        overlay(&mut self.weekly_habits, &patch.weekly_habits);
        overlay(&mut self.weekly_prompt, &patch.weekly_prompt);
        overlay(&mut self.current_focus, &patch.current_focus);
        overlay(&mut self.notes, &patch.notes);
        overlay(&mut self.distribution, &patch.distribution);
    }
}

fn overlay<T: Clone>(target: &mut Option<T>, patch: &Option<T>) {
    if let Some(value) = patch {
        *target = Some(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_only_touches_set_fields() {
        let mut day = DayContent {
            day_index: 3,
            title: Some("Hydrate".into()),
            daily_prompt: Some("How did you sleep?".into()),
            ..Default::default()
        };
        let patch = DayContent {
            day_index: 3,
            title: Some("Hydrate more".into()),
            tasks: Some(vec![]),
            ..Default::default()
        };
        day.apply_patch(&patch);

        assert_eq!(day.title.as_deref(), Some("Hydrate more"));
        assert_eq!(day.daily_prompt.as_deref(), Some("How did you sleep?"));
        assert_eq!(day.tasks, Some(vec![]));
        assert!(day.habits.is_none());
    }

    #[test]
    fn sparse_day_serializes_without_unset_fields() {
        let day = DayContent::new(4);
        let json = serde_json::to_string(&day).unwrap();
        assert_eq!(json, r#"{"day_index":4}"#);
        assert!(day.is_sparse_empty());
    }

    #[test]
    fn task_primary_flag_defaults_to_true() {
        let task: ProgramTask = serde_json::from_str(r#"{"id":"t1","label":"Walk"}"#).unwrap();
        assert!(task.is_primary);
        assert!(!ProgramTask::secondary("t2", "Stretch").is_primary);
    }
}
