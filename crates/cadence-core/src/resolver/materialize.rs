//! Saving content from a view scope.
//!
//! A save from the template scope edits the template. A save from a cohort
//! or client scope only ever writes that scope's own layer: the first edit
//! creates the override record (copy-on-first-edit), later edits patch it.
//! Creation goes through the store's create-if-absent write so two first
//! edits racing each other end up patching a single record.

use serde::{Deserialize, Serialize};

use super::{layer_chain, require_program, resolve_day, resolve_week, ContentScope, Layer, LayerKey};
use crate::error::{CoreError, EntityKind, Result, ValidationError};
use crate::program::{DayContent, WeekContent};
use crate::store::{ContentStore, EnrollmentStore, InsertOutcome, ProgramStore};

/// What a save wrote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaveOutcome<T> {
    pub layer: Layer,
    /// The record did not exist in that layer before this save.
    pub created: bool,
    /// The record as persisted.
    pub record: T,
}

/// Apply `patch` to day `day_index` in the layer `scope` writes to.
///
/// With `copy_on_first_edit`, a new override record starts as a copy of the
/// content the scope currently shows; otherwise it holds only the patched
/// fields.
pub fn save_day<S>(
    store: &S,
    program_id: &str,
    day_index: u32,
    scope: &ContentScope,
    patch: &DayContent,
    copy_on_first_edit: bool,
) -> Result<SaveOutcome<DayContent>>
where
    S: ProgramStore + EnrollmentStore + ContentStore + ?Sized,
{
    let program = require_program(store, program_id)?;
    program.check_day(day_index)?;
    layer_chain(store, program_id, scope)?;
    let key = scope.write_key();

    if let Some(mut existing) = store.day_content(program_id, &key, day_index)? {
        existing.apply_patch(patch);
        existing.day_index = day_index;
        store.put_day_content(program_id, &key, existing.clone())?;
        return Ok(SaveOutcome {
            layer: key.layer(),
            created: false,
            record: existing,
        });
    }

    let mut record = if copy_on_first_edit && key != LayerKey::Template {
        resolve_day(store, program_id, day_index, scope)?.content()
    } else {
        DayContent::new(day_index)
    };
    record.apply_patch(patch);
    record.day_index = day_index;

    match store.insert_day_content(program_id, &key, record.clone())? {
        InsertOutcome::Inserted => {
            tracing::info!(
                program_id,
                day_index,
                layer = ?key.layer(),
                "created day record on first edit"
            );
            Ok(SaveOutcome {
                layer: key.layer(),
                created: true,
                record,
            })
        }
        InsertOutcome::AlreadyExists(mut current) => {
            tracing::debug!(program_id, day_index, "lost first-edit race; patching winner");
            current.apply_patch(patch);
            store.put_day_content(program_id, &key, current.clone())?;
            Ok(SaveOutcome {
                layer: key.layer(),
                created: false,
                record: current,
            })
        }
    }
}

/// Apply `patch` to week `week_number` in the layer `scope` writes to.
///
/// The template layer of a week is the structural week itself, so a
/// template save for a week that does not exist is `NotFound`.
pub fn save_week<S>(
    store: &S,
    program_id: &str,
    week_number: u32,
    scope: &ContentScope,
    patch: &WeekContent,
    copy_on_first_edit: bool,
) -> Result<SaveOutcome<WeekContent>>
where
    S: ProgramStore + EnrollmentStore + ContentStore + ?Sized,
{
    let program = require_program(store, program_id)?;
    program.check_week(week_number)?;
    layer_chain(store, program_id, scope)?;
    let key = scope.write_key();

    if let Some(mut existing) = store.week_content(program_id, &key, week_number)? {
        existing.apply_patch(patch);
        store.put_week_content(program_id, &key, week_number, existing.clone())?;
        return Ok(SaveOutcome {
            layer: key.layer(),
            created: false,
            record: existing,
        });
    }
    if key == LayerKey::Template {
        return Err(CoreError::not_found(
            EntityKind::Week,
            format!("{program_id}#{week_number}"),
        ));
    }

    let mut record = if copy_on_first_edit {
        resolve_week(store, program_id, week_number, scope)?.content()
    } else {
        WeekContent::default()
    };
    record.apply_patch(patch);

    match store.insert_week_content(program_id, &key, week_number, record.clone())? {
        InsertOutcome::Inserted => {
            tracing::info!(
                program_id,
                week_number,
                layer = ?key.layer(),
                "created week override on first edit"
            );
            Ok(SaveOutcome {
                layer: key.layer(),
                created: true,
                record,
            })
        }
        InsertOutcome::AlreadyExists(mut current) => {
            current.apply_patch(patch);
            store.put_week_content(program_id, &key, week_number, current.clone())?;
            Ok(SaveOutcome {
                layer: key.layer(),
                created: false,
                record: current,
            })
        }
    }
}

fn reject_template_reset(scope: &ContentScope) -> Result<LayerKey> {
    match scope.write_key() {
        LayerKey::Template => Err(ValidationError::InvalidValue {
            field: "scope".into(),
            message: "the template has no lower layer to revert to".into(),
        }
        .into()),
        key => Ok(key),
    }
}

/// Drop the scope's override for a day so it inherits again.
/// Returns whether there was anything to drop.
pub fn reset_day<S>(
    store: &S,
    program_id: &str,
    day_index: u32,
    scope: &ContentScope,
) -> Result<bool>
where
    S: ProgramStore + EnrollmentStore + ContentStore + ?Sized,
{
    let program = require_program(store, program_id)?;
    program.check_day(day_index)?;
    layer_chain(store, program_id, scope)?;
    let key = reject_template_reset(scope)?;
    store.delete_day_content(program_id, &key, day_index)
}

/// Drop the scope's override for a week so it inherits again.
pub fn reset_week<S>(
    store: &S,
    program_id: &str,
    week_number: u32,
    scope: &ContentScope,
) -> Result<bool>
where
    S: ProgramStore + EnrollmentStore + ContentStore + ?Sized,
{
    let program = require_program(store, program_id)?;
    program.check_week(week_number)?;
    layer_chain(store, program_id, scope)?;
    let key = reject_template_reset(scope)?;
    store.delete_week_content(program_id, &key, week_number)
}
