//! Reconciliation of freshly scraped disciplines with stored ones.
//!
//! The stored document wins for annotations (currently `whatsappGroup` on
//! classes), the fresh record wins for everything else, and only top-level
//! fields whose serialized value changed are written back.

use crate::constants::DISCIPLINE_KEY_FIELD;
use crate::error::{Result, ScraperError};
use crate::metrics::{record_upsert, UpsertKind};
use crate::storage::{Collection, DocumentStore};
use crate::types::Discipline;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// Names of the top-level fields that were written.
    Updated(Vec<String>),
    Unchanged,
}

pub struct Reconciler {
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("store", &"<Arc<dyn DocumentStore>>")
            .finish()
    }
}

impl Reconciler {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Inserts `fresh` if unknown, otherwise writes the minimal partial update.
    #[instrument(skip(self, fresh), fields(discipline_id = ?fresh.discipline_id))]
    pub async fn upsert(&self, fresh: &Discipline) -> Result<UpsertOutcome> {
        let key = fresh.discipline_id.as_deref().ok_or_else(|| {
            ScraperError::Validation(format!("discipline '{}' has no id", fresh.name))
        })?;

        let Some(existing) = self.store.find_by_key(Collection::Disciplines, key).await? else {
            self.store
                .insert_one(Collection::Disciplines, serde_json::to_value(fresh)?)
                .await?;
            info!("{} inserted", fresh.label());
            record_upsert(UpsertKind::Inserted);
            return Ok(UpsertOutcome::Inserted);
        };

        let mut merged = fresh.clone();
        let carried = merge_annotations(&mut merged, &existing);
        if carried > 0 {
            debug!("Carried {} class annotation(s) forward", carried);
        }

        let merged_value = serde_json::to_value(&merged)?;
        let Value::Object(merged_fields) = merged_value else {
            return Err(ScraperError::persistence("discipline did not serialize to an object"));
        };
        let updates = changed_fields(&merged_fields, &existing);
        if updates.is_empty() {
            debug!("{} unchanged", fresh.label());
            record_upsert(UpsertKind::Unchanged);
            return Ok(UpsertOutcome::Unchanged);
        }

        let names: Vec<String> = updates.keys().cloned().collect();
        let matched = self
            .store
            .update_one(Collection::Disciplines, key, updates)
            .await?;
        if !matched {
            return Err(ScraperError::persistence(format!(
                "discipline {key} disappeared before it could be updated"
            )));
        }
        info!("{} updated fields {:?}", fresh.label(), names);
        record_upsert(UpsertKind::Updated);
        Ok(UpsertOutcome::Updated(names))
    }
}

/// Copies stored `whatsappGroup` values onto fresh classes with the same
/// number that have none. Never overwrites a fresh value. Returns how many
/// annotations were carried.
///
/// Reads the stored document loosely so older documents with string-typed
/// numbers still give up their annotations.
pub fn merge_annotations(fresh: &mut Discipline, existing: &Value) -> usize {
    let stored = stored_annotations(existing);
    if stored.is_empty() {
        return 0;
    }
    let Some(classes) = fresh.classes.as_mut() else {
        return 0;
    };

    let mut carried = 0;
    for class in classes.iter_mut().filter(|c| c.whatsapp_group.is_none()) {
        if let Some(group) = stored.get(&class.number) {
            class.whatsapp_group = Some(group.clone());
            carried += 1;
        }
    }
    carried
}

fn stored_annotations(existing: &Value) -> HashMap<u32, String> {
    let mut annotations = HashMap::new();
    let classes = existing
        .get("classes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten();
    for class in classes {
        let number = match class.get("number") {
            Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        let group = class.get("whatsappGroup").and_then(Value::as_str);
        if let (Some(number), Some(group)) = (number, group) {
            annotations
                .entry(number)
                .or_insert_with(|| group.to_string());
        }
    }
    annotations
}

/// Top-level fields of `fresh` whose value differs from `existing`.
///
/// Values are compared as whole JSON values, so a reordered array counts as
/// a change. Fields absent from `fresh` are never touched; the identity
/// field is never included.
pub fn changed_fields(fresh: &Map<String, Value>, existing: &Value) -> Map<String, Value> {
    fresh
        .iter()
        .filter(|(field, _)| field.as_str() != DISCIPLINE_KEY_FIELD)
        .filter(|(field, value)| existing.get(field.as_str()) != Some(*value))
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect()
}
