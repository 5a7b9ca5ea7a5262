//! Per-student enrollment bookkeeping.
//!
//! Every identifier is validated before the store is touched. Set updates are
//! read-modify-write; any store failure is returned to the caller.

use crate::error::{Result, ScraperError};
use crate::storage::{Collection, DocumentStore};
use crate::types::Student;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("identifier regex"));

pub fn validate_identifier(what: &str, id: &str) -> Result<()> {
    if IDENTIFIER_RE.is_match(id) {
        Ok(())
    } else {
        Err(ScraperError::Validation(format!("invalid {what} '{id}'")))
    }
}

fn validate_all<'a>(what: &str, ids: impl IntoIterator<Item = &'a String>) -> Result<()> {
    ids.into_iter().try_for_each(|id| validate_identifier(what, id))
}

/// Changes to one discipline-id set. Applied as `set`, then `add`, then `remove`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisciplineSetUpdate {
    pub add: Vec<String>,
    pub remove: Vec<String>,
    pub set: Option<Vec<String>>,
}

impl DisciplineSetUpdate {
    pub fn add(ids: &[&str]) -> Self {
        Self {
            add: ids.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn remove(ids: &[&str]) -> Self {
        Self {
            remove: ids.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn set(ids: &[&str]) -> Self {
        Self {
            set: Some(ids.iter().map(|s| s.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && self.set.is_none()
    }

    fn ids(&self) -> impl Iterator<Item = &String> {
        self.add
            .iter()
            .chain(self.remove.iter())
            .chain(self.set.iter().flatten())
    }

    /// Returns whether `target` changed.
    fn apply(&self, target: &mut BTreeSet<String>) -> bool {
        let before = target.clone();
        if let Some(ids) = &self.set {
            *target = ids.iter().cloned().collect();
        }
        target.extend(self.add.iter().cloned());
        for id in &self.remove {
            target.remove(id);
        }
        *target != before
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudentUpdate {
    pub completed_disciplines: DisciplineSetUpdate,
    pub current_disciplines: DisciplineSetUpdate,
}

impl StudentUpdate {
    fn validate(&self) -> Result<()> {
        validate_all("discipline id", self.completed_disciplines.ids())?;
        validate_all("discipline id", self.current_disciplines.ids())
    }
}

pub struct StudentService {
    store: Arc<dyn DocumentStore>,
}

impl StudentService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    #[instrument(skip_all, fields(student_id = %student.student_id))]
    pub async fn create_student(&self, student: &Student) -> Result<()> {
        validate_identifier("student id", &student.student_id)?;
        validate_all("discipline id", &student.completed_disciplines)?;
        validate_all("discipline id", &student.current_disciplines)?;

        self.store
            .insert_one(Collection::Students, serde_json::to_value(student)?)
            .await?;
        info!("Student created");
        Ok(())
    }

    pub async fn get_student(&self, student_id: &str) -> Result<Student> {
        validate_identifier("student id", student_id)?;
        self.load(student_id).await
    }

    /// Applies `update` and returns the resulting student.
    #[instrument(skip(self, update))]
    pub async fn update_student(&self, student_id: &str, update: &StudentUpdate) -> Result<Student> {
        validate_identifier("student id", student_id)?;
        update.validate()?;

        let mut student = self.load(student_id).await?;
        let mut fields = Map::new();
        if update
            .completed_disciplines
            .apply(&mut student.completed_disciplines)
        {
            fields.insert(
                "completedDisciplines".to_string(),
                serde_json::to_value(&student.completed_disciplines)?,
            );
        }
        if update.current_disciplines.apply(&mut student.current_disciplines) {
            fields.insert(
                "currentDisciplines".to_string(),
                serde_json::to_value(&student.current_disciplines)?,
            );
        }

        if fields.is_empty() {
            debug!("No change for student");
            return Ok(student);
        }
        if !self
            .store
            .update_one(Collection::Students, student_id, fields)
            .await?
        {
            return Err(not_found(student_id));
        }
        info!("Student updated");
        Ok(student)
    }

    pub async fn delete_student(&self, student_id: &str) -> Result<()> {
        validate_identifier("student id", student_id)?;
        if self.store.delete_one(Collection::Students, student_id).await? {
            info!("Student {} deleted", student_id);
            Ok(())
        } else {
            Err(not_found(student_id))
        }
    }

    async fn load(&self, student_id: &str) -> Result<Student> {
        let doc: Value = self
            .store
            .find_by_key(Collection::Students, student_id)
            .await?
            .ok_or_else(|| not_found(student_id))?;
        Ok(serde_json::from_value(doc)?)
    }
}

fn not_found(student_id: &str) -> ScraperError {
    ScraperError::NotFound {
        entity: Collection::Students.entity(),
        id: student_id.to_string(),
    }
}
