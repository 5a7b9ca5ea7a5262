use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One course offering from the curriculum catalog.
///
/// `requirements` and `classes` are only present once the detail page has
/// been read. A discipline whose detail fetch failed keeps them as `None`,
/// which serializes to an absent key rather than an empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discipline {
    pub discipline_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub attended: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub ramification: String,
    #[serde(default)]
    pub credits: u32,
    #[serde(default)]
    pub total_hours: u32,
    #[serde(default)]
    pub credit_lock: String,
    #[serde(default)]
    pub class_in_period: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Vec<Requirement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<Class>>,
}

impl Discipline {
    pub fn is_enriched(&self) -> bool {
        self.requirements.is_some() || self.classes.is_some()
    }

    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            self.discipline_id.as_deref().unwrap_or("<unnamed>")
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

/// One section ("turma") of a discipline.
///
/// Counters default to 0 and text fields to `None` when the portal text
/// lacks the corresponding label. `whatsapp_group` is an operator
/// annotation and is never produced by scraping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Class {
    pub number: u32,
    pub preferential: Option<String>,
    pub times: Option<String>,
    pub teacher: Option<String>,
    pub offered_uerj: u32,
    pub occupied_uerj: u32,
    pub offered_vestibular: u32,
    pub occupied_vestibular: u32,
    pub request_uerj_offered: u32,
    pub request_uerj_total: u32,
    pub request_uerj_preferential: u32,
    pub request_vestibular_offered: u32,
    pub request_vestibular_total: u32,
    pub request_vestibular_preferential: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_group: Option<String>,
}

/// A catalog row as read from the list page, before detail enrichment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogRow {
    pub discipline_id: Option<String>,
    pub name: String,
    pub period: String,
    pub attended: String,
    pub kind: String,
    pub ramification: String,
    pub credits: u32,
    pub total_hours: u32,
    pub credit_lock: String,
    pub class_in_period: String,
}

impl From<CatalogRow> for Discipline {
    fn from(row: CatalogRow) -> Self {
        Discipline {
            discipline_id: row.discipline_id,
            name: row.name,
            period: row.period,
            attended: row.attended,
            kind: row.kind,
            ramification: row.ramification,
            credits: row.credits,
            total_hours: row.total_hours,
            credit_lock: row.credit_lock,
            class_in_period: row.class_in_period,
            requirements: None,
            classes: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub student_id: String,
    #[serde(default)]
    pub completed_disciplines: BTreeSet<String>,
    #[serde(default)]
    pub current_disciplines: BTreeSet<String>,
}

/// Portal login. The secret is kept out of `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    pub id: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }

    pub fn from_env() -> crate::error::Result<Self> {
        let id = std::env::var(crate::constants::ENV_MATRICULA)?;
        let secret = std::env::var(crate::constants::ENV_SENHA)?;
        Ok(Self { id, secret })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}
