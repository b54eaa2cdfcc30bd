use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LexitrackError, Result};

/// Someone to call in an emergency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub relationship: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl EmergencyContact {
    pub fn new(name: impl Into<String>, relationship: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            relationship: relationship.into(),
            phone: phone.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LexitrackError::InvalidInput("contact name cannot be empty".into()));
        }
        let digits = self.phone.chars().filter(|c| c.is_ascii_digit()).count();
        if digits < 3 {
            return Err(LexitrackError::InvalidInput(format!(
                "'{}' does not look like a phone number",
                self.phone
            )));
        }
        Ok(())
    }
}

/// A visit to a specialist or therapist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckupLog {
    pub id: Uuid,
    pub date: NaiveDate,
    pub practitioner: String,
    #[serde(default)]
    pub notes: String,
    /// Optional assessment score on a 0–100 scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}

impl CheckupLog {
    pub fn new(date: NaiveDate, practitioner: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            date,
            practitioner: practitioner.into(),
            notes: String::new(),
            score: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_score(mut self, score: u8) -> Self {
        self.score = Some(score);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.practitioner.trim().is_empty() {
            return Err(LexitrackError::InvalidInput(
                "practitioner cannot be empty".into(),
            ));
        }
        if let Some(score) = self.score {
            if score > 100 {
                return Err(LexitrackError::InvalidInput(
                    "score must be between 0 and 100".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Records that live in an id-unique list owned by one user.
pub trait Record {
    fn record_id(&self) -> Uuid;
}

impl Record for EmergencyContact {
    fn record_id(&self) -> Uuid {
        self.id
    }
}

impl Record for CheckupLog {
    fn record_id(&self) -> Uuid {
        self.id
    }
}

/// Drop later duplicates so every id appears once.
pub fn dedup_records<T: Record>(records: Vec<T>) -> Vec<T> {
    let mut seen = std::collections::HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.record_id()))
        .collect()
}
