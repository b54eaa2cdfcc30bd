use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Severity;
use crate::error::{LexitrackError, Result};

pub const MAX_ACTIVITY_LENGTH: usize = 200;

const BASELINE_NAMESPACE: Uuid = Uuid::from_u128(0x6c65_7869_7472_4b62_8a5e_0d1f_3a9c_7e21);

/// Id of the baseline task at template position `index` for one user on one
/// day. Every load on the same day agrees; the next day gets new ids.
pub fn baseline_task_id(user_id: &str, severity: Severity, date: NaiveDate, index: usize) -> Uuid {
    let name = format!("{user_id}/{severity}/{date}/{index}");
    Uuid::new_v5(&BASELINE_NAMESPACE, name.as_bytes())
}

/// A schedule entry as it appears in the static template and on the wire.
/// Template entries carry no id; persisted custom tasks do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleActivity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub time: String,
    pub activity: String,
}

impl ScheduleActivity {
    pub fn new(time: impl Into<String>, activity: impl Into<String>) -> Self {
        Self {
            id: None,
            time: time.into(),
            activity: activity.into(),
        }
    }
}

/// A schedule entry instantiated for the current load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskWithStatus {
    pub id: Uuid,
    pub time: String,
    pub activity: String,
    pub is_custom: bool,
    pub completed: bool,
}

impl TaskWithStatus {
    /// Instantiate a template entry with a random id.
    pub fn baseline(activity: &ScheduleActivity) -> Self {
        Self::baseline_with_id(activity, Uuid::now_v7())
    }

    pub fn baseline_with_id(activity: &ScheduleActivity, id: Uuid) -> Self {
        Self {
            id,
            time: activity.time.clone(),
            activity: activity.activity.clone(),
            is_custom: false,
            completed: false,
        }
    }

    /// Instantiate a persisted custom task, keeping its id when it has one.
    pub fn from_custom(activity: &ScheduleActivity) -> Self {
        Self {
            id: activity.id.unwrap_or_else(Uuid::now_v7),
            time: activity.time.clone(),
            activity: activity.activity.clone(),
            is_custom: true,
            completed: false,
        }
    }

    /// A brand new user-authored task.
    pub fn custom(time: impl Into<String>, activity: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            time: time.into(),
            activity: activity.into(),
            is_custom: true,
            completed: false,
        }
    }

    pub fn to_activity(&self) -> ScheduleActivity {
        ScheduleActivity {
            id: Some(self.id),
            time: self.time.clone(),
            activity: self.activity.clone(),
        }
    }
}

/// Partial edit of a schedule task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub time: Option<String>,
    pub activity: Option<String>,
}

/// Validate a user-entered schedule time (`HH:MM`, 24h).
pub fn validate_time(time: &str) -> Result<()> {
    NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map(|_| ())
        .map_err(|_| LexitrackError::InvalidInput(format!("time must be HH:MM, got '{time}'")))
}

/// Validate a user-entered activity description.
pub fn validate_activity(activity: &str) -> Result<()> {
    let trimmed = activity.trim();
    if trimmed.is_empty() {
        return Err(LexitrackError::InvalidInput("activity cannot be empty".into()));
    }
    if trimmed.len() > MAX_ACTIVITY_LENGTH {
        return Err(LexitrackError::InvalidInput(format!(
            "activity exceeds maximum length of {MAX_ACTIVITY_LENGTH} characters"
        )));
    }
    Ok(())
}
