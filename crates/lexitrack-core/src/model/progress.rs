use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::dates::lenient_date;
use super::milestone::MilestoneTask;
use super::profile::{lenient_severity, Severity};

/// The task ids completed on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLogEntry {
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "lenient_task_ids")]
    pub completed_tasks: Vec<Uuid>,
}

fn lenient_task_ids<'de, D>(deserializer: D) -> std::result::Result<Vec<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) => Uuid::parse_str(&s).ok(),
            _ => None,
        })
        .collect())
}

fn lenient_index<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(|v| v.as_i64())
        .and_then(|n| usize::try_from(n).ok()))
}

/// Full snapshot of a user's progress. Saved in one piece on every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressBundle {
    #[serde(default)]
    pub milestone_points: u32,
    #[serde(default)]
    pub milestone_tasks: Vec<MilestoneTask>,
    #[serde(default, deserialize_with = "lenient_index")]
    pub current_milestone_index: Option<usize>,
    #[serde(default, deserialize_with = "lenient_severity")]
    pub current_milestone_level: Option<Severity>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub tracking_started_date: Option<NaiveDate>,
    #[serde(default)]
    pub daily_logs: Vec<DailyLogEntry>,
}
