use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::dates::lenient_date;
use super::profile::Severity;

/// A milestone as written in the static template document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MilestoneTemplate {
    /// Stable identifier. Filled in by the catalog when the document omits it.
    #[serde(default)]
    pub id: Option<String>,
    pub task: String,
    #[serde(default)]
    pub description: String,
    pub points: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_difficulty")]
    pub difficulty_level: String,
    #[serde(default)]
    pub teaches: Vec<String>,
}

fn default_difficulty() -> String {
    "beginner".to_string()
}

/// Id given to a template entry that has none: `<severity>-<position>`.
pub fn derived_milestone_id(severity: Severity, index: usize) -> String {
    format!("{severity}-{}", index + 1)
}

/// A milestone in a user's progression queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneTask {
    #[serde(default)]
    pub id: String,
    pub task: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default, alias = "difficulty_level")]
    pub difficulty_level: String,
    #[serde(default)]
    pub teaches: Vec<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub completion_date: Option<NaiveDate>,
}

impl MilestoneTask {
    /// A pending milestone built from a template entry whose id has already
    /// been resolved.
    pub fn from_template(template: &MilestoneTemplate, id: String) -> Self {
        Self {
            id,
            task: template.task.clone(),
            description: template.description.clone(),
            points: template.points,
            category: template.category.clone(),
            difficulty_level: template.difficulty_level.clone(),
            teaches: template.teaches.clone(),
            completed: false,
            completion_date: None,
        }
    }

    /// Content identity used to match progress saved before template ids
    /// were stable.
    pub fn same_content(&self, other: &MilestoneTask) -> bool {
        self.task == other.task && self.description == other.description
    }
}
