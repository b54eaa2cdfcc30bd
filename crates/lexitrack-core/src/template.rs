//! Static per-severity templates: the baseline daily routine and the ordered
//! milestone list. Loaded once and never mutated afterwards.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::config::TemplateConfig;
use crate::error::{LexitrackError, Result};
use crate::model::{derived_milestone_id, MilestoneTask, MilestoneTemplate, ScheduleActivity, Severity};

const BUILTIN_TEMPLATES: &str = include_str!("../data/templates.json");

#[derive(Debug, Deserialize)]
struct RawSeverityTemplate {
    #[serde(default)]
    daily_routine: Vec<ScheduleActivity>,
    #[serde(default)]
    milestone_tasks: Vec<MilestoneTemplate>,
}

/// Template for one severity. Every milestone has a resolved, unique id.
#[derive(Debug, Clone, Default)]
pub struct SeverityTemplate {
    pub daily_routine: Vec<ScheduleActivity>,
    pub milestones: Vec<MilestoneTemplate>,
}

impl SeverityTemplate {
    /// A fresh, all-pending milestone queue for this severity.
    pub fn pending_milestones(&self) -> Vec<MilestoneTask> {
        self.milestones
            .iter()
            .map(|m| MilestoneTask::from_template(m, m.id.clone().unwrap_or_default()))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: BTreeMap<Severity, SeverityTemplate>,
}

impl TemplateCatalog {
    /// The catalog compiled into the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_TEMPLATES)
    }

    /// Load from the configured file, or the built-in catalog when unset.
    pub fn load(config: &TemplateConfig) -> Result<Self> {
        match &config.path {
            Some(path) => Self::from_path(path),
            None => Self::builtin(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LexitrackError::Template(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    /// Parse a severity-keyed template document.
    ///
    /// Unknown severity keys are skipped with a warning. Milestones without an
    /// explicit id get `<severity>-<position>`. Duplicate ids within one
    /// severity are rejected since completion is matched back by id.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, RawSeverityTemplate> = serde_json::from_str(json)
            .map_err(|e| LexitrackError::Template(format!("invalid template document: {e}")))?;

        let mut templates = BTreeMap::new();
        for (key, raw_template) in raw {
            let severity: Severity = match key.parse() {
                Ok(s) => s,
                Err(_) => {
                    tracing::warn!(key = %key, "skipping template for unknown severity");
                    continue;
                }
            };

            let mut seen = HashSet::new();
            let mut milestones = Vec::with_capacity(raw_template.milestone_tasks.len());
            for (index, mut milestone) in raw_template.milestone_tasks.into_iter().enumerate() {
                let id = milestone
                    .id
                    .take()
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or_else(|| derived_milestone_id(severity, index));
                if !seen.insert(id.clone()) {
                    return Err(LexitrackError::Template(format!(
                        "duplicate milestone id '{id}' in {severity} template"
                    )));
                }
                milestone.id = Some(id);
                milestones.push(milestone);
            }

            templates.insert(
                severity,
                SeverityTemplate {
                    daily_routine: raw_template.daily_routine,
                    milestones,
                },
            );
        }

        for severity in Severity::ALL {
            if !templates.contains_key(&severity) {
                tracing::warn!(%severity, "template document has no entry for severity");
            }
        }

        Ok(Self { templates })
    }

    /// Template for a severity. A severity missing from the document yields
    /// an empty template.
    pub fn get(&self, severity: Severity) -> SeverityTemplate {
        self.templates.get(&severity).cloned().unwrap_or_default()
    }

    pub fn daily_routine(&self, severity: Severity) -> &[ScheduleActivity] {
        self.templates
            .get(&severity)
            .map(|t| t.daily_routine.as_slice())
            .unwrap_or(&[])
    }

    pub fn pending_milestones(&self, severity: Severity) -> Vec<MilestoneTask> {
        self.templates
            .get(&severity)
            .map(SeverityTemplate::pending_milestones)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_all_severities() {
        let catalog = TemplateCatalog::builtin().unwrap();
        for severity in Severity::ALL {
            assert!(!catalog.daily_routine(severity).is_empty());
            assert!(!catalog.pending_milestones(severity).is_empty());
        }
    }

    #[test]
    fn test_builtin_routine_times_are_valid() {
        let catalog = TemplateCatalog::builtin().unwrap();
        for severity in Severity::ALL {
            for entry in catalog.daily_routine(severity) {
                crate::model::validate_time(&entry.time).unwrap();
            }
        }
    }

    #[test]
    fn test_explicit_ids_are_kept() {
        let catalog = TemplateCatalog::builtin().unwrap();
        let mild = catalog.pending_milestones(Severity::Mild);
        assert_eq!(mild[0].id, "mild-first-passage");
    }

    #[test]
    fn test_missing_ids_are_derived_from_position() {
        let catalog = TemplateCatalog::builtin().unwrap();
        let moderate = catalog.pending_milestones(Severity::Moderate);
        assert_eq!(moderate[0].id, "moderate-1");
        assert_eq!(moderate[2].id, "moderate-3");
        assert!(moderate.iter().all(|m| !m.completed));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"{"mild":{"milestone_tasks":[
            {"id":"a","task":"One","points":10},
            {"id":"a","task":"Two","points":10}
        ]}}"#;
        let err = TemplateCatalog::from_json(json).unwrap_err();
        assert!(err.to_string().contains("duplicate milestone id"));
    }

    #[test]
    fn test_unknown_severity_skipped_and_missing_is_empty() {
        let json = r#"{"extreme":{"daily_routine":[{"time":"08:00","activity":"x"}]},
                       "mild":{"daily_routine":[{"time":"08:00","activity":"Read"}]}}"#;
        let catalog = TemplateCatalog::from_json(json).unwrap();
        assert_eq!(catalog.daily_routine(Severity::Mild).len(), 1);
        assert!(catalog.daily_routine(Severity::Severe).is_empty());
        assert!(catalog.pending_milestones(Severity::Severe).is_empty());
    }

    #[test]
    fn test_invalid_document_is_template_error() {
        let err = TemplateCatalog::from_json("[1,2,3]").unwrap_err();
        assert!(matches!(err, LexitrackError::Template(_)));
    }
}
