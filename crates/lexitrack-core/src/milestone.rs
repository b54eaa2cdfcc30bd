//! Milestone progression engine.
//!
//! Each milestone is either pending or completed. The current milestone is
//! the first pending entry in list order; when none is pending the queue is
//! exhausted. Completion is one-way. A redo on a completed milestone only
//! awards bonus points.
//!
//! Persisted entries that belong to another severity's template are carried
//! along untouched, so switching severity and back restores their state.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::MilestoneConfig;
use crate::model::MilestoneTask;

/// Points awarded for redoing an already completed milestone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RedoPolicy {
    pub factor: f64,
    pub min_points: u32,
}

impl Default for RedoPolicy {
    fn default() -> Self {
        Self {
            factor: 0.8,
            min_points: 1,
        }
    }
}

impl From<&MilestoneConfig> for RedoPolicy {
    fn from(config: &MilestoneConfig) -> Self {
        Self {
            factor: config.redo_factor,
            min_points: config.redo_min_points,
        }
    }
}

impl RedoPolicy {
    /// `max(min_points, floor(points * factor))`
    pub fn award(&self, points: u32) -> u32 {
        let scaled = (f64::from(points) * self.factor).floor().max(0.0) as u32;
        scaled.max(self.min_points)
    }
}

/// Result of a successful primary completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub milestone_id: String,
    pub task: String,
    pub points_awarded: u32,
    pub total_points: u32,
    /// Id of the milestone that is current after this completion.
    pub next_milestone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MilestoneQueue {
    tasks: Vec<MilestoneTask>,
    /// Persisted entries outside the active template.
    retained: Vec<MilestoneTask>,
    points: u32,
}

impl MilestoneQueue {
    pub fn new(tasks: Vec<MilestoneTask>) -> Self {
        Self {
            tasks,
            retained: Vec::new(),
            points: 0,
        }
    }

    /// Overlay persisted completion state onto a fresh template queue.
    ///
    /// Persisted entries are matched by id. Entries whose id matches no
    /// template id were written before ids were stable and fall back to
    /// `(task, description)` equality. Persisted entries that match nothing,
    /// such as another severity's milestones, are retained as they are.
    pub fn hydrate(template: Vec<MilestoneTask>, persisted: &[MilestoneTask], points: u32) -> Self {
        let template_ids: HashSet<&str> = template.iter().map(|t| t.id.as_str()).collect();
        let mut used = vec![false; persisted.len()];

        let mut tasks = template.clone();
        for task in &mut tasks {
            let found = persisted.iter().position(|p| p.id == task.id).or_else(|| {
                (0..persisted.len()).find(|&i| {
                    let p = &persisted[i];
                    !used[i] && !template_ids.contains(p.id.as_str()) && p.same_content(task)
                })
            });
            if let Some(i) = found {
                used[i] = true;
                let saved = &persisted[i];
                task.completed = saved.completed;
                task.completion_date = if saved.completed {
                    saved.completion_date
                } else {
                    None
                };
            }
        }

        let mut seen = HashSet::new();
        let retained: Vec<MilestoneTask> = persisted
            .iter()
            .zip(&used)
            .filter(|(p, used)| !**used && !template_ids.contains(p.id.as_str()))
            .filter(|(p, _)| seen.insert(p.id.clone()))
            .map(|(p, _)| p.clone())
            .collect();
        if !retained.is_empty() {
            tracing::debug!(count = retained.len(), "keeping milestones outside the active template");
        }

        Self {
            tasks,
            retained,
            points,
        }
    }

    /// Active template followed by retained entries, as persisted.
    pub fn snapshot(&self) -> Vec<MilestoneTask> {
        self.tasks.iter().chain(&self.retained).cloned().collect()
    }

    /// Swap in `template`, keeping points and every known completion.
    pub fn switch_template(&mut self, template: Vec<MilestoneTask>) {
        *self = Self::hydrate(template, &self.snapshot(), self.points);
    }

    pub fn tasks(&self) -> &[MilestoneTask] {
        &self.tasks
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn get(&self, id: &str) -> Option<&MilestoneTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Look up by exact id, or by 1-based position in the queue.
    pub fn resolve(&self, selector: &str) -> Option<&MilestoneTask> {
        let selector = selector.trim();
        self.get(selector).or_else(|| {
            selector
                .parse::<usize>()
                .ok()
                .and_then(|p| p.checked_sub(1))
                .and_then(|i| self.tasks.get(i))
        })
    }

    pub fn current_index(&self) -> Option<usize> {
        self.tasks.iter().position(|t| !t.completed)
    }

    pub fn current(&self) -> Option<&MilestoneTask> {
        self.current_index().map(|i| &self.tasks[i])
    }

    /// All milestones completed (an empty queue counts as exhausted).
    pub fn is_exhausted(&self) -> bool {
        self.current_index().is_none()
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    /// Primary completion path. Pending → completed for exactly `id`.
    /// Returns `None` (and changes nothing) when the id is unknown or the
    /// milestone is already completed.
    pub fn complete(&mut self, id: &str, today: NaiveDate) -> Option<Completion> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        if task.completed {
            return None;
        }
        task.completed = true;
        task.completion_date = Some(today);
        let points = task.points;
        let title = task.task.clone();
        self.points = self.points.saturating_add(points);

        Some(Completion {
            milestone_id: id.to_string(),
            task: title,
            points_awarded: points,
            total_points: self.points,
            next_milestone: self.current().map(|t| t.id.clone()),
        })
    }

    /// Redo a completed milestone for reduced points. No state transition.
    /// Returns the points awarded, or `None` when the milestone is unknown or
    /// still pending.
    pub fn redo(&mut self, id: &str, policy: &RedoPolicy) -> Option<u32> {
        let task = self.tasks.iter().find(|t| t.id == id)?;
        if !task.completed {
            return None;
        }
        let award = policy.award(task.points);
        self.points = self.points.saturating_add(award);
        Some(award)
    }

    /// Hard reset to a fresh template with zero points. Retained entries are
    /// dropped too.
    pub fn reset(&mut self, template: Vec<MilestoneTask>) {
        self.tasks = template;
        self.retained.clear();
        self.points = 0;
    }

    /// Milestones whose completion date is `date`.
    pub fn completed_on(&self, date: NaiveDate) -> impl Iterator<Item = &MilestoneTask> {
        self.tasks
            .iter()
            .filter(move |t| t.completed && t.completion_date == Some(date))
    }
}
