//! Daily log ledger: which task ids were completed on which date.
//!
//! Entries are only ever added to. Logging an id that is already recorded
//! for the date changes nothing.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::model::DailyLogEntry;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyLedger {
    days: BTreeMap<NaiveDate, BTreeSet<Uuid>>,
}

impl DailyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted entries. Duplicate dates are merged by union.
    pub fn from_entries(entries: impl IntoIterator<Item = DailyLogEntry>) -> Self {
        let mut ledger = Self::new();
        for entry in entries {
            let day = ledger.days.entry(entry.date).or_default();
            day.extend(entry.completed_tasks);
        }
        ledger
    }

    /// Record `task_id` as completed on `date`. Returns `false` when it was
    /// already recorded.
    pub fn log_task(&mut self, date: NaiveDate, task_id: Uuid) -> bool {
        self.days.entry(date).or_default().insert(task_id)
    }

    pub fn entry_for(&self, date: NaiveDate) -> Option<DailyLogEntry> {
        self.days.get(&date).map(|tasks| DailyLogEntry {
            date,
            completed_tasks: tasks.iter().copied().collect(),
        })
    }

    pub fn completed_count(&self, date: NaiveDate) -> usize {
        self.days.get(&date).map_or(0, BTreeSet::len)
    }

    pub fn contains(&self, date: NaiveDate, task_id: Uuid) -> bool {
        self.days.get(&date).is_some_and(|tasks| tasks.contains(&task_id))
    }

    /// Dates with at least one completed task, oldest first.
    pub fn active_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days
            .iter()
            .filter(|(_, tasks)| !tasks.is_empty())
            .map(|(date, _)| *date)
    }

    /// All entries in date order, for the progress snapshot.
    pub fn entries(&self) -> Vec<DailyLogEntry> {
        self.days
            .iter()
            .map(|(date, tasks)| DailyLogEntry {
                date: *date,
                completed_tasks: tasks.iter().copied().collect(),
            })
            .collect()
    }

    pub fn total_logged(&self) -> usize {
        self.days.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn clear(&mut self) {
        self.days.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_log_same_task_twice_is_idempotent() {
        let mut ledger = DailyLedger::new();
        let t = Uuid::now_v7();
        assert!(ledger.log_task(day(3), t));
        assert!(!ledger.log_task(day(3), t));
        let entry = ledger.entry_for(day(3)).unwrap();
        assert_eq!(entry.completed_tasks, vec![t]);
    }

    #[test]
    fn test_new_ids_are_unioned_into_existing_date() {
        let mut ledger = DailyLedger::new();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        ledger.log_task(day(3), a);
        ledger.log_task(day(3), b);
        assert_eq!(ledger.completed_count(day(3)), 2);
        assert_eq!(ledger.entries().len(), 1);
    }

    #[test]
    fn test_lookup_of_unlogged_date_is_none() {
        let ledger = DailyLedger::new();
        assert!(ledger.entry_for(day(1)).is_none());
        assert_eq!(ledger.completed_count(day(1)), 0);
    }

    #[test]
    fn test_from_entries_merges_duplicate_dates() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let ledger = DailyLedger::from_entries(vec![
            DailyLogEntry {
                date: day(2),
                completed_tasks: vec![a],
            },
            DailyLogEntry {
                date: day(2),
                completed_tasks: vec![a, b],
            },
        ]);
        assert_eq!(ledger.entries().len(), 1);
        assert_eq!(ledger.completed_count(day(2)), 2);
    }

    #[test]
    fn test_active_dates_skip_empty_entries() {
        let ledger = DailyLedger::from_entries(vec![
            DailyLogEntry {
                date: day(1),
                completed_tasks: vec![Uuid::now_v7()],
            },
            DailyLogEntry {
                date: day(2),
                completed_tasks: vec![],
            },
        ]);
        let active: Vec<_> = ledger.active_dates().collect();
        assert_eq!(active, vec![day(1)]);
        assert_eq!(ledger.total_logged(), 1);
    }
}
