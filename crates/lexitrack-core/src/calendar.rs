//! Progress calendar projection. Read-only: derives streaks, per-day
//! intensity and milestone markers from the ledger and the milestone queue.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::{LexitrackError, Result};
use crate::ledger::DailyLedger;
use crate::model::MilestoneTask;

/// Intensity band of one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayTier {
    /// Future, or before the tracking start. Not interactive.
    Outside,
    /// Inside the tracking window with nothing logged.
    Idle,
    /// 1–2 tasks.
    Low,
    /// 3–4 tasks.
    Mid,
    /// 5 or more tasks.
    High,
}

impl DayTier {
    fn for_count(count: usize) -> Self {
        match count {
            0 => Self::Idle,
            1..=2 => Self::Low,
            3..=4 => Self::Mid,
            _ => Self::High,
        }
    }
}

impl std::fmt::Display for DayTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outside => write!(f, "outside"),
            Self::Idle => write!(f, "idle"),
            Self::Low => write!(f, "low"),
            Self::Mid => write!(f, "mid"),
            Self::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCell {
    pub date: NaiveDate,
    pub completed_count: usize,
    pub tier: DayTier,
    /// Ids of milestones completed on this day.
    pub milestones: Vec<String>,
    pub disabled: bool,
    pub is_today: bool,
}

impl DayCell {
    pub fn has_milestone(&self) -> bool {
        !self.milestones.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthStats {
    pub active_days: usize,
    pub tasks_logged: usize,
    pub milestones_reached: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    /// Empty cells before day 1 in a Sunday-first grid.
    pub leading_blanks: u32,
    pub days: Vec<DayCell>,
    pub stats: MonthStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StreakSummary {
    pub current: u32,
    pub best: u32,
    pub active_days: u32,
}

pub struct CalendarProjector<'a> {
    ledger: &'a DailyLedger,
    milestones: &'a [MilestoneTask],
    tracking_started: Option<NaiveDate>,
    today: NaiveDate,
}

impl<'a> CalendarProjector<'a> {
    pub fn new(
        ledger: &'a DailyLedger,
        milestones: &'a [MilestoneTask],
        tracking_started: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Self {
        Self {
            ledger,
            milestones,
            tracking_started,
            today,
        }
    }

    /// Inside the tracking window: not in the future and not before a set
    /// tracking start.
    pub fn in_window(&self, date: NaiveDate) -> bool {
        date <= self.today && self.tracking_started.map_or(true, |start| date >= start)
    }

    pub fn day(&self, date: NaiveDate) -> DayCell {
        let completed_count = self.ledger.completed_count(date);
        let in_window = self.in_window(date);
        let tier = if in_window {
            DayTier::for_count(completed_count)
        } else {
            DayTier::Outside
        };
        let milestones = self
            .milestones
            .iter()
            .filter(|m| m.completed && m.completion_date == Some(date))
            .map(|m| m.id.clone())
            .collect();

        DayCell {
            date,
            completed_count,
            tier,
            milestones,
            disabled: !in_window,
            is_today: date == self.today,
        }
    }

    pub fn month(&self, year: i32, month: u32) -> Result<MonthView> {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            LexitrackError::InvalidInput(format!("invalid month {year}-{month:02}"))
        })?;

        let days: Vec<DayCell> = first
            .iter_days()
            .take_while(|d| d.month() == month)
            .map(|d| self.day(d))
            .collect();

        let stats = MonthStats {
            active_days: days
                .iter()
                .filter(|c| !c.disabled && c.completed_count > 0)
                .count(),
            tasks_logged: days
                .iter()
                .filter(|c| !c.disabled)
                .map(|c| c.completed_count)
                .sum(),
            milestones_reached: days.iter().map(|c| c.milestones.len()).sum(),
        };

        Ok(MonthView {
            year,
            month,
            leading_blanks: first.weekday().num_days_from_sunday(),
            days,
            stats,
        })
    }

    /// Consecutive days with at least one completed task, walking back from
    /// today. Stops at the first empty day or before the tracking start.
    pub fn streak(&self) -> u32 {
        let mut count = 0;
        let mut day = self.today;
        loop {
            if self.tracking_started.is_some_and(|start| day < start) {
                break;
            }
            if self.ledger.completed_count(day) == 0 {
                break;
            }
            count += 1;
            match day.pred_opt() {
                Some(prev) => day = prev,
                None => break,
            }
        }
        count
    }

    /// Longest run of consecutive active days inside the tracking window.
    pub fn best_streak(&self) -> u32 {
        let mut best = 0u32;
        let mut run = 0u32;
        let mut prev: Option<NaiveDate> = None;
        for date in self.ledger.active_dates().filter(|d| self.in_window(*d)) {
            run = match prev {
                Some(p) if p.succ_opt() == Some(date) => run + 1,
                _ => 1,
            };
            best = best.max(run);
            prev = Some(date);
        }
        best
    }

    pub fn summary(&self) -> StreakSummary {
        StreakSummary {
            current: self.streak(),
            best: self.best_streak(),
            active_days: self
                .ledger
                .active_dates()
                .filter(|d| self.in_window(*d))
                .count() as u32,
        }
    }
}

/// Parse `YYYY-MM` into `(year, month)`.
pub fn parse_month(raw: &str) -> Result<(i32, u32)> {
    let invalid = || LexitrackError::InvalidInput(format!("month must be YYYY-MM, got '{raw}'"));
    let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}
