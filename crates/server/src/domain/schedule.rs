//! Gantt and calendar date math, plus unit scheduling conflicts.

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::{
    db::models::Task,
    error::{AppError, Result},
};

/// Inclusive range overlap: ranges touching on a single day overlap.
pub fn ranges_overlap(
    start: NaiveDate,
    end: NaiveDate,
    other_start: NaiveDate,
    other_end: NaiveDate,
) -> bool {
    start <= other_end && end >= other_start
}

/// Whether `task` overlaps another task on the same unit.
pub fn has_conflict(task: &Task, tasks: &[Task]) -> bool {
    let Some(unit_id) = task.unit_id.as_deref() else {
        return false;
    };
    tasks.iter().any(|other| {
        other.id != task.id
            && other.unit_id.as_deref() == Some(unit_id)
            && ranges_overlap(task.start_date, task.end_date, other.start_date, other.end_date)
    })
}

pub fn conflicting_task_ids(tasks: &[Task]) -> HashSet<String> {
    tasks
        .iter()
        .filter(|t| has_conflict(t, tasks))
        .map(|t| t.id.clone())
        .collect()
}

/// Rejects self-dependencies and predecessors outside the project.
pub fn validate_dependencies(
    task_id: &str,
    dependencies: &[String],
    project_task_ids: &HashSet<String>,
) -> Result<()> {
    for dep in dependencies {
        if dep == task_id {
            return Err(AppError::Validation(
                "A task cannot depend on itself".to_string(),
            ));
        }
        if !project_task_ids.contains(dep) {
            return Err(AppError::Validation(format!(
                "Dependency {dep} is not a task of this project"
            )));
        }
    }
    Ok(())
}

/// Dates outside these years are rejected on write.
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2200;
/// Longest allowed span, about ten years.
pub const MAX_SPAN_DAYS: i64 = 3660;

pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    for date in [start, end] {
        if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
            return Err(AppError::Validation(format!(
                "Date {date} must fall between {MIN_YEAR} and {MAX_YEAR}"
            )));
        }
    }
    if end < start {
        return Err(AppError::Validation(
            "End date must not be before start date".to_string(),
        ));
    }
    if (end - start).num_days() > MAX_SPAN_DAYS {
        return Err(AppError::Validation(format!(
            "Date range must not exceed {MAX_SPAN_DAYS} days"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineScale {
    #[default]
    Day,
    Week,
    Month,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GanttBar {
    pub task_id: String,
    pub offset_days: i64,
    pub span_days: i64,
    pub conflict: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GanttWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl GanttWindow {
    /// Spans every task, padded on both sides. `None` when there are no tasks.
    /// Padding that would leave the representable calendar is dropped.
    pub fn for_tasks(tasks: &[Task], padding_days: i64) -> Option<Self> {
        let start = tasks.iter().map(|t| t.start_date).min()?;
        let end = tasks.iter().map(|t| t.end_date).max()?;
        let padding = Duration::try_days(padding_days).unwrap_or_else(Duration::zero);
        Some(Self {
            start: start.checked_sub_signed(padding).unwrap_or(start),
            end: end.checked_add_signed(padding).unwrap_or(end),
        })
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn bar(&self, task: &Task, conflict: bool) -> GanttBar {
        GanttBar {
            task_id: task.id.clone(),
            offset_days: (task.start_date - self.start).num_days(),
            span_days: (task.end_date - task.start_date).num_days() + 1,
            conflict,
        }
    }

    /// Column start dates for the header at the given scale.
    pub fn columns(&self, scale: TimelineScale) -> Vec<NaiveDate> {
        let first = match scale {
            TimelineScale::Day => self.start,
            TimelineScale::Week => {
                let back = Duration::days(i64::from(self.start.weekday().num_days_from_monday()));
                self.start.checked_sub_signed(back).unwrap_or(self.start)
            }
            TimelineScale::Month => self.start.with_day(1).unwrap_or(self.start),
        };

        let mut columns = Vec::new();
        let mut current = Some(first);
        while let Some(date) = current {
            if date > self.end {
                break;
            }
            columns.push(date);
            current = match scale {
                TimelineScale::Day => date.succ_opt(),
                TimelineScale::Week => date.checked_add_signed(Duration::days(7)),
                TimelineScale::Month => next_month(date),
            };
        }
        columns
    }
}

fn next_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
}

/// Month grid as weeks starting on Sunday, `None` for padding cells.
pub fn calendar_month(year: i32, month: u32) -> Option<Vec<[Option<NaiveDate>; 7]>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let leading = first.weekday().num_days_from_sunday() as usize;

    let mut weeks = Vec::new();
    let mut week = [None; 7];
    let mut slot = leading;
    let mut current = Some(first);

    while let Some(date) = current.filter(|d| d.month() == month) {
        week[slot] = Some(date);
        slot += 1;
        if slot == 7 {
            weeks.push(week);
            week = [None; 7];
            slot = 0;
        }
        current = date.succ_opt();
    }
    if slot > 0 {
        weeks.push(week);
    }
    Some(weeks)
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::models::TaskStatus;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn task(id: &str, unit: Option<&str>, start: &str, end: &str) -> Task {
        let now = Utc::now();
        Task {
            id: id.into(),
            project_id: "p1".into(),
            name: id.into(),
            start_date: date(start),
            end_date: date(end),
            progress: 0,
            status: TaskStatus::NotStarted,
            unit_id: unit.map(String::from),
            phase_id: None,
            dependencies: vec![],
            subtasks: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn shared_boundary_day_is_a_conflict() {
        let tasks = vec![
            task("a", Some("apt-101"), "2024-01-01", "2024-01-10"),
            task("b", Some("apt-101"), "2024-01-10", "2024-01-15"),
        ];
        assert!(has_conflict(&tasks[0], &tasks));
        assert_eq!(conflicting_task_ids(&tasks).len(), 2);
    }

    #[test]
    fn adjacent_ranges_do_not_conflict() {
        let tasks = vec![
            task("a", Some("apt-101"), "2024-01-01", "2024-01-09"),
            task("b", Some("apt-101"), "2024-01-10", "2024-01-15"),
        ];
        assert!(conflicting_task_ids(&tasks).is_empty());
    }

    #[test]
    fn different_units_and_unlinked_tasks_never_conflict() {
        let tasks = vec![
            task("a", Some("apt-101"), "2024-01-01", "2024-01-10"),
            task("b", Some("apt-102"), "2024-01-01", "2024-01-10"),
            task("c", None, "2024-01-01", "2024-01-10"),
            task("d", None, "2024-01-01", "2024-01-10"),
        ];
        assert!(conflicting_task_ids(&tasks).is_empty());
    }

    #[test]
    fn dependency_validation() {
        let ids: HashSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        assert!(validate_dependencies("a", &["b".into()], &ids).is_ok());
        assert!(validate_dependencies("a", &["a".into()], &ids).is_err());
        assert!(validate_dependencies("a", &["zzz".into()], &ids).is_err());
        assert!(validate_range(date("2024-01-02"), date("2024-01-01")).is_err());
    }

    #[test]
    fn gantt_window_and_bars() {
        let tasks = vec![
            task("a", None, "2024-01-03", "2024-01-05"),
            task("b", None, "2024-01-04", "2024-01-12"),
        ];
        let window = GanttWindow::for_tasks(&tasks, 2).unwrap();
        assert_eq!(window.start, date("2024-01-01"));
        assert_eq!(window.end, date("2024-01-14"));
        assert_eq!(window.days(), 14);

        let bar = window.bar(&tasks[0], false);
        assert_eq!(bar.offset_days, 2);
        assert_eq!(bar.span_days, 3);
        assert!(GanttWindow::for_tasks(&[], 2).is_none());
    }

    #[test]
    fn task_dates_are_bounded() {
        assert!(validate_range(date("2024-01-01"), date("2024-12-31")).is_ok());
        assert!(validate_range(date("1850-01-01"), date("2024-01-01")).is_err());
        assert!(validate_range(date("2024-01-01"), date("2300-01-01")).is_err());
        assert!(validate_range(date("2024-01-01"), date("2044-01-01")).is_err());
        assert!(validate_range(NaiveDate::MAX, NaiveDate::MAX).is_err());
    }

    #[test]
    fn gantt_padding_stops_at_calendar_edges() {
        let edge = NaiveDate::MAX.pred_opt().unwrap();
        let mut far = task("a", None, "2024-01-01", "2024-01-02");
        far.start_date = edge;
        far.end_date = NaiveDate::MAX;

        let window = GanttWindow::for_tasks(&[far], 2).unwrap();
        assert_eq!(window.start, edge);
        assert_eq!(window.end, NaiveDate::MAX);
        assert_eq!(window.columns(TimelineScale::Day).len(), 2);
    }

    #[test]
    fn timeline_columns_per_scale() {
        let window = GanttWindow {
            start: date("2024-01-03"),
            end: date("2024-03-02"),
        };
        assert_eq!(window.columns(TimelineScale::Day).len(), 60);

        let weeks = window.columns(TimelineScale::Week);
        assert_eq!(weeks[0], date("2024-01-01"));
        assert!(weeks.iter().all(|d| d.weekday() == Weekday::Mon));

        let months = window.columns(TimelineScale::Month);
        assert_eq!(
            months,
            vec![date("2024-01-01"), date("2024-02-01"), date("2024-03-01")]
        );
    }

    #[test]
    fn calendar_grid_starts_on_sunday() {
        // March 2024 starts on a Friday and has 31 days.
        let weeks = calendar_month(2024, 3).unwrap();
        assert_eq!(weeks.len(), 6);
        assert_eq!(weeks[0][4], None);
        assert_eq!(weeks[0][5], Some(date("2024-03-01")));
        assert_eq!(weeks[5][0], Some(date("2024-03-31")));
        assert!(calendar_month(2024, 0).is_none());
        assert!(is_weekend(date("2024-03-02")));
    }
}
