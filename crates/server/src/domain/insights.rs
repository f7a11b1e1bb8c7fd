//! Monthly digest of site activity.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::db::models::{DailyReport, ProjectPhoto, Task, TaskStatus, Weather};

const MAX_COMPLETED_MILESTONES: usize = 5;
const MAX_UPCOMING_MILESTONES: usize = 3;
const MAX_PHOTOS: usize = 6;
const MAX_NOTABLE_OBSERVATIONS: usize = 3;
const MIN_OBSERVATION_CHARS: usize = 20;
const EXCERPT_CHARS: usize = 80;
/// Weekends and holidays: roughly eight non-workable days a month.
const NON_WORKABLE_DAYS: i64 = 8;
const NOTABLE_KEYWORDS: &[&str] = &["conclu", "finaliz", "inici", "complet", "entreg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub year: i32,
    pub month: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthWindow {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self {
            year,
            month,
            start,
            end: next.pred_opt()?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn days(&self) -> i64 {
        i64::from(self.end.day())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyInsight {
    pub month: u32,
    pub year: i32,
    pub work_days: usize,
    pub rainy_days: usize,
    pub avg_workforce: u32,
    pub completed_milestones: Vec<String>,
    pub upcoming_milestones: Vec<String>,
    pub photos: Vec<ProjectPhoto>,
    pub notable_observations: Vec<String>,
    pub productivity_score: u8,
}

pub fn build(
    window: &MonthWindow,
    reports: &[DailyReport],
    tasks: &[Task],
    photos: &[ProjectPhoto],
) -> MonthlyInsight {
    let mut seen = HashSet::new();
    let reports: Vec<&DailyReport> = reports
        .iter()
        .filter(|r| window.contains(r.report_date))
        .filter(|r| seen.insert(r.id.as_str()))
        .collect();

    let work_days = reports.len();
    let rainy_days = reports.iter().filter(|r| r.weather.is_wet()).count();
    let avg_workforce = if work_days == 0 {
        0
    } else {
        let total: u64 = reports.iter().map(|r| u64::from(r.workforce)).sum();
        (total as f64 / work_days as f64).round() as u32
    };

    let completed_milestones = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed && window.contains(t.end_date))
        .take(MAX_COMPLETED_MILESTONES)
        .map(|t| t.name.clone())
        .collect();

    let upcoming_milestones = tasks
        .iter()
        .filter(|t| t.status != TaskStatus::Completed && window.contains(t.start_date))
        .take(MAX_UPCOMING_MILESTONES)
        .map(|t| t.name.clone())
        .collect();

    MonthlyInsight {
        month: window.month,
        year: window.year,
        work_days,
        rainy_days,
        avg_workforce,
        completed_milestones,
        upcoming_milestones,
        photos: curate_photos(window, photos),
        notable_observations: notable_observations(&reports),
        productivity_score: productivity_score(work_days, window.days()),
    }
}

/// At most one photo per (day, location), in input order.
pub fn curate_photos(window: &MonthWindow, photos: &[ProjectPhoto]) -> Vec<ProjectPhoto> {
    let mut seen: HashSet<(NaiveDate, &str)> = HashSet::new();
    photos
        .iter()
        .filter(|p| window.contains(p.taken_on))
        .filter(|p| seen.insert((p.taken_on, p.location.as_deref().unwrap_or(""))))
        .take(MAX_PHOTOS)
        .cloned()
        .collect()
}

fn notable_observations(reports: &[&DailyReport]) -> Vec<String> {
    reports
        .iter()
        .filter(|r| r.observations.chars().count() >= MIN_OBSERVATION_CHARS)
        .filter(|r| {
            let text = r.observations.to_lowercase();
            r.weather == Weather::Storm || NOTABLE_KEYWORDS.iter().any(|k| text.contains(k))
        })
        .take(MAX_NOTABLE_OBSERVATIONS)
        .map(|r| excerpt(&r.observations))
        .collect()
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(EXCERPT_CHARS).collect();
    format!("{cut}...")
}

pub fn productivity_score(work_days: usize, days_in_month: i64) -> u8 {
    let workable = (days_in_month - NON_WORKABLE_DAYS).max(1) as f64;
    (work_days as f64 / workable * 100.0).round().min(100.0) as u8
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn report(id: &str, date: NaiveDate, weather: Weather, workforce: u32, obs: &str) -> DailyReport {
        DailyReport {
            id: id.into(),
            project_id: "p1".into(),
            report_date: date,
            weather,
            workforce,
            tasks_snapshot: vec![],
            observations: obs.into(),
            author_id: "u1".into(),
            created_at: Utc::now(),
        }
    }

    fn photo(id: &str, date: NaiveDate, location: Option<&str>) -> ProjectPhoto {
        ProjectPhoto {
            id: id.into(),
            project_id: "p1".into(),
            url: format!("http://localhost/uploads/photos/{id}.jpg"),
            storage_key: format!("photos/{id}.jpg"),
            caption: String::new(),
            location: location.map(String::from),
            category: "general".into(),
            taken_on: date,
            uploaded_by: "u1".into(),
            created_at: Utc::now(),
        }
    }

    fn task(name: &str, start: NaiveDate, end: NaiveDate, status: TaskStatus) -> Task {
        let now = Utc::now();
        Task {
            id: name.into(),
            project_id: "p1".into(),
            name: name.into(),
            start_date: start,
            end_date: end,
            progress: 0,
            status,
            unit_id: None,
            phase_id: None,
            dependencies: vec![],
            subtasks: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn window_covers_the_calendar_month() {
        let feb = MonthWindow::new(2024, 2).unwrap();
        assert_eq!(feb.end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(feb.days(), 29);
        let dec = MonthWindow::new(2023, 12).unwrap();
        assert_eq!(dec.end, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert!(MonthWindow::new(2024, 13).is_none());
    }

    #[test]
    fn counts_work_and_rainy_days_from_distinct_reports() {
        let window = MonthWindow::new(2024, 3).unwrap();
        let reports = vec![
            report("r1", day(1), Weather::Sunny, 10, ""),
            report("r2", day(2), Weather::Rainy, 20, ""),
            report("r3", day(3), Weather::Storm, 30, ""),
            report("r3", day(3), Weather::Storm, 30, ""),
            report("r4", NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(), Weather::Rainy, 99, ""),
        ];

        let insight = build(&window, &reports, &[], &[]);
        assert_eq!(insight.work_days, 3);
        assert_eq!(insight.rainy_days, 2);
        assert_eq!(insight.avg_workforce, 20);
    }

    #[test]
    fn empty_month_has_zero_averages() {
        let window = MonthWindow::new(2024, 3).unwrap();
        let insight = build(&window, &[], &[], &[]);
        assert_eq!(insight.avg_workforce, 0);
        assert_eq!(insight.productivity_score, 0);
        assert!(insight.photos.is_empty());
    }

    #[test]
    fn milestones_are_capped() {
        let window = MonthWindow::new(2024, 3).unwrap();
        let mut tasks: Vec<Task> = (0..7)
            .map(|i| task(&format!("done-{i}"), day(1), day(10), TaskStatus::Completed))
            .collect();
        tasks.extend((0..5).map(|i| task(&format!("next-{i}"), day(20), day(40 - 10), TaskStatus::NotStarted)));
        tasks.push(task(
            "outside",
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            TaskStatus::NotStarted,
        ));

        let insight = build(&window, &[], &tasks, &[]);
        assert_eq!(insight.completed_milestones.len(), 5);
        assert_eq!(insight.upcoming_milestones, vec!["next-0", "next-1", "next-2"]);
    }

    #[test]
    fn photos_are_unique_per_day_and_location_and_capped() {
        let window = MonthWindow::new(2024, 3).unwrap();
        let mut photos = vec![
            photo("a", day(1), Some("apt-101")),
            photo("b", day(1), Some("apt-101")),
            photo("c", day(1), Some("apt-102")),
            photo("d", day(1), None),
            photo("e", day(1), None),
        ];
        photos.extend((2..10).map(|d| photo(&format!("p{d}"), day(d), Some("apt-101"))));

        let curated = curate_photos(&window, &photos);
        assert_eq!(curated.len(), 6);
        let keys: HashSet<_> = curated
            .iter()
            .map(|p| (p.taken_on, p.location.clone()))
            .collect();
        assert_eq!(keys.len(), curated.len());
        assert_eq!(curated[0].id, "a");
        assert_eq!(curated[1].id, "c");
        assert_eq!(curated[2].id, "d");
    }

    #[test]
    fn picks_notable_observations() {
        let window = MonthWindow::new(2024, 3).unwrap();
        let long = "Concluída a concretagem da laje do quinto pavimento, com acompanhamento do engenheiro responsável e liberação para as formas";
        let reports = vec![
            report("r1", day(1), Weather::Sunny, 5, "curto"),
            report("r2", day(2), Weather::Sunny, 5, "Dia normal sem ocorrências relevantes"),
            report("r3", day(3), Weather::Storm, 5, "Vento forte derrubou parte do tapume"),
            report("r4", day(4), Weather::Sunny, 5, long),
        ];

        let insight = build(&window, &reports, &[], &[]);
        assert_eq!(insight.notable_observations.len(), 2);
        assert_eq!(insight.notable_observations[0], "Vento forte derrubou parte do tapume");
        assert!(insight.notable_observations[1].ends_with("..."));
        assert_eq!(insight.notable_observations[1].chars().count(), 83);
    }

    #[test]
    fn productivity_score_assumes_eight_idle_days() {
        assert_eq!(productivity_score(11, 30), 50);
        assert_eq!(productivity_score(22, 30), 100);
        assert_eq!(productivity_score(30, 31), 100);
    }
}
