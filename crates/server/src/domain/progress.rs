//! Building-wide progress rollup from per-unit, per-phase percentages.
//!
//! The overall building percentage is the plain mean of every
//! `unit_progress` row, regardless of how many units each phase covers.
//! Phases with fewer applicable units therefore weigh more per unit. This
//! matches what the dashboards have always shown and is kept as-is until the
//! weighting is agreed on.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::models::{Phase, ProjectStructure, UnitProgress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum FloorState {
    Complete,
    Active { average: u8 },
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorPhaseProgress {
    pub floor_id: String,
    pub label: String,
    #[serde(flatten)]
    pub state: FloorState,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseProgress {
    pub phase_id: String,
    pub name: String,
    pub color: String,
    pub average: u8,
    pub floors: Vec<FloorPhaseProgress>,
    pub completed_floors: usize,
    pub applicable_floors: usize,
    pub last_completed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingProgress {
    pub overall: u8,
    pub phases: Vec<PhaseProgress>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitPhaseProgress {
    pub unit_id: String,
    pub phase_id: String,
    pub percentage: f64,
}

fn round_percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

type ProgressIndex<'a> = HashMap<(&'a str, &'a str), &'a UnitProgress>;

fn index_rows(rows: &[UnitProgress]) -> ProgressIndex<'_> {
    rows.iter()
        .map(|r| ((r.unit_id.as_str(), r.phase_id.as_str()), r))
        .collect()
}

pub fn aggregate(
    structure: &ProjectStructure,
    phases: &[Phase],
    rows: &[UnitProgress],
) -> BuildingProgress {
    let index = index_rows(rows);

    let mut by_phase: HashMap<&str, Vec<f64>> = HashMap::new();
    for row in rows {
        by_phase
            .entry(row.phase_id.as_str())
            .or_default()
            .push(row.percentage);
    }

    let phases = phases
        .iter()
        .map(|phase| {
            let average = by_phase
                .get(phase.id.as_str())
                .and_then(|values| mean(values.iter().copied()))
                .map(round_percent)
                .unwrap_or(0);
            phase_progress(structure, phase, average, &index)
        })
        .collect();

    let overall = mean(rows.iter().map(|r| r.percentage))
        .map(round_percent)
        .unwrap_or(0);

    BuildingProgress { overall, phases }
}

fn phase_progress(
    structure: &ProjectStructure,
    phase: &Phase,
    average: u8,
    index: &ProgressIndex<'_>,
) -> PhaseProgress {
    let mut floors = Vec::new();
    let mut last_completed: Option<(DateTime<Utc>, String)> = None;

    for floor in &structure.floors {
        if floor.units.is_empty() || !floor.applies_to(&phase.id) {
            continue;
        }

        let unit_rows: Vec<Option<&UnitProgress>> = floor
            .units
            .iter()
            .map(|u| index.get(&(u.id.as_str(), phase.id.as_str())).copied())
            .collect();
        let percentages: Vec<f64> = unit_rows
            .iter()
            .map(|r| r.map(|r| r.percentage).unwrap_or(0.0))
            .collect();

        let state = if percentages.iter().all(|p| *p >= 100.0) {
            FloorState::Complete
        } else if percentages.iter().all(|p| *p <= 0.0) {
            FloorState::Pending
        } else {
            FloorState::Active {
                average: mean(percentages.iter().copied())
                    .map(round_percent)
                    .unwrap_or(0),
            }
        };

        let completed_at = match state {
            FloorState::Complete => unit_rows.iter().flatten().map(|r| r.updated_at).max(),
            _ => None,
        };

        if let Some(at) = completed_at {
            let newer = match &last_completed {
                Some((best, _)) => at >= *best,
                None => true,
            };
            if newer {
                last_completed = Some((at, floor.label.clone()));
            }
        }

        floors.push(FloorPhaseProgress {
            floor_id: floor.id.clone(),
            label: floor.label.clone(),
            state,
            completed_at,
        });
    }

    let completed_floors = floors
        .iter()
        .filter(|f| f.state == FloorState::Complete)
        .count();

    PhaseProgress {
        phase_id: phase.id.clone(),
        name: phase.name.clone(),
        color: phase.color.clone(),
        average,
        applicable_floors: floors.len(),
        completed_floors,
        floors,
        last_completed: last_completed.map(|(_, label)| label),
    }
}

/// Per-phase percentages for a set of units, in configured phase order.
/// Units without a row for a phase report 0.
pub fn unit_breakdown(
    unit_ids: &[String],
    phases: &[Phase],
    rows: &[UnitProgress],
) -> Vec<UnitPhaseProgress> {
    let index = index_rows(rows);
    unit_ids
        .iter()
        .flat_map(|unit_id| {
            let index = &index;
            phases.iter().map(move |phase| UnitPhaseProgress {
                unit_id: unit_id.clone(),
                phase_id: phase.id.clone(),
                percentage: index
                    .get(&(unit_id.as_str(), phase.id.as_str()))
                    .map(|r| r.percentage)
                    .unwrap_or(0.0),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::db::models::{Floor, Unit, UnitKind};

    fn unit(id: &str) -> Unit {
        Unit {
            id: id.into(),
            label: id.into(),
            kind: UnitKind::Apartment,
            category: None,
        }
    }

    fn floor(id: &str, units: &[&str], phase_ids: Option<Vec<&str>>) -> Floor {
        Floor {
            id: id.into(),
            label: format!("Andar {id}"),
            units: units.iter().map(|u| unit(u)).collect(),
            phase_ids: phase_ids.map(|ids| ids.into_iter().map(String::from).collect()),
        }
    }

    fn phase(id: &str) -> Phase {
        Phase {
            id: id.into(),
            name: id.into(),
            color: String::new(),
            icon: String::new(),
            subtasks: vec![],
        }
    }

    fn row(unit: &str, phase: &str, pct: f64, minute: u32) -> UnitProgress {
        UnitProgress {
            id: format!("{unit}-{phase}"),
            project_id: "p1".into(),
            unit_id: unit.into(),
            phase_id: phase.into(),
            percentage: pct,
            subtasks: vec![],
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap(),
        }
    }

    #[test]
    fn single_floor_with_partial_unit_is_active() {
        let structure = ProjectStructure {
            floors: vec![floor("1", &["A", "B"], None)],
        };
        let rows = vec![row("A", "structure", 100.0, 0), row("B", "structure", 40.0, 0)];

        let result = aggregate(&structure, &[phase("structure")], &rows);
        let structure_phase = &result.phases[0];
        assert_eq!(structure_phase.average, 70);
        assert_eq!(
            structure_phase.floors[0].state,
            FloorState::Active { average: 70 }
        );
        assert_eq!(structure_phase.completed_floors, 0);
        assert_eq!(result.overall, 70);
    }

    #[test]
    fn complete_and_pending_floors() {
        let structure = ProjectStructure {
            floors: vec![floor("1", &["A", "B"], None), floor("2", &["C", "D"], None)],
        };
        let rows = vec![
            row("A", "structure", 100.0, 0),
            row("B", "structure", 100.0, 5),
            row("C", "structure", 0.0, 0),
        ];

        let result = aggregate(&structure, &[phase("structure")], &rows);
        let p = &result.phases[0];
        assert_eq!(p.floors[0].state, FloorState::Complete);
        assert_eq!(
            p.floors[0].completed_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 5, 0).unwrap())
        );
        // D has no row and counts as 0.
        assert_eq!(p.floors[1].state, FloorState::Pending);
        assert_eq!(p.completed_floors, 1);
        assert_eq!(p.applicable_floors, 2);
        assert_eq!(p.last_completed.as_deref(), Some("Andar 1"));
    }

    #[test]
    fn empty_floors_and_non_applicable_floors_are_excluded() {
        let structure = ProjectStructure {
            floors: vec![
                floor("roof", &[], None),
                floor("1", &["A"], Some(vec!["finishing"])),
                floor("2", &["B"], Some(vec!["structure", "finishing"])),
            ],
        };
        let rows = vec![row("B", "structure", 100.0, 0)];

        let result = aggregate(&structure, &[phase("structure")], &rows);
        let p = &result.phases[0];
        assert_eq!(p.applicable_floors, 1);
        assert_eq!(p.floors[0].floor_id, "2");
        assert_eq!(p.completed_floors, 1);
    }

    #[test]
    fn last_completed_prefers_later_floor_on_timestamp_tie() {
        let structure = ProjectStructure {
            floors: vec![
                floor("1", &["A"], None),
                floor("2", &["B"], None),
                floor("3", &["C"], None),
            ],
        };
        let rows = vec![
            row("A", "structure", 100.0, 30),
            row("B", "structure", 100.0, 30),
            row("C", "structure", 100.0, 10),
        ];

        let result = aggregate(&structure, &[phase("structure")], &rows);
        assert_eq!(result.phases[0].last_completed.as_deref(), Some("Andar 2"));
    }

    #[test]
    fn overall_is_unweighted_mean_of_rows() {
        // Structure covers 4 units, finishing only 1: the mean is over rows,
        // not units, so finishing counts as much as each structure row.
        let structure = ProjectStructure {
            floors: vec![floor("1", &["A", "B", "C", "D"], None)],
        };
        let rows = vec![
            row("A", "structure", 100.0, 0),
            row("B", "structure", 100.0, 0),
            row("C", "structure", 100.0, 0),
            row("D", "structure", 100.0, 0),
            row("A", "finishing", 0.0, 0),
        ];

        let result = aggregate(&structure, &[phase("structure"), phase("finishing")], &rows);
        assert_eq!(result.overall, 80);
        assert_eq!(result.phases[1].average, 0);
    }

    #[test]
    fn phases_without_rows_average_zero() {
        let result = aggregate(&ProjectStructure::default(), &[phase("electrical")], &[]);
        assert_eq!(result.overall, 0);
        assert_eq!(result.phases[0].average, 0);
        assert!(result.phases[0].floors.is_empty());
    }

    #[test]
    fn breakdown_fills_missing_rows_with_zero() {
        let rows = vec![row("A", "structure", 55.0, 0)];
        let breakdown = unit_breakdown(
            &["A".to_string()],
            &[phase("structure"), phase("masonry")],
            &rows,
        );
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].percentage, 55.0);
        assert_eq!(breakdown[1].percentage, 0.0);
    }
}
