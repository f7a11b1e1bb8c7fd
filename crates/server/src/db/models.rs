use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Declares a closed set of values stored as text columns.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("unknown {} '{}'", stringify!($name), other)),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(ProjectStatus {
    Active => "active",
    Paused => "paused",
    Finished => "finished",
});

string_enum!(UnitKind {
    Apartment => "apartment",
    CommonArea => "common_area",
    Garage => "garage",
});

string_enum!(TaskStatus {
    NotStarted => "NOT_STARTED",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
    Delayed => "DELAYED",
});

string_enum!(PermissionRole {
    Client => "client",
    Architect => "architect",
    Admin => "admin",
});

string_enum!(Weather {
    Sunny => "sunny",
    Cloudy => "cloudy",
    Rainy => "rainy",
    Storm => "storm",
});

string_enum!(SupplyStatus {
    Requested => "requested",
    Ordered => "ordered",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

string_enum!(InviteStatus {
    Pending => "pending",
    Accepted => "accepted",
    Cancelled => "cancelled",
});

impl TaskStatus {
    /// Status implied by a progress value: 0 is not started, 100 is completed.
    pub fn from_progress(progress: u8) -> Self {
        match progress {
            0 => TaskStatus::NotStarted,
            p if p >= 100 => TaskStatus::Completed,
            _ => TaskStatus::InProgress,
        }
    }
}

impl PermissionRole {
    pub fn is_guest_role(&self) -> bool {
        matches!(self, PermissionRole::Client | PermissionRole::Architect)
    }
}

impl Weather {
    pub fn is_wet(&self) -> bool {
        matches!(self, Weather::Rainy | Weather::Storm)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub logo_url: Option<String>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationMember {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationInvite {
    pub id: String,
    pub organization_id: String,
    pub email: String,
    pub invited_by: String,
    pub status: InviteStatus,
    pub created_at: DateTime<Utc>,
}

/// An addressable location: an apartment, a common area or a garage slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: String,
    pub label: String,
    pub kind: UnitKind,
    /// Common-area category, matched against a guest's visible areas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Floor {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub units: Vec<Unit>,
    /// Phases that apply to this floor. `None` means every phase applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_ids: Option<Vec<String>>,
}

impl Floor {
    pub fn applies_to(&self, phase_id: &str) -> bool {
        match &self.phase_ids {
            Some(ids) => ids.iter().any(|id| id == phase_id),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStructure {
    #[serde(default)]
    pub floors: Vec<Floor>,
}

impl ProjectStructure {
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.floors.iter().flat_map(|f| f.units.iter())
    }

    pub fn find_unit(&self, unit_id: &str) -> Option<&Unit> {
        self.units().find(|u| u.id == unit_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub subtasks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub address: String,
    pub progress: f64,
    pub status: ProjectStatus,
    pub theme: String,
    pub structure: ProjectStructure,
    pub phases: Vec<Phase>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub owner_id: String,
    pub organization_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub progress: u8,
    pub status: TaskStatus,
    pub unit_id: Option<String>,
    pub phase_id: Option<String>,
    pub dependencies: Vec<String>,
    pub subtasks: Vec<Subtask>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Writes progress and the status it implies.
    pub fn set_progress(&mut self, progress: u8) {
        self.progress = progress.min(100);
        self.status = TaskStatus::from_progress(self.progress);
    }

    /// Applies an explicit status. Only `Delayed`, or the status the current
    /// progress already implies, is accepted.
    pub fn set_status(&mut self, status: TaskStatus) -> bool {
        if status != TaskStatus::Delayed && status != TaskStatus::from_progress(self.progress) {
            return false;
        }
        self.status = status;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitProgress {
    pub id: String,
    pub project_id: String,
    pub unit_id: String,
    pub phase_id: String,
    pub percentage: f64,
    pub subtasks: Vec<Subtask>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitPermission {
    pub id: String,
    pub project_id: String,
    pub unit_id: String,
    pub user_id: Option<String>,
    pub email: String,
    pub role: PermissionRole,
    pub visible_areas: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub project_id: String,
    pub author_id: String,
    pub author_name: String,
    pub category: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub project_id: String,
    pub author_id: String,
    pub author_name: String,
    pub context: String,
    pub content: String,
    pub color: String,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub replies: Vec<NoteReply>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteReply {
    pub id: String,
    pub note_id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub task_id: String,
    pub name: String,
    pub progress: u8,
}

/// RDO: the daily construction report for one project-day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub id: String,
    pub project_id: String,
    pub report_date: NaiveDate,
    pub weather: Weather,
    pub workforce: u32,
    pub tasks_snapshot: Vec<TaskSnapshot>,
    pub observations: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub category: String,
    pub url: String,
    #[serde(skip)]
    pub storage_key: String,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPhoto {
    pub id: String,
    pub project_id: String,
    pub url: String,
    #[serde(skip)]
    pub storage_key: String,
    pub caption: String,
    pub location: Option<String>,
    pub category: String,
    pub taken_on: NaiveDate,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyOrder {
    pub id: String,
    pub project_id: String,
    pub item: String,
    pub quantity: f64,
    pub unit: String,
    pub status: SupplyStatus,
    pub notes: String,
    pub requested_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
