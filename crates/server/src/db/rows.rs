//! Storage rows and their mapping to API models.
//!
//! Each entity has a `*Row` mirroring its table columns and a pair of
//! conversions: `TryFrom<Row>` for reads and `From<&Model>` for writes. JSON
//! columns, dates and enum columns are only ever decoded here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Serialize};

use super::models::*;
use crate::error::{AppError, Result};

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AppError::Internal(format!("Invalid stored timestamp '{value}': {e}")))
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| AppError::Internal(format!("Invalid stored date '{value}': {e}")))
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_json<T: DeserializeOwned>(value: &str) -> Result<T> {
    Ok(serde_json::from_str(value)?)
}

fn to_json<T: Serialize>(value: &T) -> String {
    // Plain data structs with string keys cannot fail to serialize.
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

fn parse_enum<T: std::str::FromStr<Err = String>>(value: &str) -> Result<T> {
    value.parse().map_err(AppError::Internal)
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ProfileRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            avatar_url: row.avatar_url,
            phone: row.phone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct OrganizationRow {
    pub id: String,
    pub name: String,
    pub logo_url: Option<String>,
    pub owner_id: String,
    pub created_at: String,
}

impl TryFrom<OrganizationRow> for Organization {
    type Error = AppError;

    fn try_from(row: OrganizationRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            name: row.name,
            logo_url: row.logo_url,
            owner_id: row.owner_id,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct OrganizationMemberRow {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub joined_at: String,
}

impl TryFrom<OrganizationMemberRow> for OrganizationMember {
    type Error = AppError;

    fn try_from(row: OrganizationMemberRow) -> Result<Self> {
        Ok(Self {
            user_id: row.user_id,
            name: row.name,
            email: row.email,
            role: row.role,
            joined_at: parse_timestamp(&row.joined_at)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct OrganizationInviteRow {
    pub id: String,
    pub organization_id: String,
    pub email: String,
    pub invited_by: String,
    pub status: String,
    pub created_at: String,
}

impl TryFrom<OrganizationInviteRow> for OrganizationInvite {
    type Error = AppError;

    fn try_from(row: OrganizationInviteRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            organization_id: row.organization_id,
            email: row.email,
            invited_by: row.invited_by,
            status: parse_enum(&row.status)?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub address: String,
    pub progress: f64,
    pub status: String,
    pub theme: String,
    pub structure: String,
    pub phases: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub owner_id: String,
    pub organization_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<ProjectRow> for Project {
    type Error = AppError;

    fn try_from(row: ProjectRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            name: row.name,
            address: row.address,
            progress: row.progress,
            status: parse_enum(&row.status)?,
            theme: row.theme,
            structure: parse_json(&row.structure)?,
            phases: parse_json(&row.phases)?,
            start_date: row.start_date.as_deref().map(parse_date).transpose()?,
            end_date: row.end_date.as_deref().map(parse_date).transpose()?,
            owner_id: row.owner_id,
            organization_id: row.organization_id,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

impl From<&Project> for ProjectRow {
    fn from(p: &Project) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            address: p.address.clone(),
            progress: p.progress,
            status: p.status.as_str().to_string(),
            theme: p.theme.clone(),
            structure: to_json(&p.structure),
            phases: to_json(&p.phases),
            start_date: p.start_date.map(format_date),
            end_date: p.end_date.map(format_date),
            owner_id: p.owner_id.clone(),
            organization_id: p.organization_id.clone(),
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TaskRow {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub start_date: String,
    pub end_date: String,
    pub progress: i64,
    pub status: String,
    pub unit_id: Option<String>,
    pub phase_id: Option<String>,
    pub dependencies: String,
    pub subtasks: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = AppError;

    fn try_from(row: TaskRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            start_date: parse_date(&row.start_date)?,
            end_date: parse_date(&row.end_date)?,
            progress: row.progress.clamp(0, 100) as u8,
            status: parse_enum(&row.status)?,
            unit_id: row.unit_id,
            phase_id: row.phase_id,
            dependencies: parse_json(&row.dependencies)?,
            subtasks: parse_json(&row.subtasks)?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

impl From<&Task> for TaskRow {
    fn from(t: &Task) -> Self {
        Self {
            id: t.id.clone(),
            project_id: t.project_id.clone(),
            name: t.name.clone(),
            start_date: format_date(t.start_date),
            end_date: format_date(t.end_date),
            progress: i64::from(t.progress),
            status: t.status.as_str().to_string(),
            unit_id: t.unit_id.clone(),
            phase_id: t.phase_id.clone(),
            dependencies: to_json(&t.dependencies),
            subtasks: to_json(&t.subtasks),
            created_at: t.created_at.to_rfc3339(),
            updated_at: t.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UnitProgressRow {
    pub id: String,
    pub project_id: String,
    pub unit_id: String,
    pub phase_id: String,
    pub percentage: f64,
    pub subtasks: String,
    pub updated_at: String,
}

impl TryFrom<UnitProgressRow> for UnitProgress {
    type Error = AppError;

    fn try_from(row: UnitProgressRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            project_id: row.project_id,
            unit_id: row.unit_id,
            phase_id: row.phase_id,
            percentage: row.percentage,
            subtasks: parse_json(&row.subtasks)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

impl From<&UnitProgress> for UnitProgressRow {
    fn from(p: &UnitProgress) -> Self {
        Self {
            id: p.id.clone(),
            project_id: p.project_id.clone(),
            unit_id: p.unit_id.clone(),
            phase_id: p.phase_id.clone(),
            percentage: p.percentage,
            subtasks: to_json(&p.subtasks),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UnitPermissionRow {
    pub id: String,
    pub project_id: String,
    pub unit_id: String,
    pub user_id: Option<String>,
    pub email: String,
    pub role: String,
    pub visible_areas: String,
    pub active: bool,
    pub created_at: String,
}

impl TryFrom<UnitPermissionRow> for UnitPermission {
    type Error = AppError;

    fn try_from(row: UnitPermissionRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            project_id: row.project_id,
            unit_id: row.unit_id,
            user_id: row.user_id,
            email: row.email,
            role: parse_enum(&row.role)?,
            visible_areas: parse_json(&row.visible_areas)?,
            active: row.active,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

impl From<&UnitPermission> for UnitPermissionRow {
    fn from(p: &UnitPermission) -> Self {
        Self {
            id: p.id.clone(),
            project_id: p.project_id.clone(),
            unit_id: p.unit_id.clone(),
            user_id: p.user_id.clone(),
            email: p.email.clone(),
            role: p.role.as_str().to_string(),
            visible_areas: to_json(&p.visible_areas),
            active: p.active,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

/// Log rows are read joined with the author's name.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct LogEntryRow {
    pub id: String,
    pub project_id: String,
    pub author_id: String,
    pub author_name: String,
    pub category: String,
    pub content: String,
    pub created_at: String,
}

impl TryFrom<LogEntryRow> for LogEntry {
    type Error = AppError;

    fn try_from(row: LogEntryRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            project_id: row.project_id,
            author_id: row.author_id,
            author_name: row.author_name,
            category: row.category,
            content: row.content,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct NoteRow {
    pub id: String,
    pub project_id: String,
    pub author_id: String,
    pub author_name: String,
    pub context: String,
    pub content: String,
    pub color: String,
    pub pinned: bool,
    pub created_at: String,
}

impl TryFrom<NoteRow> for Note {
    type Error = AppError;

    fn try_from(row: NoteRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            project_id: row.project_id,
            author_id: row.author_id,
            author_name: row.author_name,
            context: row.context,
            content: row.content,
            color: row.color,
            pinned: row.pinned,
            created_at: parse_timestamp(&row.created_at)?,
            replies: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct NoteReplyRow {
    pub id: String,
    pub note_id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub created_at: String,
}

impl TryFrom<NoteReplyRow> for NoteReply {
    type Error = AppError;

    fn try_from(row: NoteReplyRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            note_id: row.note_id,
            author_id: row.author_id,
            author_name: row.author_name,
            content: row.content,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DailyReportRow {
    pub id: String,
    pub project_id: String,
    pub report_date: String,
    pub weather: String,
    pub workforce: i64,
    pub tasks_snapshot: String,
    pub observations: String,
    pub author_id: String,
    pub created_at: String,
}

impl TryFrom<DailyReportRow> for DailyReport {
    type Error = AppError;

    fn try_from(row: DailyReportRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            project_id: row.project_id,
            report_date: parse_date(&row.report_date)?,
            weather: parse_enum(&row.weather)?,
            workforce: row.workforce.max(0) as u32,
            tasks_snapshot: parse_json(&row.tasks_snapshot)?,
            observations: row.observations,
            author_id: row.author_id,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

impl From<&DailyReport> for DailyReportRow {
    fn from(r: &DailyReport) -> Self {
        Self {
            id: r.id.clone(),
            project_id: r.project_id.clone(),
            report_date: format_date(r.report_date),
            weather: r.weather.as_str().to_string(),
            workforce: i64::from(r.workforce),
            tasks_snapshot: to_json(&r.tasks_snapshot),
            observations: r.observations.clone(),
            author_id: r.author_id.clone(),
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ProjectDocumentRow {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub category: String,
    pub url: String,
    pub storage_key: String,
    pub uploaded_by: String,
    pub created_at: String,
}

impl TryFrom<ProjectDocumentRow> for ProjectDocument {
    type Error = AppError;

    fn try_from(row: ProjectDocumentRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            category: row.category,
            url: row.url,
            storage_key: row.storage_key,
            uploaded_by: row.uploaded_by,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ProjectPhotoRow {
    pub id: String,
    pub project_id: String,
    pub url: String,
    pub storage_key: String,
    pub caption: String,
    pub location: Option<String>,
    pub category: String,
    pub taken_on: String,
    pub uploaded_by: String,
    pub created_at: String,
}

impl TryFrom<ProjectPhotoRow> for ProjectPhoto {
    type Error = AppError;

    fn try_from(row: ProjectPhotoRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            project_id: row.project_id,
            url: row.url,
            storage_key: row.storage_key,
            caption: row.caption,
            location: row.location,
            category: row.category,
            taken_on: parse_date(&row.taken_on)?,
            uploaded_by: row.uploaded_by,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

impl From<&ProjectPhoto> for ProjectPhotoRow {
    fn from(p: &ProjectPhoto) -> Self {
        Self {
            id: p.id.clone(),
            project_id: p.project_id.clone(),
            url: p.url.clone(),
            storage_key: p.storage_key.clone(),
            caption: p.caption.clone(),
            location: p.location.clone(),
            category: p.category.clone(),
            taken_on: format_date(p.taken_on),
            uploaded_by: p.uploaded_by.clone(),
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct SupplyOrderRow {
    pub id: String,
    pub project_id: String,
    pub item: String,
    pub quantity: f64,
    pub unit: String,
    pub status: String,
    pub notes: String,
    pub requested_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<SupplyOrderRow> for SupplyOrder {
    type Error = AppError;

    fn try_from(row: SupplyOrderRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            project_id: row.project_id,
            item: row.item,
            quantity: row.quantity,
            unit: row.unit,
            status: parse_enum(&row.status)?,
            notes: row.notes,
            requested_by: row.requested_by,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

impl From<&SupplyOrder> for SupplyOrderRow {
    fn from(o: &SupplyOrder) -> Self {
        Self {
            id: o.id.clone(),
            project_id: o.project_id.clone(),
            item: o.item.clone(),
            quantity: o.quantity,
            unit: o.unit.clone(),
            status: o.status.as_str().to_string(),
            notes: o.notes.clone(),
            requested_by: o.requested_by.clone(),
            created_at: o.created_at.to_rfc3339(),
            updated_at: o.updated_at.to_rfc3339(),
        }
    }
}

/// Decodes a batch of rows, failing on the first malformed one.
pub fn map_rows<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}
