//! Staff/guest classification for a user on a project.

use serde::Serialize;

use crate::{
    db::models::{PermissionRole, UnitPermission},
    error::{AppError, Result},
};

/// Facts about a user that decide their access level on one project.
#[derive(Debug, Clone, Default)]
pub struct AccessSignals {
    pub is_owner: bool,
    pub is_org_member: bool,
    /// Roles from the user's own active permission rows.
    pub roles: Vec<PermissionRole>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Staff,
    Guest,
    None,
}

pub fn classify(signals: &AccessSignals) -> AccessLevel {
    let is_staff = signals.is_owner
        || signals.is_org_member
        || signals.roles.contains(&PermissionRole::Admin);

    if is_staff {
        AccessLevel::Staff
    } else if signals.roles.iter().any(PermissionRole::is_guest_role) {
        AccessLevel::Guest
    } else {
        AccessLevel::None
    }
}

/// Active rows that belong to the user, matched by id or by email.
pub fn own_permissions<'a>(
    rows: &'a [UnitPermission],
    user_id: &str,
    email: &str,
) -> Vec<&'a UnitPermission> {
    rows.iter()
        .filter(|p| p.active)
        .filter(|p| {
            p.user_id.as_deref() == Some(user_id) || p.email.eq_ignore_ascii_case(email)
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAccess {
    pub project_id: String,
    pub level: AccessLevel,
    pub is_owner: bool,
    pub is_org_member: bool,
    pub role: Option<PermissionRole>,
    pub unit_ids: Vec<String>,
    pub visible_areas: Vec<String>,
}

impl ProjectAccess {
    pub fn resolve(
        project_id: &str,
        is_owner: bool,
        is_org_member: bool,
        permissions: &[&UnitPermission],
    ) -> Self {
        let signals = AccessSignals {
            is_owner,
            is_org_member,
            roles: permissions.iter().map(|p| p.role).collect(),
        };
        let level = classify(&signals);

        // Admin outranks the guest roles when a user holds several rows.
        let role = signals
            .roles
            .iter()
            .copied()
            .find(|r| *r == PermissionRole::Admin)
            .or_else(|| signals.roles.first().copied());

        let mut unit_ids: Vec<String> = permissions.iter().map(|p| p.unit_id.clone()).collect();
        unit_ids.sort();
        unit_ids.dedup();

        let mut visible_areas: Vec<String> = permissions
            .iter()
            .flat_map(|p| p.visible_areas.iter().cloned())
            .collect();
        visible_areas.sort();
        visible_areas.dedup();

        Self {
            project_id: project_id.to_string(),
            level,
            is_owner,
            is_org_member,
            role,
            unit_ids,
            visible_areas,
        }
    }

    pub fn is_staff(&self) -> bool {
        self.level == AccessLevel::Staff
    }

    pub fn is_guest(&self) -> bool {
        self.level == AccessLevel::Guest
    }

    pub fn require_staff(&self) -> Result<()> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only the project team can change this project".to_string(),
            ))
        }
    }

    /// Whether a record tagged with a unit id or area category is visible.
    /// Untagged and `general` records are visible to everyone on the project.
    pub fn can_see_tag(&self, tag: Option<&str>) -> bool {
        if self.is_staff() {
            return true;
        }
        match tag {
            None | Some("") | Some("general") => true,
            Some(tag) => {
                self.unit_ids.iter().any(|u| u == tag) || self.visible_areas.iter().any(|a| a == tag)
            }
        }
    }
}
