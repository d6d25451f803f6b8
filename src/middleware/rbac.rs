// src/middleware/rbac.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Actions guarded by the analytics layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsAction {
    ViewDashboard,
    ViewAnalytics,
    ExportReports,
    ManageMetrics,
}

impl AnalyticsAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsAction::ViewDashboard => "view_dashboard",
            AnalyticsAction::ViewAnalytics => "view_analytics",
            AnalyticsAction::ExportReports => "export_reports",
            AnalyticsAction::ManageMetrics => "manage_metrics",
        }
    }

    /// Lowest role level allowed to perform the action.
    pub fn required_level(&self) -> u8 {
        match self {
            AnalyticsAction::ViewDashboard => Role::Viewer.level(),
            AnalyticsAction::ViewAnalytics => Role::Analyst.level(),
            AnalyticsAction::ExportReports => Role::Manager.level(),
            AnalyticsAction::ManageMetrics => Role::Admin.level(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Analyst,
    Manager,
    Executive,
    Admin,
}

impl Role {
    pub fn level(&self) -> u8 {
        match self {
            Role::Viewer => 1,
            Role::Analyst => 2,
            Role::Manager => 3,
            Role::Executive => 4,
            Role::Admin => 5,
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "viewer" => Some(Role::Viewer),
            "analyst" => Some(Role::Analyst),
            "manager" => Some(Role::Manager),
            "executive" => Some(Role::Executive),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Decides whether a subject may perform an analytics action.
pub trait PermissionChecker: Send + Sync {
    fn has_permission(&self, subject: &str, action: AnalyticsAction) -> bool;
}

/// Maps subjects to role strings and compares role levels
#[derive(Debug, Default)]
pub struct RoleBasedPermissionChecker {
    roles: RwLock<HashMap<String, String>>,
}

impl RoleBasedPermissionChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(self, subject: impl Into<String>, role: impl Into<String>) -> Self {
        self.assign_role(subject, role);
        self
    }

    pub fn assign_role(&self, subject: impl Into<String>, role: impl Into<String>) {
        if let Ok(mut roles) = self.roles.write() {
            roles.insert(subject.into(), role.into());
        }
    }

    pub fn revoke(&self, subject: &str) {
        if let Ok(mut roles) = self.roles.write() {
            roles.remove(subject);
        }
    }

    pub fn role_of(&self, subject: &str) -> Option<Role> {
        let roles = self.roles.read().ok()?;
        roles.get(subject).and_then(|r| Role::from_string(r))
    }
}

impl PermissionChecker for RoleBasedPermissionChecker {
    fn has_permission(&self, subject: &str, action: AnalyticsAction) -> bool {
        // Unknown subjects and unrecognized role strings get nothing
        self.role_of(subject)
            .map(|role| role.level() >= action.required_level())
            .unwrap_or(false)
    }
}
