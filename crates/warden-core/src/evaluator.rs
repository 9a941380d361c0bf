//! Permission evaluation.
//!
//! [`evaluate`] answers "may this profile perform this action, optionally
//! on this target?" over an already-loaded set of role assignments.
//! [`PermissionEvaluator`] loads the assignments from a
//! [`RoleAssignmentRepository`] and applies it.
//!
//! Matching rules, applied to every permission of every assigned role in
//! store order, stopping at the first grant:
//!
//! - a request for [`PUBLIC_PERMISSION`] never matches an explicit entry;
//! - a permission matches by name when either its `name` or its `action`
//!   equals the requested name;
//! - the target matches when the request has no target, the permission has
//!   no target (wildcard), or both targets are equal;
//! - a name match with a mismatched target still grants when the caller's
//!   profile scope is [`GLOBAL_SCOPE_TOKEN`].
//!
//! There is no deny entry and no precedence between specific and wildcard
//! permissions. Anything that does not match is a deny.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::WardenResult;
use crate::models::permission::Permission;
use crate::models::role_assignment::RoleAssignment;
use crate::repository::RoleAssignmentRepository;

/// Requested permission name that is skipped by every entry.
pub const PUBLIC_PERMISSION: &str = "public";

/// Profile scope that overrides target mismatches.
pub const GLOBAL_SCOPE_TOKEN: &str = "global";

/// A single "may P do A (on T) within S?" question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionCheck {
    pub profile_id: String,
    pub permission_name: String,
    pub app_scope_id: Uuid,
    /// Caller-supplied scope token; see [`GLOBAL_SCOPE_TOKEN`].
    #[serde(default)]
    pub profile_app_scope: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
}

impl PermissionCheck {
    pub fn new(
        profile_id: impl Into<String>,
        permission_name: impl Into<String>,
        app_scope_id: Uuid,
    ) -> Self {
        Self {
            profile_id: profile_id.into(),
            permission_name: permission_name.into(),
            app_scope_id,
            profile_app_scope: None,
            target_id: None,
        }
    }

    pub fn on_target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn with_profile_scope(mut self, profile_app_scope: impl Into<String>) -> Self {
        self.profile_app_scope = Some(profile_app_scope.into());
        self
    }

    fn name_matches(&self, permission: &Permission) -> bool {
        permission.name == self.permission_name || permission.action == self.permission_name
    }

    fn target_matches(&self, permission: &Permission) -> bool {
        match (&self.target_id, &permission.target_id) {
            (None, _) | (_, None) => true,
            (Some(requested), Some(held)) => requested == held,
        }
    }

    fn is_global(&self) -> bool {
        self.profile_app_scope.as_deref() == Some(GLOBAL_SCOPE_TOKEN)
    }
}

/// Return the first permission that grants `check`, if any.
pub fn find_grant<'a>(
    assignments: &'a [RoleAssignment],
    check: &PermissionCheck,
) -> Option<&'a Permission> {
    if check.permission_name == PUBLIC_PERMISSION {
        return None;
    }

    assignments
        .iter()
        .filter_map(|assignment| assignment.role.as_ref())
        .flat_map(|role| role.permissions.iter())
        .filter(|permission| check.name_matches(permission))
        .find(|permission| check.target_matches(permission) || check.is_global())
}

pub fn evaluate(assignments: &[RoleAssignment], check: &PermissionCheck) -> bool {
    find_grant(assignments, check).is_some()
}

/// Evaluates permission checks against stored role assignments.
///
/// Generic over the assignment repository so that evaluation has no
/// dependency on the database crate.
#[derive(Clone)]
pub struct PermissionEvaluator<A: RoleAssignmentRepository> {
    assignments: A,
}

impl<A: RoleAssignmentRepository> PermissionEvaluator<A> {
    pub fn new(assignments: A) -> Self {
        Self { assignments }
    }

    /// Returns `Ok(false)` when nothing matches; only store failures are
    /// errors.
    pub async fn check_permission(&self, check: &PermissionCheck) -> WardenResult<bool> {
        let assignments = self
            .assignments
            .get_user_roles(&check.profile_id, Some(check.app_scope_id))
            .await?;

        if assignments.is_empty() {
            debug!(
                profile_id = %check.profile_id,
                app_scope_id = %check.app_scope_id,
                "No role assignments; denying"
            );
            return Ok(false);
        }

        match find_grant(&assignments, check) {
            Some(permission) => {
                debug!(
                    profile_id = %check.profile_id,
                    permission = %check.permission_name,
                    granted_by = %permission.id,
                    "Permission granted"
                );
                Ok(true)
            }
            None => {
                debug!(
                    profile_id = %check.profile_id,
                    permission = %check.permission_name,
                    target_id = ?check.target_id,
                    "Permission denied"
                );
                Ok(false)
            }
        }
    }
}
