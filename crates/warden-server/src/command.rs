//! Command names and their typed payloads.

use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;
use warden_core::PermissionCheck;
use warden_core::error::{WardenError, WardenResult};
use warden_core::filter::{AppScopeField, ListFilter, PermissionField, RoleField};
use warden_core::models::app_scope::{CreateAppScope, UpdateAppScope};
use warden_core::models::permission::{CreatePermission, UpdatePermission};
use warden_core::models::role::{CreateRole, UpdateRole};
use warden_core::models::role_assignment::AssignRole;

/// Every command name accepted by [`Command::parse`].
pub const COMMAND_NAMES: &[&str] = &[
    "AppScope.Create",
    "AppScope.Get",
    "AppScope.GetByName",
    "AppScope.GetAll",
    "AppScope.Update",
    "AppScope.Delete",
    "Permission.Create",
    "Permission.Get",
    "Permission.GetAll",
    "Permission.Update",
    "Permission.Delete",
    "Role.Create",
    "Role.Get",
    "Role.GetByName",
    "Role.GetAll",
    "Role.Update",
    "Role.Delete",
    "Role.AddPermission",
    "Role.RemovePermission",
    "Role.Assign",
    "Role.Unassign",
    "Role.GetUserRoles",
    "Role.CheckPermission",
];

/// An update payload: the target id alongside the changed fields.
#[derive(Debug, Clone, Deserialize)]
pub struct Patch<T> {
    pub id: Uuid,
    #[serde(flatten)]
    pub changes: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleByName {
    pub name: String,
    #[serde(default)]
    pub app_scope: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Grant {
    pub role_id: Uuid,
    pub permission_id: Uuid,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Unassign {
    pub assignment_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRoles {
    pub profile_id: String,
    #[serde(default)]
    pub app_scope_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", content = "payload")]
pub enum Command {
    #[serde(rename = "AppScope.Create")]
    CreateAppScope(CreateAppScope),
    #[serde(rename = "AppScope.Get")]
    GetAppScope(Uuid),
    #[serde(rename = "AppScope.GetByName")]
    GetAppScopeByName(String),
    #[serde(rename = "AppScope.GetAll")]
    ListAppScopes(ListFilter<AppScopeField>),
    #[serde(rename = "AppScope.Update")]
    UpdateAppScope(Patch<UpdateAppScope>),
    #[serde(rename = "AppScope.Delete")]
    DeleteAppScope(Uuid),

    #[serde(rename = "Permission.Create")]
    CreatePermission(CreatePermission),
    #[serde(rename = "Permission.Get")]
    GetPermission(Uuid),
    #[serde(rename = "Permission.GetAll")]
    ListPermissions(ListFilter<PermissionField>),
    #[serde(rename = "Permission.Update")]
    UpdatePermission(Patch<UpdatePermission>),
    #[serde(rename = "Permission.Delete")]
    DeletePermission(Uuid),

    #[serde(rename = "Role.Create")]
    CreateRole(CreateRole),
    #[serde(rename = "Role.Get")]
    GetRole(Uuid),
    #[serde(rename = "Role.GetByName")]
    GetRoleByName(RoleByName),
    #[serde(rename = "Role.GetAll")]
    ListRoles(ListFilter<RoleField>),
    #[serde(rename = "Role.Update")]
    UpdateRole(Patch<UpdateRole>),
    #[serde(rename = "Role.Delete")]
    DeleteRole(Uuid),
    #[serde(rename = "Role.AddPermission")]
    AddPermission(Grant),
    #[serde(rename = "Role.RemovePermission")]
    RemovePermission(Grant),
    #[serde(rename = "Role.Assign")]
    Assign(AssignRole),
    #[serde(rename = "Role.Unassign")]
    Unassign(Unassign),
    #[serde(rename = "Role.GetUserRoles")]
    GetUserRoles(UserRoles),
    #[serde(rename = "Role.CheckPermission")]
    CheckPermission(PermissionCheck),
}

impl Command {
    /// Decode a command from its name and JSON payload. A `null` payload
    /// is read as an empty object, so list commands accept it as "no
    /// filter".
    pub fn parse(name: &str, payload: Value) -> WardenResult<Self> {
        if !COMMAND_NAMES.contains(&name) {
            return Err(WardenError::validation(format!("unknown command: {name}")));
        }

        let payload = if payload.is_null() {
            json!({})
        } else {
            payload
        };

        serde_json::from_value(json!({ "command": name, "payload": payload }))
            .map_err(|e| WardenError::validation(format!("invalid payload for {name}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_command_is_rejected() {
        let err = Command::parse("Role.Promote", json!({})).unwrap_err();
        assert!(err.to_string().contains("unknown command"));
    }

    #[test]
    fn id_payload_is_a_bare_uuid() {
        let id = Uuid::new_v4();
        let command = Command::parse("AppScope.Get", json!(id)).unwrap();
        assert!(matches!(command, Command::GetAppScope(got) if got == id));

        let err = Command::parse("AppScope.Get", json!("not-a-uuid")).unwrap_err();
        assert!(matches!(err, WardenError::Validation { .. }));
    }

    #[test]
    fn list_accepts_null_and_filters() {
        let all = Command::parse("Role.GetAll", Value::Null).unwrap();
        assert!(matches!(all, Command::ListRoles(f) if f.conditions.is_empty()));

        let filtered = Command::parse(
            "Permission.GetAll",
            json!({
                "conditions": [{"field": "resource", "op": "eq", "value": "blog"}],
                "limit": 10
            }),
        )
        .unwrap();
        let Command::ListPermissions(filter) = filtered else {
            panic!("wrong variant");
        };
        assert_eq!(filter.conditions.len(), 1);
        assert_eq!(filter.pagination.limit, 10);
        assert_eq!(filter.pagination.offset, 0);
    }

    #[test]
    fn patch_separates_id_from_changes() {
        let id = Uuid::new_v4();
        let command = Command::parse(
            "Permission.Update",
            json!({"id": id, "action": "read", "target_id": null}),
        )
        .unwrap();
        let Command::UpdatePermission(patch) = command else {
            panic!("wrong variant");
        };
        assert_eq!(patch.id, id);
        assert_eq!(patch.changes.action.as_deref(), Some("read"));
        assert_eq!(patch.changes.target_id, Some(None));
        assert!(patch.changes.name.is_none());
    }

    #[test]
    fn check_permission_optional_fields_default() {
        let scope = Uuid::new_v4();
        let command = Command::parse(
            "Role.CheckPermission",
            json!({
                "profile_id": "alice",
                "permission_name": "blog.post.create",
                "app_scope_id": scope
            }),
        )
        .unwrap();
        let Command::CheckPermission(check) = command else {
            panic!("wrong variant");
        };
        assert_eq!(check, PermissionCheck::new("alice", "blog.post.create", scope));
    }

    #[test]
    fn missing_required_field_is_validation_error() {
        let err = Command::parse("Role.Assign", json!({"profile_id": "alice"})).unwrap_err();
        assert!(matches!(err, WardenError::Validation { .. }));
    }
}
