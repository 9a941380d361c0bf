//! Permission domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub resource: String,
    /// The action this permission represents (e.g., `read`, `create`).
    pub action: String,
    /// Item-level restriction. `None` makes this a wildcard for its
    /// resource/action pair.
    pub target_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Permission {
    pub fn is_wildcard(&self) -> bool {
        self.target_id.is_none()
    }
}

/// A permission together with the roles that hold it.
///
/// The roles carry their app scope but not their own permission lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionDetail {
    #[serde(flatten)]
    pub permission: Permission,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermission {
    pub name: String,
    pub description: String,
    pub resource: String,
    pub action: String,
    #[serde(default)]
    pub target_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePermission {
    pub name: Option<String>,
    pub description: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
    /// `Some(None)` clears the target, `Some(Some(v))` sets it.
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub target_id: Option<Option<String>>,
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<Option<String>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_distinguishes_missing_and_null_target() {
        let missing: UpdatePermission = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(missing.target_id, None);

        let cleared: UpdatePermission = serde_json::from_str(r#"{"target_id":null}"#).unwrap();
        assert_eq!(cleared.target_id, Some(None));

        let set: UpdatePermission = serde_json::from_str(r#"{"target_id":"post-1"}"#).unwrap();
        assert_eq!(set.target_id, Some(Some("post-1".into())));
    }
}
