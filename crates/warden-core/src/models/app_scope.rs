//! Application scope domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named application boundary (e.g. `owner-console`, `global`) that
/// roles and role assignments are bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppScope {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppScope {
    pub name: String,
    pub description: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateAppScope {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

fn default_active() -> bool {
    true
}
