//! Typed list filters.
//!
//! A [`ListFilter`] is a conjunction of [`Condition`]s over a closed,
//! per-entity set of fields plus [`Pagination`]. Storage backends render
//! the conditions into their own query language after calling
//! [`ListFilter::validate`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{WardenError, WardenResult};
use crate::repository::Pagination;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Contains,
    StartsWith,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Text(String),
    Null,
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// The stored type of a filterable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    OptionalText,
    Bool,
}

/// A filterable column of one entity.
pub trait FilterField: Copy + fmt::Debug {
    /// Column name in the persisted record.
    fn column(self) -> &'static str;
    fn kind(self) -> FieldKind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppScopeField {
    Name,
    Description,
    Active,
}

impl FilterField for AppScopeField {
    fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Active => "active",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::Name | Self::Description => FieldKind::Text,
            Self::Active => FieldKind::Bool,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionField {
    Name,
    Description,
    Resource,
    Action,
    TargetId,
}

impl FilterField for PermissionField {
    fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Resource => "resource",
            Self::Action => "action",
            Self::TargetId => "target_id",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::TargetId => FieldKind::OptionalText,
            _ => FieldKind::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleField {
    Name,
    Description,
    AppScopeId,
}

impl FilterField for RoleField {
    fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::AppScopeId => "app_scope_id",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::Name | Self::Description => FieldKind::Text,
            Self::AppScopeId => FieldKind::OptionalText,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition<F> {
    pub field: F,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl<F: FilterField> Condition<F> {
    pub fn new(field: F, op: FilterOp, value: impl Into<FilterValue>) -> Self {
        Self {
            field,
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: F, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    /// Reject operator/value combinations the field's type cannot satisfy.
    pub fn validate(&self) -> WardenResult<()> {
        let kind = self.field.kind();
        let ok = match (kind, self.op, &self.value) {
            (FieldKind::Bool, FilterOp::Eq | FilterOp::Ne, FilterValue::Bool(_)) => true,
            (FieldKind::Text | FieldKind::OptionalText, _, FilterValue::Text(_)) => true,
            (FieldKind::OptionalText, FilterOp::Eq | FilterOp::Ne, FilterValue::Null) => true,
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(WardenError::validation(format!(
                "filter {:?} {:?} {:?} is not valid for a {:?} field",
                self.field, self.op, self.value, kind
            )))
        }
    }
}

/// Conjunction of conditions plus a page window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListFilter<F> {
    #[serde(default = "Vec::new")]
    pub conditions: Vec<Condition<F>>,
    #[serde(default, flatten)]
    pub pagination: Pagination,
}

impl<F> Default for ListFilter<F> {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            pagination: Pagination::default(),
        }
    }
}

impl<F: FilterField> ListFilter<F> {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with(mut self, condition: Condition<F>) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn validate(&self) -> WardenResult<()> {
        self.conditions.iter().try_for_each(Condition::validate)
    }
}
