//! Rendering of typed list filters into SurrealQL.

use surrealdb::Connection;
use surrealdb::method::Query;
use warden_core::filter::{Condition, FieldKind, FilterField, FilterOp, FilterValue, ListFilter};

/// A rendered `WHERE` clause and the parameters it references.
#[derive(Debug, Default)]
pub(crate) struct WhereClause {
    pub sql: String,
    bindings: Vec<(String, FilterValue)>,
}

impl WhereClause {
    /// Render conditions, ANDed together. Parameters are named `$f0`,
    /// `$f1`, … so they cannot collide with the caller's own. The filter
    /// must already have passed [`ListFilter::validate`].
    pub fn render<F: FilterField>(filter: &ListFilter<F>) -> Self {
        let mut clause = Self::default();
        let mut parts = Vec::with_capacity(filter.conditions.len());
        for (i, condition) in filter.conditions.iter().enumerate() {
            parts.push(clause.render_one(i, condition));
        }
        if !parts.is_empty() {
            clause.sql = format!("WHERE {}", parts.join(" AND "));
        }
        clause
    }

    fn render_one<F: FilterField>(&mut self, i: usize, condition: &Condition<F>) -> String {
        let column = condition.field.column();
        // Optional columns may hold NONE, which string functions reject.
        let text_column = match condition.field.kind() {
            FieldKind::OptionalText => format!("({column} ?? '')"),
            _ => column.to_owned(),
        };

        if condition.value == FilterValue::Null {
            return match condition.op {
                FilterOp::Ne => format!("{column} != NONE"),
                _ => format!("{column} = NONE"),
            };
        }

        let param = format!("f{i}");
        self.bindings.push((param.clone(), condition.value.clone()));
        match condition.op {
            FilterOp::Eq => format!("{column} = ${param}"),
            FilterOp::Ne => format!("{column} != ${param}"),
            FilterOp::Contains => format!("string::contains({text_column}, ${param})"),
            FilterOp::StartsWith => format!("string::starts_with({text_column}, ${param})"),
        }
    }

    /// Attach this clause's parameters to a query.
    pub fn bind<'r, C: Connection>(&self, mut query: Query<'r, C>) -> Query<'r, C> {
        for (name, value) in &self.bindings {
            query = match value {
                FilterValue::Bool(b) => query.bind((name.clone(), *b)),
                FilterValue::Text(s) => query.bind((name.clone(), s.clone())),
                FilterValue::Null => query,
            };
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use warden_core::filter::{AppScopeField, PermissionField};

    use super::*;

    #[test]
    fn empty_filter_renders_nothing() {
        let clause = WhereClause::render(&ListFilter::<AppScopeField>::all());
        assert!(clause.sql.is_empty());
        assert!(clause.bindings.is_empty());
    }

    #[test]
    fn conditions_are_anded_with_numbered_params() {
        let filter = ListFilter::all()
            .with(Condition::eq(PermissionField::Resource, "blog"))
            .with(Condition::new(
                PermissionField::Name,
                FilterOp::StartsWith,
                "blog.",
            ))
            .with(Condition::eq(PermissionField::TargetId, None::<String>));
        let clause = WhereClause::render(&filter);
        assert_eq!(
            clause.sql,
            "WHERE resource = $f0 AND string::starts_with(name, $f1) AND target_id = NONE"
        );
        assert_eq!(clause.bindings.len(), 2);
    }

    #[test]
    fn optional_column_is_coalesced_for_string_ops() {
        let filter = ListFilter::all().with(Condition::new(
            PermissionField::TargetId,
            FilterOp::Contains,
            "post",
        ));
        let clause = WhereClause::render(&filter);
        assert_eq!(clause.sql, "WHERE string::contains((target_id ?? ''), $f0)");
    }
}
