use super::error::FilterError;
use super::filter_where::FilterWhere;
use super::types::SubServiceDetail;

/// Predicate compiler for a sub-service detail document.
///
/// The result is a WHERE fragment without the keyword; an empty string means
/// the rule places no row restriction.
pub struct Filter<'a> {
    detail: &'a SubServiceDetail,
}

impl<'a> Filter<'a> {
    pub fn new(detail: &'a SubServiceDetail) -> Self {
        Self { detail }
    }

    /// Parses the persisted JSON form of a detail document.
    pub fn parse_detail(raw: &str) -> Result<SubServiceDetail, FilterError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Parses and compiles in one step.
    pub fn compile_str(raw: &str) -> Result<String, FilterError> {
        let detail = Self::parse_detail(raw)?;
        Filter::new(&detail).to_where_sql()
    }

    /// Fixed filters and user filters compile independently; when both are
    /// present the result is `(<fixed> AND <user>)`.
    pub fn to_where_sql(&self) -> Result<String, FilterError> {
        let user = FilterWhere::generate(&self.detail.row_filters, "detail.row_filters")?;
        let fixed = match &self.detail.fixed_row_filters {
            Some(fixed) => FilterWhere::generate(fixed, "detail.fixed_row_filters")?,
            None => Default::default(),
        };

        Ok(match (fixed.is_empty(), user.is_empty()) {
            (true, true) => String::new(),
            (false, true) => fixed.sql,
            (true, false) => user.sql,
            (false, false) => format!("({} AND {})", fixed.as_operand(), user.as_operand()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(value: serde_json::Value) -> Result<String, FilterError> {
        Filter::compile_str(&value.to_string())
    }

    fn age_filters() -> serde_json::Value {
        json!({"where": [{"relation": "AND", "member": [
            {"name_en": "age", "data_type": "int", "operator": ">=", "value": "18"}
        ]}]})
    }

    fn tenant_filters() -> serde_json::Value {
        json!({"where": [{"relation": "AND", "member": [
            {"name_en": "tenant", "data_type": "char", "operator": "=", "value": "T1"}
        ]}]})
    }

    #[test]
    fn user_filters_only() {
        let sql = compile(json!({"row_filters": age_filters()})).unwrap();
        assert_eq!(sql, "(\"age\" >= 18)");
    }

    #[test]
    fn empty_fixed_filters_do_not_change_output() {
        let with_empty_fixed = compile(json!({
            "row_filters": age_filters(),
            "fixed_row_filters": {"where": [{"relation": "AND", "member": []}]}
        }))
        .unwrap();
        assert_eq!(with_empty_fixed, compile(json!({"row_filters": age_filters()})).unwrap());
    }

    #[test]
    fn fixed_filters_are_and_composed_first() {
        let sql = compile(json!({
            "fixed_row_filters": tenant_filters(),
            "row_filters": age_filters()
        }))
        .unwrap();
        assert_eq!(sql, "((\"tenant\" = 'T1') AND (\"age\" >= 18))");
    }

    #[test]
    fn fixed_filters_alone() {
        let sql = compile(json!({"fixed_row_filters": tenant_filters()})).unwrap();
        assert_eq!(sql, "(\"tenant\" = 'T1')");
    }

    #[test]
    fn user_or_groups_cannot_escape_fixed_guard() {
        let sql = compile(json!({
            "fixed_row_filters": tenant_filters(),
            "row_filters": {"where_relation": "OR", "where": [
                {"relation": "AND", "member": [{"name_en": "a", "data_type": "int", "operator": "=", "value": 1}]},
                {"relation": "AND", "member": [{"name_en": "b", "data_type": "int", "operator": "=", "value": 2}]}
            ]}
        }))
        .unwrap();
        assert_eq!(sql, "((\"tenant\" = 'T1') AND ((\"a\" = 1) OR (\"b\" = 2)))");
    }

    #[test]
    fn empty_detail_means_no_restriction() {
        assert_eq!(compile(json!({})).unwrap(), "");
        assert_eq!(compile(json!({"scope_fields": ["a", "b"]})).unwrap(), "");
    }

    #[test]
    fn malformed_detail_is_an_error() {
        assert!(matches!(Filter::compile_str("{not json"), Err(FilterError::JsonError(_))));
    }

    #[test]
    fn fixed_filter_errors_point_at_fixed_tree() {
        let err = compile(json!({"fixed_row_filters": {"where": [{"relation": "AND", "member": [
            {"name_en": "x", "data_type": "char", "operator": "matches", "value": "y"}
        ]}]}}))
        .unwrap_err();
        assert_eq!(err.path(), "detail.fixed_row_filters.where[0].member[0]");
    }
}
