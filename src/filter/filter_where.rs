use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::error::FilterError;
use super::types::{DataType, FilterOp, Member, Relation, RowFilters};

/// Current wall-clock time as the virtualization engine sees it.
pub const NOW_CST: &str = "CURRENT_TIMESTAMP AT TIME ZONE 'UTC' AT TIME ZONE 'Asia/Shanghai'";

/// Formats accepted by the `current` operator.
const CURRENT_FORMATS: &[&str] = &["%Y", "%Y-%m", "%Y-%m-%d", "%Y-%m-%d %H", "%Y-%m-%d %H:%i", "%x-%v"];

/// Units accepted by the `before` operator.
const BEFORE_UNITS: &[&str] = &["YEAR", "QUARTER", "MONTH", "WEEK", "DAY", "HOUR", "MINUTE", "SECOND"];

/// Output of compiling one `RowFilters` tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereFragment {
    pub sql: String,
    /// Number of non-empty groups joined into `sql`.
    pub groups: usize,
}

impl WhereFragment {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Fragment safe to combine with another one under AND.
    pub fn as_operand(&self) -> String {
        if self.groups > 1 {
            format!("({})", self.sql)
        } else {
            self.sql.clone()
        }
    }
}

/// Compiles a `RowFilters` tree into a WHERE fragment without the keyword.
pub struct FilterWhere<'a> {
    path: &'a str,
}

impl<'a> FilterWhere<'a> {
    /// `path` names the tree inside the detail document, e.g. `detail.row_filters`.
    pub fn new(path: &'a str) -> Self {
        Self { path }
    }

    pub fn generate(filters: &RowFilters, path: &str) -> Result<WhereFragment, FilterError> {
        FilterWhere::new(path).build(filters)
    }

    fn build(&self, filters: &RowFilters) -> Result<WhereFragment, FilterError> {
        let top = Relation::parse(&filters.where_relation).ok_or_else(|| FilterError::InvalidRelation {
            path: format!("{}.where_relation", self.path),
            relation: filters.where_relation.clone(),
        })?;

        let mut groups = Vec::with_capacity(filters.groups.len());
        for (gi, group) in filters.groups.iter().enumerate() {
            if group.members.is_empty() {
                continue;
            }
            let relation = Relation::parse(&group.relation).ok_or_else(|| FilterError::InvalidRelation {
                path: format!("{}.where[{}].relation", self.path, gi),
                relation: group.relation.clone(),
            })?;

            let mut conditions = Vec::with_capacity(group.members.len());
            for (mi, member) in group.members.iter().enumerate() {
                let path = format!("{}.where[{}].member[{}]", self.path, gi, mi);
                conditions.push(Self::build_sql_condition(member, &path)?);
            }
            groups.push(format!("({})", conditions.join(relation.to_sql())));
        }

        Ok(WhereFragment {
            sql: groups.join(top.to_sql()),
            groups: groups.len(),
        })
    }

    fn build_sql_condition(member: &Member, path: &str) -> Result<String, FilterError> {
        if member.name_en.trim().is_empty() {
            return Err(FilterError::EmptyColumn { path: path.to_string() });
        }
        let operator = FilterOp::parse(&member.operator).ok_or_else(|| FilterError::UnsupportedOperator {
            path: path.to_string(),
            operator: member.operator.clone(),
        })?;
        let data_type = DataType::parse(&member.data_type);
        let column = quote_identifier(&member.name_en);
        // Tokens (numbers, list items, temporal specs) are trimmed. A single
        // char value is matched verbatim, surrounding spaces included.
        let value = member.value.trim();

        let mismatch = || FilterError::DataTypeMismatch {
            path: path.to_string(),
            operator: member.operator.clone(),
            data_type: member.data_type.clone(),
        };
        let invalid = |reason: String| FilterError::InvalidValue { path: path.to_string(), reason };

        match operator {
            FilterOp::Lt | FilterOp::Lte | FilterOp::Gt | FilterOp::Gte => {
                if !data_type.is_numeric() {
                    return Err(mismatch());
                }
                let sql_op = match operator {
                    FilterOp::Lt => "<",
                    FilterOp::Lte => "<=",
                    FilterOp::Gt => ">",
                    _ => ">=",
                };
                Ok(format!("{} {} {}", column, sql_op, numeric_literal(value).map_err(invalid)?))
            }
            FilterOp::Eq | FilterOp::Neq => {
                let sql_op = if operator == FilterOp::Eq { "=" } else { "<>" };
                let literal = match data_type {
                    DataType::Int | DataType::Float | DataType::Decimal => numeric_literal(value).map_err(invalid)?,
                    DataType::Char => quote_literal(&member.value),
                    _ => return Err(mismatch()),
                };
                Ok(format!("{} {} {}", column, sql_op, literal))
            }
            FilterOp::Null => Ok(format!("{} IS NULL", column)),
            FilterOp::NotNull => Ok(format!("{} IS NOT NULL", column)),
            FilterOp::Include | FilterOp::NotInclude | FilterOp::Prefix | FilterOp::NotPrefix => {
                if data_type != DataType::Char {
                    return Err(mismatch());
                }
                let escaped = escape_like(&member.value);
                let (keyword, pattern) = match operator {
                    FilterOp::Include => ("LIKE", format!("%{}%", escaped)),
                    FilterOp::NotInclude => ("NOT LIKE", format!("%{}%", escaped)),
                    FilterOp::Prefix => ("LIKE", format!("{}%", escaped)),
                    _ => ("NOT LIKE", format!("{}%", escaped)),
                };
                Ok(format!("{} {} '{}'", column, keyword, pattern))
            }
            FilterOp::InList => {
                let mut items = Vec::new();
                for item in member.value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                    items.push(if data_type.is_numeric() {
                        numeric_literal(item).map_err(invalid)?
                    } else {
                        quote_literal(item)
                    });
                }
                if items.is_empty() {
                    return Err(invalid("list must contain at least one value".to_string()));
                }
                Ok(format!("{} IN ({})", column, items.join(",")))
            }
            FilterOp::True => Ok(format!("{} = true", column)),
            FilterOp::False => Ok(format!("{} = false", column)),
            FilterOp::Before => {
                if !data_type.is_temporal() {
                    return Err(mismatch());
                }
                let (amount, unit) = parse_before(value).map_err(invalid)?;
                Ok(format!(
                    "{col} >= DATE_add('{unit}', -{amount}, {now}) AND {col} <= {now}",
                    col = column,
                    unit = unit,
                    amount = amount,
                    now = NOW_CST,
                ))
            }
            FilterOp::Current => {
                if !data_type.is_temporal() {
                    return Err(mismatch());
                }
                if !CURRENT_FORMATS.contains(&value) {
                    return Err(invalid(format!("unsupported date format '{}'", value)));
                }
                Ok(format!("DATE_FORMAT({}, '{}') = DATE_FORMAT({}, '{}')", column, value, NOW_CST, value))
            }
            FilterOp::Between => {
                if !data_type.is_temporal() {
                    return Err(mismatch());
                }
                let bounds: Vec<&str> = value.split(',').map(str::trim).collect();
                if bounds.len() != 2 {
                    return Err(invalid("between requires exactly two timestamps".to_string()));
                }
                for bound in &bounds {
                    if !is_timestamp(bound) {
                        return Err(invalid(format!("'{}' is not a timestamp", bound)));
                    }
                }
                Ok(format!(
                    "{} BETWEEN DATE_TRUNC('minute', CAST({} AS TIMESTAMP)) AND DATE_TRUNC('minute', CAST({} AS TIMESTAMP))",
                    column,
                    quote_literal(bounds[0]),
                    quote_literal(bounds[1]),
                ))
            }
        }
    }
}

/// Double-quoted identifier with embedded quotes doubled.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quoted string literal with backslash and quote escaped.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Escapes a value for use inside a LIKE pattern (without the wildcards).
pub fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn numeric_literal(value: &str) -> Result<String, String> {
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(value.to_string()),
        _ => Err(format!("'{}' is not a number", value)),
    }
}

fn parse_before(value: &str) -> Result<(u32, String), String> {
    let mut parts = value.split_whitespace();
    let (Some(amount), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("'{}' must look like '<N> <unit>'", value));
    };
    let amount: u32 = amount
        .parse()
        .map_err(|_| format!("'{}' is not a positive integer", amount))?;
    let unit = unit.to_ascii_uppercase();
    if !BEFORE_UNITS.contains(&unit.as_str()) {
        return Err(format!("unsupported time unit '{}'", unit));
    }
    Ok((amount, unit))
}

fn is_timestamp(value: &str) -> bool {
    const FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];
    DateTime::parse_from_rfc3339(value).is_ok()
        || FORMATS.iter().any(|f| NaiveDateTime::parse_from_str(value, f).is_ok())
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::WhereGroup;

    fn member(name: &str, data_type: &str, operator: &str, value: &str) -> Member {
        Member {
            name_en: name.to_string(),
            data_type: data_type.to_string(),
            operator: operator.to_string(),
            value: value.to_string(),
        }
    }

    fn single(m: Member) -> Result<String, FilterError> {
        FilterWhere::build_sql_condition(&m, "detail.row_filters.where[0].member[0]")
    }

    #[test]
    fn whitespace_is_trimmed_from_tokens_but_not_char_values() {
        assert_eq!(single(member("age", "int", "=", " 18 ")).unwrap(), "\"age\" = 18");
        assert_eq!(single(member("code", "char", "in list", " a , b ")).unwrap(), "\"code\" IN ('a','b')");
        assert_eq!(single(member("code", "char", "=", " a ")).unwrap(), "\"code\" = ' a '");
        assert_eq!(single(member("code", "char", "<>", "a ")).unwrap(), "\"code\" <> 'a '");
        assert_eq!(single(member("code", "char", "include", " a")).unwrap(), "\"code\" LIKE '% a%'");
    }

    #[test]
    fn comparison_requires_numeric_value() {
        assert_eq!(single(member("age", "int", ">=", "18")).unwrap(), "\"age\" >= 18");
        assert_eq!(single(member("score", "float", "<", " 2.5 ")).unwrap(), "\"score\" < 2.5");
        assert!(single(member("age", "int", ">", "abc")).is_err());
        assert!(single(member("age", "int", ">", "NaN")).is_err());
        assert!(single(member("name", "char", ">", "1")).is_err());
    }

    #[test]
    fn equality_quotes_char_values() {
        assert_eq!(single(member("name", "char", "=", "O'Reilly")).unwrap(), "\"name\" = 'O\\'Reilly'");
        assert_eq!(single(member("id", "decimal", "<>", "3.10")).unwrap(), "\"id\" <> 3.10");
        assert!(single(member("flag", "bool", "=", "true")).is_err());
        assert!(single(member("id", "int", "=", "1 OR 1=1")).is_err());
    }

    #[test]
    fn identifiers_double_embedded_quotes() {
        assert_eq!(single(member("we\"ird", "int", "null", "")).unwrap(), "\"we\"\"ird\" IS NULL");
        assert_eq!(single(member("c", "date", "not null", "")).unwrap(), "\"c\" IS NOT NULL");
    }

    #[test]
    fn like_family_escapes_wildcards() {
        assert_eq!(single(member("rate", "char", "include", "50%")).unwrap(), "\"rate\" LIKE '%50\\%%'");
        assert_eq!(single(member("code", "char", "not include", "a_b")).unwrap(), "\"code\" NOT LIKE '%a\\_b%'");
        assert_eq!(single(member("path", "char", "prefix", "C:\\")).unwrap(), "\"path\" LIKE 'C:\\\\%'");
        assert_eq!(single(member("code", "char", "not prefix", "x'")).unwrap(), "\"code\" NOT LIKE 'x\\'%'");
        assert!(single(member("age", "int", "include", "1")).is_err());
    }

    #[test]
    fn in_list_keeps_single_value_as_list() {
        assert_eq!(single(member("city", "char", "in list", "Paris")).unwrap(), "\"city\" IN ('Paris')");
        assert_eq!(single(member("id", "int", "belong", "1, 2,3")).unwrap(), "\"id\" IN (1,2,3)");
        assert!(single(member("id", "int", "in list", "1,x")).is_err());
        assert!(single(member("id", "int", "in list", " , ")).is_err());
    }

    #[test]
    fn boolean_operators() {
        assert_eq!(single(member("active", "bool", "true", "")).unwrap(), "\"active\" = true");
        assert_eq!(single(member("active", "bool", "false", "")).unwrap(), "\"active\" = false");
    }

    #[test]
    fn before_rewrites_to_shanghai_window() {
        assert_eq!(
            single(member("col", "datetime", "before", "7 DAY")).unwrap(),
            "\"col\" >= DATE_add('DAY', -7, CURRENT_TIMESTAMP AT TIME ZONE 'UTC' AT TIME ZONE 'Asia/Shanghai') \
             AND \"col\" <= CURRENT_TIMESTAMP AT TIME ZONE 'UTC' AT TIME ZONE 'Asia/Shanghai'"
        );
        assert!(single(member("col", "datetime", "before", "7")).is_err());
        assert!(single(member("col", "datetime", "before", "7 FORTNIGHT")).is_err());
        assert!(single(member("col", "char", "before", "7 DAY")).is_err());
    }

    #[test]
    fn current_accepts_known_formats_only() {
        assert_eq!(
            single(member("d", "date", "current", "%Y-%m")).unwrap(),
            format!("DATE_FORMAT(\"d\", '%Y-%m') = DATE_FORMAT({}, '%Y-%m')", NOW_CST)
        );
        assert!(single(member("d", "date", "current", "%Y'); DROP")).is_err());
    }

    #[test]
    fn between_truncates_to_minute() {
        assert_eq!(
            single(member("t", "timestamp", "between", "2024-01-01 00:00:00,2024-02-01 12:30:00")).unwrap(),
            "\"t\" BETWEEN DATE_TRUNC('minute', CAST('2024-01-01 00:00:00' AS TIMESTAMP)) \
             AND DATE_TRUNC('minute', CAST('2024-02-01 12:30:00' AS TIMESTAMP))"
        );
        assert!(single(member("t", "timestamp", "between", "2024-01-01")).is_err());
        assert!(single(member("t", "timestamp", "between", "yesterday,today")).is_err());
    }

    #[test]
    fn unknown_operator_reports_member_path() {
        let err = single(member("name", "char", "matches", "x")).unwrap_err();
        assert_eq!(err.path(), "detail.row_filters.where[0].member[0]");
    }

    #[test]
    fn groups_join_in_input_order() {
        let filters = RowFilters {
            where_relation: "OR".to_string(),
            groups: vec![
                WhereGroup {
                    relation: "AND".to_string(),
                    members: vec![member("a", "int", "=", "1"), member("b", "int", "=", "2")],
                },
                WhereGroup { relation: "OR".to_string(), members: vec![] },
                WhereGroup {
                    relation: String::new(),
                    members: vec![member("c", "char", "=", "x")],
                },
            ],
        };
        let fragment = FilterWhere::generate(&filters, "detail.row_filters").unwrap();
        assert_eq!(fragment.sql, "(\"a\" = 1 AND \"b\" = 2) OR (\"c\" = 'x')");
        assert_eq!(fragment.groups, 2);
        assert_eq!(fragment.as_operand(), format!("({})", fragment.sql));
    }

    #[test]
    fn empty_groups_compile_to_nothing() {
        let filters = RowFilters {
            where_relation: String::new(),
            groups: vec![WhereGroup::default(), WhereGroup::default()],
        };
        assert!(FilterWhere::generate(&filters, "detail.row_filters").unwrap().is_empty());
    }

    #[test]
    fn rejects_unknown_relation() {
        let filters = RowFilters {
            where_relation: "XOR".to_string(),
            groups: vec![],
        };
        let err = FilterWhere::generate(&filters, "detail.row_filters").unwrap_err();
        assert_eq!(err.path(), "detail.row_filters.where_relation");
    }
}
