use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Structured content of a sub-service `detail` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubServiceDetail {
    /// Column identifiers this rule exposes, in declaration order.
    #[serde(default)]
    pub scope_fields: Vec<String>,
    #[serde(default)]
    pub row_filters: RowFilters,
    /// Administrator-pinned filters, always AND-composed ahead of `row_filters`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_row_filters: Option<RowFilters>,
}

/// Two-level boolean expression: groups of members.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowFilters {
    /// Combinator between groups; empty means AND.
    #[serde(default)]
    pub where_relation: String,
    #[serde(default, rename = "where")]
    pub groups: Vec<WhereGroup>,
}

impl RowFilters {
    /// True when no group carries a member.
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.members.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhereGroup {
    #[serde(default)]
    pub relation: String,
    #[serde(default, rename = "member")]
    pub members: Vec<Member>,
}

/// Leaf predicate. Operator and data type stay textual here; the compiler
/// rejects values it does not understand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name_en: String,
    #[serde(default)]
    pub data_type: String,
    pub operator: String,
    #[serde(default, deserialize_with = "literal_as_string")]
    pub value: String,
}

fn literal_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => return Err(serde::de::Error::custom(format!("unsupported filter value: {}", other))),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    And,
    Or,
}

impl Relation {
    /// Empty input defaults to AND.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "AND" => Some(Relation::And),
            "OR" => Some(Relation::Or),
            _ => None,
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            Relation::And => " AND ",
            Relation::Or => " OR ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Neq,
    Null,
    NotNull,
    Include,
    NotInclude,
    Prefix,
    NotPrefix,
    InList,
    True,
    False,
    Before,
    Current,
    Between,
}

impl FilterOp {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.trim() {
            "<" => FilterOp::Lt,
            "<=" => FilterOp::Lte,
            ">" => FilterOp::Gt,
            ">=" => FilterOp::Gte,
            "=" => FilterOp::Eq,
            "<>" => FilterOp::Neq,
            "null" => FilterOp::Null,
            "not null" => FilterOp::NotNull,
            "include" => FilterOp::Include,
            "not include" => FilterOp::NotInclude,
            "prefix" => FilterOp::Prefix,
            "not prefix" => FilterOp::NotPrefix,
            "in list" | "belong" => FilterOp::InList,
            "true" => FilterOp::True,
            "false" => FilterOp::False,
            "before" => FilterOp::Before,
            "current" => FilterOp::Current,
            "between" => FilterOp::Between,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Char,
    Int,
    Float,
    Decimal,
    Bool,
    Date,
    Datetime,
    Timestamp,
    Time,
    Other(String),
}

impl DataType {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "char" => DataType::Char,
            "int" => DataType::Int,
            "float" => DataType::Float,
            "decimal" => DataType::Decimal,
            "bool" => DataType::Bool,
            "date" => DataType::Date,
            "datetime" => DataType::Datetime,
            "timestamp" => DataType::Timestamp,
            "time" => DataType::Time,
            other => DataType::Other(other.to_string()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int | DataType::Float | DataType::Decimal)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, DataType::Date | DataType::Datetime | DataType::Timestamp)
    }
}
