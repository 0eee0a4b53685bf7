use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::policy::ObjectType;

/// Row/column restriction bound to exactly one parent API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SubService {
    pub id: Uuid,
    pub name: String,
    pub service_id: Uuid,
    /// Identifier authorization policies are keyed against.
    pub auth_scope_id: Uuid,
    /// Serialized `SubServiceDetail`.
    pub detail: String,
    /// WHERE fragment compiled from `detail`.
    pub row_filter_clause: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Per-subject flag, set on list responses only.
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_auth: Option<bool>,
}

impl SubService {
    /// Object policies are evaluated against: the parent API when the scope is
    /// the parent itself, otherwise the sub-service scope.
    pub fn auth_object(&self) -> (ObjectType, Uuid) {
        if self.auth_scope_id == self.service_id {
            (ObjectType::Api, self.auth_scope_id)
        } else {
            (ObjectType::SubService, self.auth_scope_id)
        }
    }
}

/// Fields a caller may supply on create or update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubServiceInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub service_id: Option<Uuid>,
    #[serde(default)]
    pub auth_scope_id: Option<Uuid>,
    /// Accepted either as a JSON string or as the structured document.
    #[serde(default, deserialize_with = "detail_as_string")]
    pub detail: String,
}

fn detail_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde_json::Value;
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Options for `SubServiceStore::list` and the listing use case.
#[derive(Debug, Clone, PartialEq)]
pub struct ListOptions {
    pub service_id: Option<Uuid>,
    /// Page index starting at 1.
    pub offset: i64,
    /// Page size.
    pub limit: i64,
    pub sort: String,
    pub direction: String,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            service_id: None,
            offset: 1,
            limit: 10,
            sort: String::new(),
            direction: String::new(),
        }
    }
}

impl ListOptions {
    /// Row offset of the requested page, saturating at `i64::MAX` for very
    /// large page numbers.
    pub fn row_offset(&self) -> i64 {
        (self.offset.max(1) - 1).saturating_mul(self.limit.max(0))
    }

    /// Half-open window `[start, end)` of the requested page within `total` entries.
    pub fn window(&self, total: usize) -> (usize, usize) {
        let offset = self.offset.max(1) as usize;
        let limit = self.limit.max(0) as usize;
        let start = total.min((offset - 1).saturating_mul(limit));
        let end = total.min(offset.saturating_mul(limit));
        (start, end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListResult {
    pub entries: Vec<SubService>,
    pub total_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_clamped_to_total() {
        let opts = ListOptions { offset: 1, limit: 2, ..Default::default() };
        assert_eq!(opts.window(3), (0, 2));
        let opts = ListOptions { offset: 2, limit: 2, ..Default::default() };
        assert_eq!(opts.window(3), (2, 3));
        let opts = ListOptions { offset: 5, limit: 2, ..Default::default() };
        assert_eq!(opts.window(3), (3, 3));
    }

    #[test]
    fn row_offset_saturates_on_huge_pages() {
        let opts = ListOptions { offset: 3, limit: 10, ..Default::default() };
        assert_eq!(opts.row_offset(), 20);
        let opts = ListOptions { offset: i64::MAX, limit: 10, ..Default::default() };
        assert_eq!(opts.row_offset(), i64::MAX);
        assert_eq!(opts.window(3), (3, 3));
    }

    #[test]
    fn detail_accepts_object_or_string() {
        let input: SubServiceInput = serde_json::from_value(serde_json::json!({
            "name": "A",
            "detail": {"row_filters": {"where": []}}
        }))
        .unwrap();
        assert_eq!(input.detail, r#"{"row_filters":{"where":[]}}"#);

        let input: SubServiceInput = serde_json::from_value(serde_json::json!({
            "name": "A",
            "detail": "{\"scope_fields\":[]}"
        }))
        .unwrap();
        assert_eq!(input.detail, "{\"scope_fields\":[]}");
    }

    #[test]
    fn scope_equal_to_parent_is_api_level() {
        let parent = Uuid::new_v4();
        let now = Utc::now();
        let mut s = SubService {
            id: Uuid::new_v4(),
            name: "n".into(),
            service_id: parent,
            auth_scope_id: parent,
            detail: "{}".into(),
            row_filter_clause: String::new(),
            created_at: now,
            updated_at: now,
            can_auth: None,
        };
        assert_eq!(s.auth_object(), (ObjectType::Api, parent));
        s.auth_scope_id = s.id;
        assert_eq!(s.auth_object(), (ObjectType::SubService, s.id));
    }
}
