use anyhow::Result;
use serde_json::Value;

/// A single row as returned by a store, keyed by column name.
pub type Record = serde_json::Map<String, Value>;

/// Restricts a lookup to the rows related to an already resolved parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub column: String,
    pub value: String,
}

/// Equality lookup against one table.
///
/// Values are compared in their textual form because route values always
/// arrive as strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    pub table: String,
    pub column: String,
    pub value: String,
    pub scope: Option<Scope>,
    pub limit: usize,
}

impl LookupQuery {
    pub fn by_key(table: &str, column: &str, value: &str) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
            value: value.to_string(),
            scope: None,
            limit: 1,
        }
    }

    pub fn scoped_to(mut self, column: &str, value: &str) -> Self {
        self.scope = Some(Scope {
            column: column.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Check a record against the key and scope of this query
    pub fn matches(&self, record: &Record) -> bool {
        let key_matches = record
            .get(&self.column)
            .and_then(value_text)
            .is_some_and(|text| text == self.value);

        let scope_matches = match &self.scope {
            Some(scope) => record
                .get(&scope.column)
                .and_then(value_text)
                .is_some_and(|text| text == scope.value),
            None => true,
        };

        key_matches && scope_matches
    }
}

/// The query surface the binding engine needs from the ORM.
#[async_trait::async_trait]
pub trait ModelStore: Send + Sync {
    /// Return at most `query.limit` matching rows, in storage order
    async fn find(&self, query: &LookupQuery) -> Result<Vec<Record>>;
}

/// Write access used for seeding demo data.
#[async_trait::async_trait]
pub trait SeedStore: Send + Sync {
    async fn insert(&self, table: &str, record: Record) -> Result<()>;
}

/// Textual form of a column value, `None` for SQL NULL.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(&json!(12)), Some("12".to_string()));
        assert_eq!(value_text(&json!("hello")), Some("hello".to_string()));
        assert_eq!(value_text(&json!(true)), Some("true".to_string()));
        assert_eq!(value_text(&Value::Null), None);
    }

    #[test]
    fn test_query_matches_numeric_key_textually() {
        let row = record(json!({"id": 2, "post_id": 1, "code": "abc"}));

        assert!(LookupQuery::by_key("comments", "id", "2").matches(&row));
        assert!(!LookupQuery::by_key("comments", "id", "3").matches(&row));
        assert!(LookupQuery::by_key("comments", "code", "abc")
            .scoped_to("post_id", "1")
            .matches(&row));
        assert!(!LookupQuery::by_key("comments", "code", "abc")
            .scoped_to("post_id", "7")
            .matches(&row));
    }

    #[test]
    fn test_null_column_never_matches() {
        let row = record(json!({"id": 1, "slug": null}));
        assert!(!LookupQuery::by_key("posts", "slug", "null").matches(&row));
        assert!(!LookupQuery::by_key("posts", "missing", "1").matches(&row));
    }
}
