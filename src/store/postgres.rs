use anyhow::{bail, Context, Result};
use parking_lot::RwLock;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;

use crate::store::traits::{LookupQuery, ModelStore, Record, SeedStore};

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    /// `format_type` output per (table, column), filled on first lookup
    column_types: Arc<RwLock<HashMap<(String, String), String>>>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self {
            pool,
            column_types: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Create the demo blog tables if they do not exist yet
    pub async fn migrate(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS authors (
                id BIGINT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id BIGINT PRIMARY KEY,
                author_id BIGINT NOT NULL REFERENCES authors (id),
                slug TEXT NOT NULL,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                published BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id BIGINT PRIMARY KEY,
                post_id BIGINT NOT NULL REFERENCES posts (id),
                code TEXT NOT NULL,
                body TEXT NOT NULL
            )
            "#,
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to run migration")?;
        }

        log::info!("Database schema ready");
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// SQL type of a column as Postgres spells it, e.g. `bigint` or `text`
    async fn column_type(&self, table: &str, column: &str) -> Result<String> {
        let key = (table.to_string(), column.to_string());
        let cached = self.column_types.read().get(&key).cloned();
        if let Some(column_type) = cached {
            return Ok(column_type);
        }

        let row = sqlx::query(
            "SELECT format_type(a.atttypid, a.atttypmod) AS column_type \
             FROM pg_attribute a \
             WHERE a.attrelid = to_regclass($1) AND a.attname = $2 \
             AND a.attnum > 0 AND NOT a.attisdropped",
        )
        .bind(quote_ident(table)?)
        .bind(column)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to read column type of {}.{}", table, column))?;

        let Some(row) = row else {
            bail!("column {}.{} does not exist", table, column);
        };
        let column_type: String = row.try_get("column_type")?;
        self.column_types.write().insert(key, column_type.clone());
        Ok(column_type)
    }
}

/// Quote an identifier after checking it is a plain SQL name.
///
/// Table and column names come from model declarations and route annotations,
/// never from request values, but route annotations are still text.
fn quote_ident(ident: &str) -> Result<String> {
    let mut chars = ident.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("invalid SQL identifier `{}`", ident);
    }
    Ok(format!("\"{}\"", ident))
}

/// Build the lookup statement.
///
/// Request values are bound as text and cast to the column's own type, so
/// the comparison can use the column's index.
fn select_sql(query: &LookupQuery, key_type: &str, scope_type: Option<&str>) -> Result<String> {
    let table = quote_ident(&query.table)?;
    let column = quote_ident(&query.column)?;

    let mut sql = format!(
        "SELECT row_to_json(t) AS row FROM {} t WHERE t.{} = $1::{}",
        table, column, key_type
    );
    if let Some(scope) = &query.scope {
        let Some(scope_type) = scope_type else {
            bail!("no column type given for scope column `{}`", scope.column);
        };
        sql.push_str(&format!(
            " AND t.{} = $2::{}",
            quote_ident(&scope.column)?,
            scope_type
        ));
    }
    sql.push_str(&format!(" LIMIT {}", query.limit));
    Ok(sql)
}

/// SQLSTATEs raised when a value does not parse as the column type: invalid
/// text representation, numeric out of range, bad datetime. Such a value
/// matches no row.
fn is_cast_failure(code: &str) -> bool {
    matches!(code, "22P02" | "22003" | "22007" | "22008")
}

#[async_trait::async_trait]
impl ModelStore for PostgresStore {
    async fn find(&self, query: &LookupQuery) -> Result<Vec<Record>> {
        let key_type = self.column_type(&query.table, &query.column).await?;
        let scope_type = match &query.scope {
            Some(scope) => Some(self.column_type(&query.table, &scope.column).await?),
            None => None,
        };
        let sql = select_sql(query, &key_type, scope_type.as_deref())?;

        let mut statement = sqlx::query(&sql).bind(query.value.as_str());
        if let Some(scope) = &query.scope {
            statement = statement.bind(scope.value.as_str());
        }

        let rows = match statement.fetch_all(&self.pool).await {
            Ok(rows) => rows,
            Err(sqlx::Error::Database(err)) if err.code().as_deref().is_some_and(is_cast_failure) => {
                log::debug!(
                    "{:?} is not a valid {} for {}.{}",
                    query.value,
                    key_type,
                    query.table,
                    query.column
                );
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to query {}", query.table));
            }
        };

        rows.into_iter()
            .map(|row| -> Result<Record> {
                let value: Value = row.try_get("row")?;
                match value {
                    Value::Object(record) => Ok(record),
                    other => bail!("row_to_json returned a non-object: {}", other),
                }
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl SeedStore for PostgresStore {
    async fn insert(&self, table: &str, record: Record) -> Result<()> {
        let table = quote_ident(table)?;
        let sql = format!(
            "INSERT INTO {table} SELECT * FROM jsonb_populate_record(NULL::{table}, $1) ON CONFLICT DO NOTHING"
        );

        sqlx::query(&sql)
            .bind(sqlx::types::Json(Value::Object(record)))
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to insert into {}", table))?;

        Ok(())
    }
}
