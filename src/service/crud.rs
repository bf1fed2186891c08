//! Generic CRUD execution against PostgreSQL.

use crate::error::AppError;
use crate::model::{ColumnSpec, ResolvedEntity, SemanticType};
use crate::sql::{self, QueryBuf};
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

/// One page of rows plus the total matching count.
#[derive(Debug)]
pub struct Page {
    pub rows: Vec<Value>,
    pub total: i64,
}

pub struct CrudService;

impl CrudService {
    /// Count matching rows, then fetch one page ordered by key.
    pub async fn list(
        pool: &PgPool,
        entity: &ResolvedEntity,
        filters: &[(String, Value)],
        limit: u32,
        offset: u32,
        soft_delete: Option<&str>,
    ) -> Result<Page, AppError> {
        let count = sql::count(entity, filters, soft_delete);
        tracing::debug!(sql = %count.sql, params = ?count.params, "query");
        let mut query = sqlx::query_scalar::<_, i64>(&count.sql);
        for p in &count.params {
            query = query.bind(p.clone());
        }
        let total = query.fetch_one(pool).await?;

        let q = sql::select_list(entity, filters, limit, offset, soft_delete);
        let rows = Self::query_many(pool, entity, &q).await?;
        Ok(Page { rows, total })
    }

    /// Fetch one row by key. Returns JSON object or None.
    pub async fn read(
        pool: &PgPool,
        entity: &ResolvedEntity,
        key: &[Value],
        soft_delete: Option<&str>,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::select_by_key(entity, key, soft_delete);
        Self::query_optional(pool, entity, &q).await
    }

    /// Insert one row from a validated body. Returns the created row with server defaults applied.
    pub async fn create(
        pool: &PgPool,
        entity: &ResolvedEntity,
        body: &Map<String, Value>,
    ) -> Result<Value, AppError> {
        let q = sql::insert(entity, body);
        Self::query_optional(pool, entity, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Update one row by key. Returns the updated row, or None when no live row has that key.
    pub async fn update(
        pool: &PgPool,
        entity: &ResolvedEntity,
        key: &[Value],
        body: &Map<String, Value>,
        soft_delete: Option<&str>,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::update(entity, key, body, soft_delete);
        Self::query_optional(pool, entity, &q).await
    }

    /// Delete (or soft-delete) one row by key. Returns the removed row or None.
    pub async fn delete(
        pool: &PgPool,
        entity: &ResolvedEntity,
        key: &[Value],
        soft_delete: Option<&str>,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::delete(entity, key, soft_delete);
        Self::query_optional(pool, entity, &q).await
    }

    async fn query_optional(pool: &PgPool, entity: &ResolvedEntity, q: &QueryBuf) -> Result<Option<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let row = query.fetch_optional(pool).await?;
        row.map(|r| row_to_json(entity, &r)).transpose()
    }

    async fn query_many(pool: &PgPool, entity: &ResolvedEntity, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let rows = query.fetch_all(pool).await?;
        rows.iter().map(|r| row_to_json(entity, r)).collect()
    }
}

/// Decode a row produced by the builder's select list: one cell per column, in column order.
fn row_to_json(entity: &ResolvedEntity, row: &PgRow) -> Result<Value, AppError> {
    let mut map = Map::with_capacity(entity.columns.len());
    for (i, col) in entity.columns.iter().enumerate() {
        map.insert(col.name.clone(), cell_to_value(row, i, col)?);
    }
    Ok(Value::Object(map))
}

fn cell_to_value(row: &PgRow, i: usize, col: &ColumnSpec) -> Result<Value, sqlx::Error> {
    Ok(match col.semantic {
        SemanticType::Integer => row.try_get::<Option<i64>, _>(i)?.map(Value::from).unwrap_or(Value::Null),
        SemanticType::Float => row.try_get::<Option<f64>, _>(i)?.map(float_to_value).unwrap_or(Value::Null),
        SemanticType::Boolean => row.try_get::<Option<bool>, _>(i)?.map(Value::Bool).unwrap_or(Value::Null),
        SemanticType::Uuid => row
            .try_get::<Option<uuid::Uuid>, _>(i)?
            .map(|u| Value::String(u.to_string()))
            .unwrap_or(Value::Null),
        SemanticType::Json => row.try_get::<Option<Value>, _>(i)?.unwrap_or(Value::Null),
        SemanticType::String
        | SemanticType::Decimal
        | SemanticType::Date
        | SemanticType::Time
        | SemanticType::DateTime
        | SemanticType::Binary => row
            .try_get::<Option<String>, _>(i)?
            .map(Value::String)
            .unwrap_or(Value::Null),
    })
}

/// JSON has no NaN or infinities; those come back as the strings PostgreSQL itself prints.
fn float_to_value(f: f64) -> Value {
    match serde_json::Number::from_f64(f) {
        Some(n) => Value::Number(n),
        None if f.is_nan() => Value::String("NaN".into()),
        None if f > 0.0 => Value::String("Infinity".into()),
        None => Value::String("-Infinity".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_finite_floats_become_strings() {
        assert_eq!(float_to_value(1.5), json!(1.5));
        assert_eq!(float_to_value(f64::NAN), json!("NaN"));
        assert_eq!(float_to_value(f64::INFINITY), json!("Infinity"));
        assert_eq!(float_to_value(f64::NEG_INFINITY), json!("-Infinity"));
    }
}
