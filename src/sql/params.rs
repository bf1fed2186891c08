//! Convert serde_json::Value to types that sqlx can bind.

use crate::model::SemanticType;
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

/// A value bound to a PostgreSQL query. The SQL side casts it to the column type (`$n::integer`).
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Json(Value),
}

impl PgBindValue {
    /// Convert a JSON value headed for a column of the given semantic type.
    /// JSON columns always bind as jsonb so scalars keep their JSON encoding.
    pub fn for_column(v: &Value, semantic: SemanticType) -> Self {
        match (v, semantic) {
            (Value::Null, _) => PgBindValue::Null,
            (_, SemanticType::Json) => PgBindValue::Json(v.clone()),
            (Value::Bool(b), _) => PgBindValue::Bool(*b),
            (Value::Number(n), SemanticType::Decimal) => PgBindValue::String(n.to_string()),
            (Value::Number(n), _) => match n.as_i64() {
                Some(i) => PgBindValue::I64(i),
                None => match n.as_f64() {
                    Some(f) => PgBindValue::F64(f),
                    None => PgBindValue::String(n.to_string()),
                },
            },
            (Value::String(s), _) => PgBindValue::String(s.clone()),
            (Value::Array(_) | Value::Object(_), _) => PgBindValue::Json(v.clone()),
        }
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgBindValue::Null => <Option<String> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::String(s) => {
                let s_ref: &str = s.as_str();
                <&str as Encode<Postgres>>::encode_by_ref(&s_ref, buf)?
            }
            PgBindValue::Json(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf)?,
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            PgBindValue::Null | PgBindValue::String(_) => <String as sqlx::Type<Postgres>>::type_info(),
            PgBindValue::Bool(_) => <bool as sqlx::Type<Postgres>>::type_info(),
            PgBindValue::I64(_) => <i64 as sqlx::Type<Postgres>>::type_info(),
            PgBindValue::F64(_) => <f64 as sqlx::Type<Postgres>>::type_info(),
            PgBindValue::Json(_) => <Value as sqlx::Type<Postgres>>::type_info(),
        })
    }
}

impl sqlx::Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_columns_keep_scalars_as_json() {
        assert_eq!(
            PgBindValue::for_column(&json!("hello"), SemanticType::Json),
            PgBindValue::Json(json!("hello"))
        );
    }

    #[test]
    fn decimals_bind_as_text_to_keep_precision() {
        assert_eq!(
            PgBindValue::for_column(&json!(12.5), SemanticType::Decimal),
            PgBindValue::String("12.5".into())
        );
    }

    #[test]
    fn numbers_and_nulls() {
        assert_eq!(PgBindValue::for_column(&json!(7), SemanticType::Integer), PgBindValue::I64(7));
        assert_eq!(PgBindValue::for_column(&json!(1.5), SemanticType::Float), PgBindValue::F64(1.5));
        assert_eq!(PgBindValue::for_column(&json!(null), SemanticType::Json), PgBindValue::Null);
    }
}
