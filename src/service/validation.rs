//! Request validation against the synthesized schemas.

use crate::error::AppError;
use crate::model::{FieldSpec, GeneratedSchema, ResolvedEntity, SchemaKind, SemanticType};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value};

pub struct RequestValidator;

impl RequestValidator {
    /// Check a request body against `schema`. Every problem is reported, joined with "; ".
    /// Returns the body as an object on success.
    pub fn validate(
        entity: &ResolvedEntity,
        schema: &GeneratedSchema,
        body: &Value,
    ) -> Result<Map<String, Value>, AppError> {
        let Some(obj) = body.as_object() else {
            return Err(AppError::Validation("request body must be a JSON object".into()));
        };
        let mut problems = Vec::new();

        for (name, v) in obj {
            match schema.field(name) {
                Some(field) => {
                    if let Some(p) = check_value(field, v) {
                        problems.push(p);
                    }
                }
                None if entity.key_columns.contains(name) && schema.kind != SchemaKind::Create => {
                    problems.push(format!("{} is a key column and cannot be changed", name));
                }
                None if entity.schemas.read.field(name).is_some() => {
                    problems.push(format!("{} is read-only", name));
                }
                None => problems.push(format!("unknown field {}", name)),
            }
        }
        for field in schema.required_fields() {
            if !obj.contains_key(&field.name) {
                problems.push(format!("{} is required", field.name));
            }
        }

        if problems.is_empty() {
            Ok(obj.clone())
        } else {
            Err(AppError::Validation(problems.join("; ")))
        }
    }
}

/// Parse a raw path or query string into a JSON value of the field's type.
pub fn parse_text(field: &FieldSpec, raw: &str) -> Result<Value, String> {
    let v = match field.semantic {
        SemanticType::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("{} must be an integer", field.name))?,
        SemanticType::Float if is_float_special(raw) => Value::String(raw.to_string()),
        SemanticType::Float => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("{} must be a number", field.name))?,
        SemanticType::Boolean => match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err(format!("{} must be true or false", field.name)),
        },
        SemanticType::Json => serde_json::from_str(raw)
            .ok()
            .filter(|v: &Value| !v.is_null())
            .unwrap_or_else(|| Value::String(raw.to_string())),
        _ => Value::String(raw.to_string()),
    };
    match check_value(field, &v) {
        Some(p) => Err(p),
        None => Ok(v),
    }
}

/// Type and constraint check for one value. None when it is acceptable.
fn check_value(field: &FieldSpec, v: &Value) -> Option<String> {
    let name = &field.name;
    if v.is_null() {
        return (!field.nullable).then(|| format!("{} must not be null", name));
    }
    match field.semantic {
        SemanticType::Integer => {
            let Some(n) = v.as_i64() else {
                return Some(format!("{} must be an integer", name));
            };
            let (min, max) = integer_range(&field.sql_type);
            if n < min || n > max {
                return Some(format!("{} must be between {} and {}", name, min, max));
            }
        }
        SemanticType::Float => {
            if !v.is_number() && !v.as_str().is_some_and(is_float_special) {
                return Some(format!("{} must be a number", name));
            }
        }
        SemanticType::Decimal => {
            let ok = v.is_number() || v.as_str().is_some_and(is_decimal_literal);
            if !ok {
                return Some(format!("{} must be a decimal number", name));
            }
        }
        SemanticType::Boolean => {
            if !v.is_boolean() {
                return Some(format!("{} must be a boolean", name));
            }
        }
        SemanticType::String => {
            let Some(s) = v.as_str() else {
                return Some(format!("{} must be a string", name));
            };
            if let Some(max) = field.max_length {
                if s.chars().count() > max.max(0) as usize {
                    return Some(format!("{} must be at most {} characters", name, max));
                }
            }
            if !field.enum_labels.is_empty() && !field.enum_labels.iter().any(|l| l == s) {
                return Some(format!("{} must be one of: {}", name, field.enum_labels.join(", ")));
            }
        }
        SemanticType::Uuid => {
            if !v.as_str().is_some_and(|s| uuid::Uuid::parse_str(s).is_ok()) {
                return Some(format!("{} must be a valid UUID", name));
            }
        }
        SemanticType::Date => {
            let ok = v
                .as_str()
                .is_some_and(|s| is_infinity(s) || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok());
            if !ok {
                return Some(format!("{} must be a date (YYYY-MM-DD)", name));
            }
        }
        SemanticType::Time => {
            if !v.as_str().is_some_and(is_time_literal) {
                return Some(format!("{} must be a time (HH:MM:SS)", name));
            }
        }
        SemanticType::DateTime => {
            if !v.as_str().is_some_and(|s| is_infinity(s) || is_datetime_literal(s)) {
                return Some(format!("{} must be an RFC 3339 date-time", name));
            }
        }
        SemanticType::Binary => {
            if !v.as_str().is_some_and(is_base64) {
                return Some(format!("{} must be base64-encoded", name));
            }
        }
        SemanticType::Json => {}
    }
    None
}

fn integer_range(sql_type: &str) -> (i64, i64) {
    match sql_type {
        "smallint" => (i16::MIN as i64, i16::MAX as i64),
        "integer" => (i32::MIN as i64, i32::MAX as i64),
        _ => (i64::MIN, i64::MAX),
    }
}

/// Non-finite float8 literals, spelled as PostgreSQL prints them.
fn is_float_special(s: &str) -> bool {
    matches!(s, "NaN" | "Infinity" | "-Infinity")
}

fn is_infinity(s: &str) -> bool {
    matches!(s, "infinity" | "-infinity")
}

fn is_decimal_literal(s: &str) -> bool {
    let t = s.trim();
    !t.is_empty() && t.parse::<f64>().is_ok_and(f64::is_finite)
}

fn is_time_literal(s: &str) -> bool {
    let t = s.strip_suffix('Z').unwrap_or(s);
    // Drop a trailing UTC offset (time with time zone).
    let t = match t.rfind(['+', '-']) {
        Some(i) if i >= 5 => &t[..i],
        _ => t,
    };
    ["%H:%M:%S%.f", "%H:%M"]
        .iter()
        .any(|f| NaiveTime::parse_from_str(t, f).is_ok())
}

fn is_datetime_literal(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .any(|f| NaiveDateTime::parse_from_str(s, f).is_ok())
}

fn is_base64(s: &str) -> bool {
    let body = s.trim_end_matches('=');
    s.len() % 4 == 0
        && s.len() - body.len() <= 2
        && body.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogSnapshot, ColumnDescriptor, TableDescriptor};
    use crate::model::{resolve, ResolveOptions, ResolvedModel};
    use serde_json::json;

    fn model() -> ResolvedModel {
        let products = TableDescriptor::new(
            "public",
            "products",
            vec![
                ColumnDescriptor::new("id", "integer")
                    .not_null()
                    .with_default("nextval('products_id_seq'::regclass)"),
                ColumnDescriptor::new("sku", "character varying").not_null().with_max_length(8),
                ColumnDescriptor::new("qty", "smallint").not_null().with_default("0"),
                ColumnDescriptor::new("price", "numeric"),
                ColumnDescriptor::new("status", "USER-DEFINED").with_enum("public", "product_status", &["draft", "live"]),
                ColumnDescriptor::new("released_on", "date"),
                ColumnDescriptor::new("photo", "bytea"),
                ColumnDescriptor::new("weight", "double precision"),
                ColumnDescriptor::new("search", "text").generated(),
            ],
        )
        .with_primary_key(&["id"]);
        resolve(&CatalogSnapshot::new(vec![products]), &ResolveOptions::default()).unwrap()
    }

    fn message(err: AppError) -> String {
        match err {
            AppError::Validation(m) => m,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_create_body_passes() {
        let model = model();
        let e = model.entity_by_path("products").unwrap();
        let body = json!({
            "sku": "AB-1",
            "price": "12.50",
            "status": "live",
            "released_on": "2024-02-29",
            "photo": "aGVsbG8="
        });
        let out = RequestValidator::validate(e, &e.schemas.create, &body).unwrap();
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn reports_every_problem() {
        let model = model();
        let e = model.entity_by_path("products").unwrap();
        let body = json!({
            "qty": 70000,
            "status": "archived",
            "search": "x",
            "colour": "red"
        });
        let msg = message(RequestValidator::validate(e, &e.schemas.create, &body).unwrap_err());
        assert!(msg.contains("qty must be between -32768 and 32767"));
        assert!(msg.contains("status must be one of: draft, live"));
        assert!(msg.contains("search is read-only"));
        assert!(msg.contains("unknown field colour"));
        assert!(msg.contains("sku is required"));
    }

    #[test]
    fn max_length_counts_characters() {
        let model = model();
        let e = model.entity_by_path("products").unwrap();
        assert!(RequestValidator::validate(e, &e.schemas.create, &json!({"sku": "ÄÖÜÄÖÜÄÖ"})).is_ok());
        assert!(RequestValidator::validate(e, &e.schemas.create, &json!({"sku": "ABCDEFGHI"})).is_err());
    }

    #[test]
    fn keys_cannot_be_changed_by_patch() {
        let model = model();
        let e = model.entity_by_path("products").unwrap();
        let msg = message(RequestValidator::validate(e, &e.schemas.patch, &json!({"id": 5})).unwrap_err());
        assert!(msg.contains("id is a key column"));
        assert!(RequestValidator::validate(e, &e.schemas.patch, &json!({})).is_ok());
    }

    #[test]
    fn null_is_rejected_for_not_null_columns() {
        let model = model();
        let e = model.entity_by_path("products").unwrap();
        let msg = message(RequestValidator::validate(e, &e.schemas.patch, &json!({"sku": null})).unwrap_err());
        assert_eq!(msg, "sku must not be null");
        assert!(RequestValidator::validate(e, &e.schemas.patch, &json!({"price": null})).is_ok());
    }

    #[test]
    fn non_object_body_is_rejected() {
        let model = model();
        let e = model.entity_by_path("products").unwrap();
        assert!(RequestValidator::validate(e, &e.schemas.create, &json!([1, 2])).is_err());
    }

    #[test]
    fn text_parsing_follows_semantic_type() {
        let model = model();
        let e = model.entity_by_path("products").unwrap();
        let read = &e.schemas.read;
        assert_eq!(parse_text(read.field("id").unwrap(), "42"), Ok(json!(42)));
        assert!(parse_text(read.field("id").unwrap(), "abc").is_err());
        assert!(parse_text(read.field("released_on").unwrap(), "2024-13-01").is_err());
        assert_eq!(parse_text(read.field("status").unwrap(), "draft"), Ok(json!("draft")));
    }

    #[test]
    fn infinities_are_accepted_where_postgres_stores_them() {
        let model = model();
        let e = model.entity_by_path("products").unwrap();
        let read = &e.schemas.read;
        assert_eq!(parse_text(read.field("released_on").unwrap(), "infinity"), Ok(json!("infinity")));
        assert_eq!(parse_text(read.field("weight").unwrap(), "NaN"), Ok(json!("NaN")));
        assert!(parse_text(read.field("weight").unwrap(), "nan").is_err());
        let body = json!({"sku": "AB-1", "released_on": "-infinity", "weight": "-Infinity"});
        assert!(RequestValidator::validate(e, &e.schemas.create, &body).is_ok());
        let msg = message(RequestValidator::validate(e, &e.schemas.patch, &json!({"weight": "heavy"})).unwrap_err());
        assert_eq!(msg, "weight must be a number");
    }

    #[test]
    fn literal_formats() {
        assert!(is_time_literal("13:45:00"));
        assert!(is_time_literal("13:45:00.25+02:00"));
        assert!(!is_time_literal("25:00:00"));
        assert!(is_datetime_literal("2024-05-01T10:00:00Z"));
        assert!(is_datetime_literal("2024-05-01 10:00:00"));
        assert!(!is_datetime_literal("yesterday"));
        assert!(is_base64(""));
        assert!(!is_base64("abc"));
        assert!(is_decimal_literal("-0.001"));
        assert!(!is_decimal_literal("twelve"));
    }
}
