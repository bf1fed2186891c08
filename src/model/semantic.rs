//! Fixed mapping from PostgreSQL column types to the semantic types used for validation, SQL shaping and docs.

use crate::catalog::ColumnDescriptor;
use crate::error::CatalogError;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    String,
    Integer,
    Float,
    /// Arbitrary precision; carried as a JSON string.
    Decimal,
    Boolean,
    Date,
    Time,
    DateTime,
    Uuid,
    /// Base64 text on the wire.
    Binary,
    Json,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::String => "string",
            SemanticType::Integer => "integer",
            SemanticType::Float => "float",
            SemanticType::Decimal => "decimal",
            SemanticType::Boolean => "boolean",
            SemanticType::Date => "date",
            SemanticType::Time => "time",
            SemanticType::DateTime => "datetime",
            SemanticType::Uuid => "uuid",
            SemanticType::Binary => "binary",
            SemanticType::Json => "json",
        }
    }
}

/// Semantic type for a column, or None when the source type is not in the mapping table.
pub fn semantic_type_of(column: &ColumnDescriptor) -> Option<SemanticType> {
    let ty = match column.sql_type.as_str() {
        "smallint" | "integer" | "bigint" => SemanticType::Integer,
        "real" | "double precision" => SemanticType::Float,
        "numeric" => SemanticType::Decimal,
        "boolean" => SemanticType::Boolean,
        "character varying" | "character" | "text" | "name" => SemanticType::String,
        "uuid" => SemanticType::Uuid,
        "date" => SemanticType::Date,
        "time without time zone" | "time with time zone" => SemanticType::Time,
        "timestamp without time zone" | "timestamp with time zone" => SemanticType::DateTime,
        "bytea" => SemanticType::Binary,
        "json" | "jsonb" => SemanticType::Json,
        "USER-DEFINED" if column.is_enum() => SemanticType::String,
        "USER-DEFINED" if column.udt_name == "citext" => SemanticType::String,
        _ => return None,
    };
    Some(ty)
}

/// Same as [`semantic_type_of`], failing with an UnsupportedType error naming the table and column.
pub fn map_column(table: &str, column: &ColumnDescriptor) -> Result<SemanticType, CatalogError> {
    semantic_type_of(column).ok_or_else(|| CatalogError::UnsupportedType {
        table: table.to_string(),
        column: column.name.clone(),
        sql_type: if column.sql_type == "USER-DEFINED" {
            format!("{}.{}", column.udt_schema, column.udt_name)
        } else {
            column.sql_type.clone()
        },
    })
}

/// Type used to cast a bound parameter (`$n::<type>`) so text/number parameters coerce to the column type.
pub fn bind_cast(column: &ColumnDescriptor, semantic: SemanticType) -> String {
    match semantic {
        // Enums and citext keep their own type, so comparisons use that type's equality.
        SemanticType::String if column.sql_type == "USER-DEFINED" => {
            format!("{}.{}", quote_ident(&column.udt_schema), quote_ident(&column.udt_name))
        }
        SemanticType::String => "text".into(),
        SemanticType::Integer
        | SemanticType::Float
        | SemanticType::Date
        | SemanticType::Time
        | SemanticType::DateTime
        | SemanticType::Json => column.sql_type.clone(),
        SemanticType::Decimal => "numeric".into(),
        SemanticType::Boolean => "boolean".into(),
        SemanticType::Uuid => "uuid".into(),
        SemanticType::Binary => "bytea".into(),
    }
}

fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_documented_type() {
        let cases = [
            ("smallint", SemanticType::Integer),
            ("integer", SemanticType::Integer),
            ("bigint", SemanticType::Integer),
            ("real", SemanticType::Float),
            ("double precision", SemanticType::Float),
            ("numeric", SemanticType::Decimal),
            ("boolean", SemanticType::Boolean),
            ("character varying", SemanticType::String),
            ("character", SemanticType::String),
            ("text", SemanticType::String),
            ("uuid", SemanticType::Uuid),
            ("date", SemanticType::Date),
            ("time without time zone", SemanticType::Time),
            ("timestamp with time zone", SemanticType::DateTime),
            ("timestamp without time zone", SemanticType::DateTime),
            ("bytea", SemanticType::Binary),
            ("jsonb", SemanticType::Json),
        ];
        for (sql, expected) in cases {
            let col = ColumnDescriptor::new("c", sql);
            assert_eq!(semantic_type_of(&col), Some(expected), "{}", sql);
        }
    }

    #[test]
    fn enums_map_to_string_and_cast_to_their_type() {
        let col = ColumnDescriptor::new("status", "text").with_enum("sales", "order_status", &["open", "closed"]);
        assert_eq!(semantic_type_of(&col), Some(SemanticType::String));
        assert_eq!(bind_cast(&col, SemanticType::String), "\"sales\".\"order_status\"");
    }

    #[test]
    fn unknown_types_are_rejected_with_context() {
        let col = ColumnDescriptor::new("area", "polygon");
        let err = map_column("public.shapes", &col).unwrap_err();
        match err {
            CatalogError::UnsupportedType { table, column, sql_type } => {
                assert_eq!(table, "public.shapes");
                assert_eq!(column, "area");
                assert_eq!(sql_type, "polygon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn arrays_and_non_enum_user_types_are_unsupported() {
        assert!(semantic_type_of(&ColumnDescriptor::new("tags", "ARRAY")).is_none());
        let mut geom = ColumnDescriptor::new("geom", "USER-DEFINED");
        geom.udt_schema = "public".into();
        geom.udt_name = "geometry".into();
        assert!(semantic_type_of(&geom).is_none());
        assert!(map_column("public.places", &geom)
            .unwrap_err()
            .to_string()
            .contains("public.geometry"));
    }

    #[test]
    fn citext_binds_as_citext() {
        let mut col = ColumnDescriptor::new("email", "USER-DEFINED");
        col.udt_schema = "public".into();
        col.udt_name = "citext".into();
        assert_eq!(semantic_type_of(&col), Some(SemanticType::String));
        assert_eq!(bind_cast(&col, SemanticType::String), "\"public\".\"citext\"");
    }

    #[test]
    fn strings_bind_as_text_regardless_of_length_modifier() {
        let col = ColumnDescriptor::new("code", "character").with_max_length(3);
        assert_eq!(bind_cast(&col, SemanticType::String), "text");
    }
}
