//! Builds parameterized SELECT, COUNT, INSERT, UPDATE, DELETE from a resolved entity.

use crate::model::{ColumnSpec, ResolvedEntity, SemanticType};
use crate::sql::params::PgBindValue;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from the catalog).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(entity: &ResolvedEntity) -> String {
    format!("{}.{}", quoted(&entity.table.schema), quoted(&entity.table.name))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: PgBindValue) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Bind `value` for `col` and return its placeholder expression.
    fn placeholder(&mut self, col: &ColumnSpec, value: &Value) -> String {
        let n = self.push_param(PgBindValue::for_column(value, col.semantic));
        match col.semantic {
            SemanticType::Binary => format!("decode(${}, 'base64')", n),
            _ => format!("${}::{}", n, col.bind_type),
        }
    }
}

/// Select expression for one column: normalized so every semantic type decodes to one Rust type.
/// Dates and timestamps come back as text; `infinity` and `-infinity` pass through unchanged.
fn select_expr(col: &ColumnSpec) -> String {
    let q = quoted(&col.name);
    let expr = match col.semantic {
        SemanticType::Integer => format!("{}::int8", q),
        SemanticType::Float => format!("{}::float8", q),
        SemanticType::Decimal | SemanticType::String | SemanticType::Time => format!("{}::text", q),
        SemanticType::Binary => format!("translate(encode({}, 'base64'), E'\\n', '')", q),
        SemanticType::Date => finite_or_text(&q, format!("to_char({}::timestamp, 'YYYY-MM-DD')", q)),
        SemanticType::DateTime if col.sql_type == "timestamp with time zone" => finite_or_text(
            &q,
            format!("to_char({} AT TIME ZONE 'UTC', 'YYYY-MM-DD\"T\"HH24:MI:SS.US\"Z\"')", q),
        ),
        SemanticType::DateTime => finite_or_text(&q, format!("to_char({}, 'YYYY-MM-DD\"T\"HH24:MI:SS.US')", q)),
        SemanticType::Boolean | SemanticType::Uuid | SemanticType::Json => return q,
    };
    format!("{} AS {}", expr, q)
}

fn finite_or_text(column: &str, formatted: String) -> String {
    format!("CASE WHEN isfinite({c}) THEN {f} ELSE {c}::text END", c = column, f = formatted)
}

/// SELECT list, in column order. Row decoding relies on this order.
fn select_column_list(entity: &ResolvedEntity) -> String {
    entity
        .columns
        .iter()
        .map(select_expr)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `"a" = $1::integer AND "b" = $2::integer`; key values are in key-column order.
fn key_predicate(q: &mut QueryBuf, entity: &ResolvedEntity, key: &[Value]) -> String {
    entity
        .key_specs()
        .into_iter()
        .zip(key)
        .map(|(col, v)| {
            let ph = q.placeholder(col, v);
            format!("{} = {}", quoted(&col.name), ph)
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn live_predicate(soft_delete: Option<&str>) -> Option<String> {
    soft_delete.map(|c| format!("{} IS NULL", quoted(c)))
}

/// WHERE clause from equality filters (columns not in the entity are skipped) plus the soft-delete guard.
fn filter_clause(q: &mut QueryBuf, entity: &ResolvedEntity, filters: &[(String, Value)], soft_delete: Option<&str>) -> String {
    let mut where_parts = Vec::new();
    for (name, val) in filters {
        let Some(col) = entity.column(name) else { continue };
        if val.is_null() {
            where_parts.push(format!("{} IS NULL", quoted(name)));
        } else {
            let ph = q.placeholder(col, val);
            where_parts.push(format!("{} = {}", quoted(name), ph));
        }
    }
    where_parts.extend(live_predicate(soft_delete));
    if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    }
}

fn order_clause(entity: &ResolvedEntity) -> String {
    let columns: Vec<String> = entity.order_columns().into_iter().map(quoted).collect();
    format!(" ORDER BY {}", columns.join(", "))
}

/// SELECT page with equality filters, ORDER BY key columns (plus tie-breakers for a non-unique key), LIMIT/OFFSET.
pub fn select_list(
    entity: &ResolvedEntity,
    filters: &[(String, Value)],
    limit: u32,
    offset: u32,
    soft_delete: Option<&str>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = filter_clause(&mut q, entity, filters, soft_delete);
    q.sql = format!(
        "SELECT {} FROM {}{}{} LIMIT {} OFFSET {}",
        select_column_list(entity),
        qualified_table(entity),
        where_clause,
        order_clause(entity),
        limit,
        offset
    );
    q
}

/// COUNT(*) over the same filters as [`select_list`].
pub fn count(entity: &ResolvedEntity, filters: &[(String, Value)], soft_delete: Option<&str>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = filter_clause(&mut q, entity, filters, soft_delete);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", qualified_table(entity), where_clause);
    q
}

/// SELECT one row by key.
pub fn select_by_key(entity: &ResolvedEntity, key: &[Value], soft_delete: Option<&str>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut preds = vec![key_predicate(&mut q, entity, key)];
    preds.extend(live_predicate(soft_delete));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {}",
        select_column_list(entity),
        qualified_table(entity),
        preds.join(" AND ")
    );
    q
}

/// INSERT the writable columns present in `body`; omitted columns take their database default.
pub fn insert(entity: &ResolvedEntity, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &entity.columns {
        if !c.writable {
            continue;
        }
        let Some(val) = body.get(&c.name) else { continue };
        placeholders.push(q.placeholder(c, val));
        cols.push(quoted(&c.name));
    }
    let returning = select_column_list(entity);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", qualified_table(entity), returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            qualified_table(entity),
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by key: SET only writable, non-key columns present in `body`.
/// With nothing to set, degrades to a SELECT by key so the caller still gets the row (or None).
pub fn update(entity: &ResolvedEntity, key: &[Value], body: &Map<String, Value>, soft_delete: Option<&str>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in &entity.columns {
        if c.is_key || !c.writable {
            continue;
        }
        let Some(val) = body.get(&c.name) else { continue };
        let rhs = q.placeholder(c, val);
        sets.push(format!("{} = {}", quoted(&c.name), rhs));
    }
    if sets.is_empty() {
        return select_by_key(entity, key, soft_delete);
    }
    let mut preds = vec![key_predicate(&mut q, entity, key)];
    preds.extend(live_predicate(soft_delete));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} RETURNING {}",
        qualified_table(entity),
        sets.join(", "),
        preds.join(" AND "),
        select_column_list(entity)
    );
    q
}

/// DELETE by key. With a soft-delete column, stamps it instead and skips rows already stamped.
pub fn delete(entity: &ResolvedEntity, key: &[Value], soft_delete: Option<&str>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(entity);
    let key_pred = key_predicate(&mut q, entity, key);
    let returning = select_column_list(entity);
    q.sql = match soft_delete {
        Some(col) => format!(
            "UPDATE {} SET {} = NOW() WHERE {} AND {} IS NULL RETURNING {}",
            table,
            quoted(col),
            key_pred,
            quoted(col),
            returning
        ),
        None => format!("DELETE FROM {} WHERE {} RETURNING {}", table, key_pred, returning),
    };
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogSnapshot, ColumnDescriptor, TableDescriptor};
    use crate::model::{resolve, ResolveOptions, ResolvedModel};
    use serde_json::json;

    fn model() -> ResolvedModel {
        let orders = TableDescriptor::new(
            "public",
            "orders",
            vec![
                ColumnDescriptor::new("id", "integer")
                    .not_null()
                    .with_default("nextval('orders_id_seq'::regclass)"),
                ColumnDescriptor::new("customer_id", "integer").not_null(),
                ColumnDescriptor::new("total", "numeric").not_null(),
                ColumnDescriptor::new("placed_at", "timestamp with time zone").with_default("now()"),
                ColumnDescriptor::new("deleted_at", "timestamp with time zone"),
            ],
        )
        .with_primary_key(&["id"]);
        let lines = TableDescriptor::new(
            "public",
            "order_lines",
            vec![
                ColumnDescriptor::new("order_id", "integer").not_null(),
                ColumnDescriptor::new("line_no", "smallint").not_null(),
                ColumnDescriptor::new("attachment", "bytea"),
            ],
        )
        .with_primary_key(&["order_id", "line_no"]);
        resolve(&CatalogSnapshot::new(vec![orders, lines]), &ResolveOptions::default()).unwrap()
    }

    #[test]
    fn list_filters_orders_by_key_and_pages() {
        let model = model();
        let orders = model.entity_by_path("orders").unwrap();
        let q = select_list(orders, &[("customer_id".into(), json!(7))], 10, 20, None);
        assert!(q.sql.starts_with(
            "SELECT \"id\"::int8 AS \"id\", \"customer_id\"::int8 AS \"customer_id\", \"total\"::text AS \"total\", "
        ));
        assert!(q.sql.ends_with(
            " FROM \"public\".\"orders\" WHERE \"customer_id\" = $1::integer ORDER BY \"id\" LIMIT 10 OFFSET 20"
        ));
        assert_eq!(q.params, vec![PgBindValue::I64(7)]);
    }

    #[test]
    fn timestamps_are_selected_as_text_so_infinity_survives() {
        let model = model();
        let orders = model.entity_by_path("orders").unwrap();
        let q = select_by_key(orders, &[json!(1)], None);
        assert!(q.sql.contains(
            "CASE WHEN isfinite(\"placed_at\") THEN to_char(\"placed_at\" AT TIME ZONE 'UTC', \
             'YYYY-MM-DD\"T\"HH24:MI:SS.US\"Z\"') ELSE \"placed_at\"::text END AS \"placed_at\""
        ));
    }

    #[test]
    fn keyless_tables_page_with_tie_breakers() {
        let events = TableDescriptor::new(
            "public",
            "events",
            vec![ColumnDescriptor::new("kind", "text"), ColumnDescriptor::new("note", "text")],
        );
        let model = resolve(&CatalogSnapshot::new(vec![events]), &ResolveOptions::default()).unwrap();
        let q = select_list(model.entity_by_path("events").unwrap(), &[], 10, 0, None);
        assert!(q.sql.ends_with("ORDER BY \"kind\", \"note\" LIMIT 10 OFFSET 0"));
    }

    #[test]
    fn count_shares_filters_and_soft_delete_guard() {
        let model = model();
        let orders = model.entity_by_path("orders").unwrap();
        let q = count(orders, &[("customer_id".into(), json!(7))], Some("deleted_at"));
        assert_eq!(
            q.sql,
            "SELECT COUNT(*) FROM \"public\".\"orders\" WHERE \"customer_id\" = $1::integer AND \"deleted_at\" IS NULL"
        );
    }

    #[test]
    fn insert_only_names_supplied_columns() {
        let model = model();
        let orders = model.entity_by_path("orders").unwrap();
        let mut body = Map::new();
        body.insert("customer_id".into(), json!(3));
        body.insert("total".into(), json!("19.99"));
        let q = insert(orders, &body);
        assert!(q.sql.starts_with(
            "INSERT INTO \"public\".\"orders\" (\"customer_id\", \"total\") VALUES ($1::integer, $2::numeric) RETURNING "
        ));
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn insert_without_columns_uses_defaults() {
        let model = model();
        let orders = model.entity_by_path("orders").unwrap();
        let q = insert(orders, &Map::new());
        assert!(q.sql.starts_with("INSERT INTO \"public\".\"orders\" DEFAULT VALUES RETURNING"));
    }

    #[test]
    fn update_skips_key_columns_and_binds_key_last() {
        let model = model();
        let orders = model.entity_by_path("orders").unwrap();
        let mut body = Map::new();
        body.insert("id".into(), json!(99));
        body.insert("total".into(), json!("5.00"));
        let q = update(orders, &[json!(1)], &body, None);
        assert!(q.sql.starts_with("UPDATE \"public\".\"orders\" SET \"total\" = $1::numeric WHERE \"id\" = $2::integer RETURNING"));
        assert_eq!(q.params, vec![PgBindValue::String("5.00".into()), PgBindValue::I64(1)]);
    }

    #[test]
    fn empty_update_selects_the_row() {
        let model = model();
        let orders = model.entity_by_path("orders").unwrap();
        let q = update(orders, &[json!(1)], &Map::new(), None);
        assert!(q.sql.starts_with("SELECT "));
        assert!(q.sql.ends_with("WHERE \"id\" = $1::integer"));
    }

    #[test]
    fn composite_keys_match_every_part() {
        let model = model();
        let lines = model.entity_by_path("order_lines").unwrap();
        let q = select_by_key(lines, &[json!(4), json!(2)], None);
        assert!(q.sql.ends_with("WHERE \"order_id\" = $1::integer AND \"line_no\" = $2::smallint"));
        assert!(q.sql.contains("translate(encode(\"attachment\", 'base64'), E'\\n', '') AS \"attachment\""));
        assert!(!q.sql.contains("ORDER BY"));
        let list = select_list(lines, &[], 5, 0, None);
        assert!(list.sql.contains("ORDER BY \"order_id\", \"line_no\""));
    }

    #[test]
    fn binary_values_are_decoded_from_base64() {
        let model = model();
        let lines = model.entity_by_path("order_lines").unwrap();
        let mut body = Map::new();
        body.insert("order_id".into(), json!(1));
        body.insert("line_no".into(), json!(1));
        body.insert("attachment".into(), json!("aGVsbG8="));
        let q = insert(lines, &body);
        assert!(q.sql.contains("decode($3, 'base64')"));
    }

    #[test]
    fn soft_delete_stamps_instead_of_deleting() {
        let model = model();
        let orders = model.entity_by_path("orders").unwrap();
        let hard = delete(orders, &[json!(1)], None);
        assert!(hard.sql.starts_with("DELETE FROM \"public\".\"orders\" WHERE \"id\" = $1::integer RETURNING"));
        let soft = delete(orders, &[json!(1)], Some("deleted_at"));
        assert!(soft.sql.starts_with(
            "UPDATE \"public\".\"orders\" SET \"deleted_at\" = NOW() WHERE \"id\" = $1::integer AND \"deleted_at\" IS NULL RETURNING"
        ));
    }
}
