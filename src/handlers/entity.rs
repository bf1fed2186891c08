//! Entity CRUD handlers: list, create, read, replace, patch, delete.
//! One set of handlers serves every table; the entity is looked up by path segment.

use crate::error::AppError;
use crate::extractors::RequestContext;
use crate::model::{GeneratedSchema, Operation, ResolvedEntity, SchemaKind};
use crate::response::{PageBody, PageMeta};
use crate::service::{parse_text, CrudService, RequestValidator};
use crate::state::{AppState, Paging};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;

/// Resolve the entity, then check the operation is mounted and the hook lets it through.
async fn entity_for<'a>(
    state: &'a AppState,
    path_segment: &str,
    operation: Operation,
    ctx: &RequestContext,
) -> Result<&'a ResolvedEntity, AppError> {
    let entity = state
        .model
        .entity_by_path(path_segment)
        .ok_or_else(|| AppError::NotFound(format!("no table at /{}", path_segment)))?;
    if !entity.allows(operation) {
        return Err(AppError::OperationNotAllowed(format!(
            "{} is not allowed on {}",
            operation.as_str(),
            path_segment
        )));
    }
    state.hook.authorize(ctx, operation, &entity.table).await?;
    Ok(entity)
}

/// Split a path key into typed values in key-column order. Composite keys are comma-separated.
pub fn parse_key(entity: &ResolvedEntity, raw: &str) -> Result<Vec<Value>, AppError> {
    let parts: Vec<&str> = if entity.key_columns.len() == 1 {
        vec![raw]
    } else {
        raw.split(',').collect()
    };
    if parts.len() != entity.key_columns.len() {
        return Err(AppError::BadRequest(format!(
            "key must have {} comma-separated parts ({})",
            entity.key_columns.len(),
            entity.key_columns.join(", ")
        )));
    }
    entity
        .key_columns
        .iter()
        .zip(parts)
        .map(|(name, part)| {
            let field = entity
                .schemas
                .read
                .field(name)
                .ok_or_else(|| AppError::BadRequest(format!("unknown key column {}", name)))?;
            parse_text(field, part).map_err(|e| AppError::BadRequest(format!("invalid key: {}", e)))
        })
        .collect()
}

/// Parsed list query: page window plus equality filters.
#[derive(Debug, PartialEq)]
pub struct ListParams {
    pub limit: u32,
    pub offset: u32,
    pub filters: Vec<(String, Value)>,
}

fn parse_count(name: &str, raw: &str) -> Result<u32, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("{} must be a non-negative integer", name)))
}

/// `limit`/`offset`, or `page` (1-based) with `size`. Every other parameter must name a filterable column.
/// A column named like a paging parameter is filtered on, and that paging name is unavailable.
pub fn parse_list_params(
    entity: &ResolvedEntity,
    params: &[(String, String)],
    paging: Paging,
) -> Result<ListParams, AppError> {
    let mut limit = None;
    let mut offset = None;
    let mut page = None;
    let mut size = None;
    let mut filters = Vec::new();
    let paging_names = entity.paging_params();

    for (k, v) in params {
        if paging_names.contains(&k.as_str()) {
            let n = parse_count(k, v)?;
            match k.as_str() {
                "limit" => limit = Some(n),
                "offset" => offset = Some(n),
                "page" => page = Some(n),
                _ => size = Some(n),
            }
            continue;
        }
        let field = entity
            .column(k)
            .filter(|c| c.is_filterable())
            .and_then(|_| entity.schemas.read.field(k))
            .ok_or_else(|| AppError::BadRequest(format!("unknown query parameter {}", k)))?;
        let val = parse_text(field, v).map_err(|e| AppError::BadRequest(format!("invalid filter: {}", e)))?;
        filters.push((k.clone(), val));
    }

    if limit.is_some() && size.is_some() {
        return Err(AppError::BadRequest("use either limit or size, not both".into()));
    }
    if offset.is_some() && page.is_some() {
        return Err(AppError::BadRequest("use either offset or page, not both".into()));
    }
    let limit = limit.or(size).unwrap_or(paging.default_limit);
    if limit == 0 {
        return Err(AppError::BadRequest("limit must be at least 1".into()));
    }
    let limit = limit.min(paging.max_limit);
    let offset = match page {
        Some(0) => return Err(AppError::BadRequest("page starts at 1".into())),
        Some(p) => (p - 1)
            .checked_mul(limit)
            .ok_or_else(|| AppError::BadRequest("page out of range".into()))?,
        None => offset.unwrap_or(0),
    };
    Ok(ListParams { limit, offset, filters })
}

/// Unreadable JSON is a 400; a body cut off by the size limit is a 413.
fn body_or_bad_request(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    body.map(|Json(v)| v).map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(e.body_text())
        } else {
            AppError::BadRequest(e.body_text())
        }
    })
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    ctx: RequestContext,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::List, &ctx).await?;
    let params = parse_list_params(entity, &params, state.paging)?;
    let soft = state.soft_delete_column(entity);
    let page = CrudService::list(
        &state.pool,
        entity,
        &params.filters,
        params.limit,
        params.offset,
        soft,
    )
    .await?;
    let meta = PageMeta::new(page.total, page.rows.len(), params.limit, params.offset);
    Ok(Json(PageBody { data: page.rows, meta }))
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    ctx: RequestContext,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Create, &ctx).await?;
    let body = body_or_bad_request(body)?;
    let body = RequestValidator::validate(entity, &entity.schemas.create, &body)?;
    let row = CrudService::create(&state.pool, entity, &body).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, key)): Path<(String, String)>,
    ctx: RequestContext,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Get, &ctx).await?;
    let key_values = parse_key(entity, &key)?;
    let soft = state.soft_delete_column(entity);
    let row = CrudService::read(&state.pool, entity, &key_values, soft)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{}/{}", path_segment, key)))?;
    Ok(Json(row))
}

async fn update_with(
    state: AppState,
    path_segment: String,
    key: String,
    ctx: RequestContext,
    body: Result<Json<Value>, JsonRejection>,
    kind: SchemaKind,
) -> Result<Json<Value>, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Update, &ctx).await?;
    let key_values = parse_key(entity, &key)?;
    let body = body_or_bad_request(body)?;
    let schema: &GeneratedSchema = match kind {
        SchemaKind::Replace => &entity.schemas.replace,
        _ => &entity.schemas.patch,
    };
    let body = RequestValidator::validate(entity, schema, &body)?;
    let soft = state.soft_delete_column(entity);
    let row = CrudService::update(&state.pool, entity, &key_values, &body, soft)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{}/{}", path_segment, key)))?;
    Ok(Json(row))
}

/// PUT: full replacement; every required field must be present.
pub async fn replace(
    State(state): State<AppState>,
    Path((path_segment, key)): Path<(String, String)>,
    ctx: RequestContext,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    update_with(state, path_segment, key, ctx, body, SchemaKind::Replace).await
}

/// PATCH: only the supplied fields change.
pub async fn patch(
    State(state): State<AppState>,
    Path((path_segment, key)): Path<(String, String)>,
    ctx: RequestContext,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    update_with(state, path_segment, key, ctx, body, SchemaKind::Patch).await
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, key)): Path<(String, String)>,
    ctx: RequestContext,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Delete, &ctx).await?;
    let key_values = parse_key(entity, &key)?;
    let soft = state.soft_delete_column(entity);
    CrudService::delete(&state.pool, entity, &key_values, soft)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{}/{}", path_segment, key)))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogSnapshot, ColumnDescriptor, TableDescriptor};
    use crate::model::{resolve, ResolveOptions, ResolvedModel};
    use serde_json::json;

    fn model() -> ResolvedModel {
        let lines = TableDescriptor::new(
            "public",
            "order_lines",
            vec![
                ColumnDescriptor::new("order_id", "bigint").not_null(),
                ColumnDescriptor::new("line_no", "integer").not_null(),
                ColumnDescriptor::new("sku", "text").not_null(),
                ColumnDescriptor::new("extra", "json"),
            ],
        )
        .with_primary_key(&["order_id", "line_no"]);
        let tags = TableDescriptor::new(
            "public",
            "tags",
            vec![ColumnDescriptor::new("id", "uuid").not_null(), ColumnDescriptor::new("label", "text")],
        )
        .with_primary_key(&["id"]);
        resolve(&CatalogSnapshot::new(vec![lines, tags]), &ResolveOptions::default()).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn composite_key_parts_are_typed() {
        let model = model();
        let lines = model.entity_by_path("order_lines").unwrap();
        assert_eq!(parse_key(lines, "7,2").unwrap(), vec![json!(7), json!(2)]);
        assert!(matches!(parse_key(lines, "7"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_key(lines, "7,x"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn uuid_key_must_parse() {
        let model = model();
        let tags = model.entity_by_path("tags").unwrap();
        assert!(parse_key(tags, "67e55044-10b1-426f-9247-bb680e5fe0c8").is_ok());
        assert!(matches!(parse_key(tags, "not-a-uuid"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn list_defaults_and_clamps() {
        let model = model();
        let lines = model.entity_by_path("order_lines").unwrap();
        let p = parse_list_params(lines, &[], Paging::default()).unwrap();
        assert_eq!((p.limit, p.offset), (10, 0));
        let p = parse_list_params(lines, &params(&[("limit", "1000"), ("offset", "5")]), Paging::default()).unwrap();
        assert_eq!((p.limit, p.offset), (100, 5));
    }

    #[test]
    fn page_and_size_are_aliases() {
        let model = model();
        let lines = model.entity_by_path("order_lines").unwrap();
        let p = parse_list_params(lines, &params(&[("page", "3"), ("size", "20")]), Paging::default()).unwrap();
        assert_eq!((p.limit, p.offset), (20, 40));
        assert!(parse_list_params(lines, &params(&[("page", "0")]), Paging::default()).is_err());
        assert!(parse_list_params(lines, &params(&[("page", "2"), ("offset", "1")]), Paging::default()).is_err());
    }

    #[test]
    fn filters_must_name_filterable_columns() {
        let model = model();
        let lines = model.entity_by_path("order_lines").unwrap();
        let p = parse_list_params(lines, &params(&[("order_id", "7"), ("sku", "null")]), Paging::default()).unwrap();
        assert_eq!(
            p.filters,
            vec![("order_id".to_string(), json!(7)), ("sku".to_string(), json!("null"))]
        );
        for bad in [("colour", "red"), ("order_id", "seven"), ("extra", "{}"), ("limit", "-1")] {
            let err = parse_list_params(lines, &params(&[bad]), Paging::default()).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "{bad:?}");
        }
    }

    #[test]
    fn columns_named_like_paging_parameters_are_filters() {
        let shirts = TableDescriptor::new(
            "public",
            "shirts",
            vec![ColumnDescriptor::new("id", "integer").not_null(), ColumnDescriptor::new("size", "text")],
        )
        .with_primary_key(&["id"]);
        let model = resolve(&CatalogSnapshot::new(vec![shirts]), &ResolveOptions::default()).unwrap();
        let shirts = model.entity_by_path("shirts").unwrap();
        let p = parse_list_params(shirts, &params(&[("size", "L"), ("page", "2"), ("limit", "5")]), Paging::default())
            .unwrap();
        assert_eq!(p.filters, vec![("size".to_string(), json!("L"))]);
        assert_eq!((p.limit, p.offset), (5, 5));
    }
}
