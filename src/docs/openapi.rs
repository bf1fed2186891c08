//! OpenAPI 3.1 document built from the resolved model.

use crate::model::{FieldSpec, GeneratedRoute, GeneratedSchema, Operation, ResolvedEntity, ResolvedModel, SemanticType};
use std::collections::BTreeMap;
use utoipa::openapi::path::{HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn, PathItem, PathItemBuilder};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::schema::{ArrayBuilder, KnownFormat, ObjectBuilder, SchemaFormat, SchemaType, Type};
use utoipa::openapi::tag::TagBuilder;
use utoipa::openapi::{
    ComponentsBuilder, ContentBuilder, InfoBuilder, OpenApi, OpenApiBuilder, PathsBuilder, Ref, RefOr, Required,
    ResponseBuilder, Schema,
};

pub const ERROR_SCHEMA: &str = "ErrorBody";

/// Title, version and description shown at the top of the document.
#[derive(Clone, Debug)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

impl Default for ApiInfo {
    fn default() -> Self {
        ApiInfo {
            title: "autocrud".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            description: Some("CRUD API generated from the database catalog.".into()),
        }
    }
}

fn schema_ref(name: &str) -> RefOr<Schema> {
    RefOr::Ref(Ref::from_schema_name(name))
}

fn object(builder: ObjectBuilder) -> RefOr<Schema> {
    RefOr::T(Schema::Object(builder.build()))
}

fn primitive(ty: Type) -> ObjectBuilder {
    ObjectBuilder::new().schema_type(ty)
}

/// JSON type for a semantic type: (type, format).
fn json_type(field: &FieldSpec) -> (Type, Option<SchemaFormat>) {
    let known = |f| Some(SchemaFormat::KnownFormat(f));
    match field.semantic {
        SemanticType::Integer => (
            Type::Integer,
            if field.sql_type == "bigint" { known(KnownFormat::Int64) } else { known(KnownFormat::Int32) },
        ),
        SemanticType::Float => (Type::Number, known(KnownFormat::Double)),
        SemanticType::Decimal => (Type::String, Some(SchemaFormat::Custom("decimal".into()))),
        SemanticType::Boolean => (Type::Boolean, None),
        SemanticType::Date => (Type::String, known(KnownFormat::Date)),
        SemanticType::Time => (Type::String, Some(SchemaFormat::Custom("time".into()))),
        SemanticType::DateTime => (Type::String, known(KnownFormat::DateTime)),
        SemanticType::Uuid => (Type::String, known(KnownFormat::Uuid)),
        SemanticType::Binary => (Type::String, known(KnownFormat::Byte)),
        SemanticType::String | SemanticType::Json => (Type::String, None),
    }
}

/// Column type, plus the values a strict reading of the JSON type would not allow.
fn field_description(field: &FieldSpec) -> String {
    match field.semantic {
        SemanticType::Float => format!("{}; NaN, Infinity and -Infinity are sent as strings", field.sql_type),
        SemanticType::Date | SemanticType::DateTime => format!("{}; may be infinity or -infinity", field.sql_type),
        _ => field.sql_type.clone(),
    }
}

fn field_schema(field: &FieldSpec) -> RefOr<Schema> {
    let mut b = ObjectBuilder::new().description(Some(field_description(field)));
    if field.semantic == SemanticType::Json {
        b = b.schema_type(SchemaType::AnyValue);
    } else {
        let (ty, format) = json_type(field);
        b = if field.nullable {
            b.schema_type(SchemaType::Array(vec![ty, Type::Null]))
        } else {
            b.schema_type(ty)
        };
        b = b.format(format);
    }
    if let Some(max) = field.max_length.filter(|m| *m > 0) {
        b = b.max_length(Some(max as usize));
    }
    if !field.enum_labels.is_empty() {
        b = b.enum_values(Some(field.enum_labels.iter().cloned()));
    }
    object(b)
}

fn component_schema(schema: &GeneratedSchema, comment: Option<&str>) -> RefOr<Schema> {
    let mut b = ObjectBuilder::new().schema_type(Type::Object).description(comment.map(str::to_string));
    for field in &schema.fields {
        b = b.property(&field.name, field_schema(field));
        if field.required {
            b = b.required(&field.name);
        }
    }
    object(b)
}

fn page_schema(read_name: &str) -> RefOr<Schema> {
    let count = || primitive(Type::Integer).format(Some(SchemaFormat::KnownFormat(KnownFormat::Int64)));
    let meta = ObjectBuilder::new()
        .schema_type(Type::Object)
        .property("total", object(count()))
        .property("count", object(count()))
        .property("limit", object(count()))
        .property("offset", object(count()))
        .property(
            "next_offset",
            object(
                ObjectBuilder::new()
                    .schema_type(SchemaType::Array(vec![Type::Integer, Type::Null]))
                    .format(Some(SchemaFormat::KnownFormat(KnownFormat::Int64))),
            ),
        )
        .property("page", object(count()))
        .property("pages", object(count()))
        .required("total")
        .required("count")
        .required("limit")
        .required("offset")
        .required("next_offset")
        .required("page")
        .required("pages");
    let data = ArrayBuilder::new().items(schema_ref(read_name)).build();
    object(
        ObjectBuilder::new()
            .schema_type(Type::Object)
            .property("data", RefOr::T(Schema::Array(data)))
            .property("meta", object(meta))
            .required("data")
            .required("meta"),
    )
}

fn error_schema() -> RefOr<Schema> {
    let detail = ObjectBuilder::new()
        .schema_type(Type::Object)
        .property("code", object(primitive(Type::String)))
        .property("message", object(primitive(Type::String)))
        .property("details", object(ObjectBuilder::new().schema_type(SchemaType::AnyValue)))
        .required("code")
        .required("message");
    object(
        ObjectBuilder::new()
            .schema_type(Type::Object)
            .property("error", object(detail))
            .required("error"),
    )
}

fn http_method(method: &str) -> HttpMethod {
    match method {
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        _ => HttpMethod::Get,
    }
}

fn json_content(schema: RefOr<Schema>) -> utoipa::openapi::Content {
    ContentBuilder::new().schema(Some(schema)).build()
}

fn error_response(description: &str) -> utoipa::openapi::Response {
    ResponseBuilder::new()
        .description(description)
        .content("application/json", json_content(schema_ref(ERROR_SCHEMA)))
        .build()
}

fn operation_id(route: &GeneratedRoute, entity: &ResolvedEntity) -> String {
    let verb = match (route.operation, route.method) {
        (Operation::Update, "PATCH") => "patch",
        (Operation::Update, _) => "replace",
        (op, _) => op.as_str(),
    };
    format!("{}_{}", verb, entity.path_segment)
}

fn summary(route: &GeneratedRoute, entity: &ResolvedEntity) -> String {
    let table = entity.table.qualified_name();
    match (route.operation, route.method) {
        (Operation::List, _) => format!("List rows of {}", table),
        (Operation::Get, _) => format!("Get one row of {}", table),
        (Operation::Create, _) => format!("Create a row in {}", table),
        (Operation::Update, "PATCH") => format!("Partially update a row of {}", table),
        (Operation::Update, _) => format!("Replace a row of {}", table),
        (Operation::Delete, _) => format!("Delete a row of {}", table),
    }
}

fn list_parameters(entity: &ResolvedEntity) -> Vec<utoipa::openapi::path::Parameter> {
    let query = |name: &str, description: String, schema: RefOr<Schema>| {
        ParameterBuilder::new()
            .name(name)
            .parameter_in(ParameterIn::Query)
            .required(Required::False)
            .description(Some(description))
            .schema(Some(schema))
            .build()
    };
    let count = || object(primitive(Type::Integer));
    let mut params: Vec<_> = entity
        .paging_params()
        .into_iter()
        .map(|name| {
            let description = match name {
                "limit" => "Page size (default and maximum are configured).",
                "offset" => "Rows to skip.",
                "page" => "1-based page number; alternative to offset.",
                _ => "Alias of limit.",
            };
            query(name, description.into(), count())
        })
        .collect();
    for col in entity.columns.iter().filter(|c| c.is_filterable()) {
        if let Some(field) = entity.schemas.read.field(&col.name) {
            let (ty, format) = json_type(field);
            let schema = if field.semantic == SemanticType::Json {
                object(primitive(Type::String))
            } else {
                object(primitive(ty).format(format))
            };
            params.push(query(&col.name, format!("Equality filter on {}.", col.name), schema));
        }
    }
    params
}

fn key_parameter(entity: &ResolvedEntity) -> utoipa::openapi::path::Parameter {
    let description = if entity.key_columns.len() == 1 {
        format!("Value of {}.", entity.key_columns[0])
    } else {
        format!("Comma-separated values of {}.", entity.key_columns.join(", "))
    };
    ParameterBuilder::new()
        .name("key")
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .description(Some(description))
        .schema(Some(object(primitive(Type::String))))
        .build()
}

fn operation(route: &GeneratedRoute, entity: &ResolvedEntity) -> utoipa::openapi::path::Operation {
    let tag = entity.path_segment.clone();
    let mut op = OperationBuilder::new()
        .tag(tag)
        .operation_id(Some(operation_id(route, entity)))
        .summary(Some(summary(route, entity)));

    if route.operation == Operation::List {
        for p in list_parameters(entity) {
            op = op.parameter(p);
        }
    } else if route.path.ends_with("{key}") {
        op = op.parameter(key_parameter(entity));
    }

    if let Some(request) = &route.request_schema {
        op = op.request_body(Some(
            RequestBodyBuilder::new()
                .content("application/json", json_content(schema_ref(request)))
                .required(Some(Required::True))
                .build(),
        ));
    }

    let success = match route.operation {
        Operation::Create => "201",
        Operation::Delete => "204",
        _ => "200",
    };
    let mut ok = ResponseBuilder::new().description(match route.operation {
        Operation::Create => "Created row",
        Operation::Delete => "Row deleted",
        Operation::List => "One page of rows",
        _ => "Row",
    });
    if let Some(response) = &route.response_schema {
        ok = ok.content("application/json", json_content(schema_ref(response)));
    }
    op = op.response(success, ok.build());

    op = op.response("400", error_response("Malformed key, query parameter or body"));
    if route.path.ends_with("{key}") {
        op = op.response("404", error_response("No row with this key"));
    } else {
        op = op.response("404", error_response("Unknown table"));
    }
    if !entity.allows(route.operation) {
        op = op.response("405", error_response("Operation not allowed"));
    }
    if route.request_schema.is_some() {
        op = op.response("409", error_response("Unique or foreign-key conflict"));
        op = op.response("413", error_response("Body exceeds the size limit"));
        op = op.response("422", error_response("Body does not match the schema"));
    }
    op.response("500", error_response("Database error")).build()
}

/// Build the document: one path item per route path, one tag per table.
pub fn build_openapi(model: &ResolvedModel, info: &ApiInfo) -> OpenApi {
    let mut items: BTreeMap<String, PathItemBuilder> = BTreeMap::new();
    let mut components = ComponentsBuilder::new().schema(ERROR_SCHEMA, error_schema());
    let mut tags = Vec::with_capacity(model.entities.len());

    for entity in &model.entities {
        let comment = entity.table.comment.as_deref();
        for schema in entity.schemas.all() {
            components = components.schema(&schema.name, component_schema(schema, comment));
        }
        components = components.schema(
            format!("{}Page", entity.schemas.read.name),
            page_schema(&entity.schemas.read.name),
        );
        tags.push(
            TagBuilder::new()
                .name(&entity.path_segment)
                .description(Some(
                    comment
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("Table {}", entity.table.qualified_name())),
                ))
                .build(),
        );
        for route in &entity.routes {
            let item = items.remove(&route.path).unwrap_or_default();
            items.insert(
                route.path.clone(),
                item.operation(http_method(route.method), operation(route, entity)),
            );
        }
    }

    let mut paths = PathsBuilder::new();
    for (path, item) in items {
        let item: PathItem = item.build();
        paths = paths.path(path, item);
    }

    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(&info.title)
                .version(&info.version)
                .description(info.description.clone())
                .build(),
        )
        .paths(paths.build())
        .components(Some(components.build()))
        .tags(Some(tags))
        .build()
}
