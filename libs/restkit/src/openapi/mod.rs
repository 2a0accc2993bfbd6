//! OpenAPI registry for schema and operation management.
//!
//! Routes describe themselves as an [`ApiFragment`]: component schemas plus
//! one [`OperationSpec`] per verb and path. The router merges every fragment
//! into an [`OpenApiRegistryImpl`] and builds a single `utoipa` document from
//! it. Operations are keyed by `METHOD:path` and schemas by component name;
//! a later registration under the same key replaces the earlier one.

mod spec;

pub use spec::{
    OperationSpec, ParamLocation, ParamSpec, RequestBodySpec, ResponseBody, ResponseSpec,
    axum_to_openapi_path,
};

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use http::Method;
use utoipa::openapi::{
    OpenApi, OpenApiBuilder, Ref, RefOr, Required,
    content::{Content, ContentBuilder},
    info::InfoBuilder,
    path::{HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn, PathItemBuilder, PathsBuilder},
    request_body::RequestBodyBuilder,
    response::{Response, ResponseBuilder, ResponsesBuilder},
    schema::{Array, ComponentsBuilder, ObjectBuilder, Schema, SchemaType, Type},
};

/// Schemas keyed by component name, a type's own schema first.
pub type SchemaCollection = Vec<(String, RefOr<Schema>)>;

/// Component name of the problem document schema.
pub const PROBLEM_SCHEMA: &str = "Problem";

/// OpenAPI document metadata.
#[derive(Debug, Clone)]
pub struct OpenApiInfo {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

impl Default for OpenApiInfo {
    fn default() -> Self {
        Self {
            title: "API Documentation".to_owned(),
            version: "0.1.0".to_owned(),
            description: None,
        }
    }
}

/// The schema and operations one route contributes to the document.
#[derive(Clone, Default)]
pub struct ApiFragment {
    pub schemas: SchemaCollection,
    pub operations: Vec<OperationSpec>,
}

impl std::fmt::Debug for ApiFragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let schemas: Vec<&str> = self.schemas.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("ApiFragment")
            .field("schemas", &schemas)
            .field("operations", &self.operations)
            .finish()
    }
}

impl ApiFragment {
    /// Operation registered under `METHOD:path`, if any.
    #[must_use]
    pub fn operation(&self, method: &Method, path: &str) -> Option<&OperationSpec> {
        self.operations
            .iter()
            .find(|op| op.method == method && op.path == path)
    }
}

pub trait OpenApiRegistry: Send + Sync {
    fn register_operation(&self, spec: &OperationSpec);

    /// Insert `schemas` under components and return `name` for use in a `$ref`.
    fn ensure_schema_raw(&self, name: &str, schemas: SchemaCollection) -> String;
}

/// Collect `T`'s schema and its dependencies.
pub fn collect_schemas<T: utoipa::ToSchema + 'static>() -> (String, SchemaCollection) {
    use utoipa::PartialSchema;

    let root_name = T::name().to_string();
    // T's own schema goes first as an object, never a ref, to avoid a
    // self-referential component.
    let mut collected: SchemaCollection = vec![(root_name.clone(), <T as PartialSchema>::schema())];
    T::schemas(&mut collected);
    (root_name, collected)
}

/// Register `T` and its dependencies; returns the component name.
pub fn ensure_schema<T: utoipa::ToSchema + 'static>(registry: &dyn OpenApiRegistry) -> String {
    let (root_name, collected) = collect_schemas::<T>();
    registry.ensure_schema_raw(&root_name, collected)
}

/// Thread-safe registry: `DashMap` operations, copy-on-write `ArcSwap` schemas.
pub struct OpenApiRegistryImpl {
    pub operation_specs: DashMap<String, OperationSpec>,
    pub components_registry: ArcSwap<HashMap<String, RefOr<Schema>>>,
}

impl OpenApiRegistryImpl {
    #[must_use]
    pub fn new() -> Self {
        Self {
            operation_specs: DashMap::new(),
            components_registry: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Merge a route's fragment.
    pub fn merge(&self, fragment: &ApiFragment) {
        if let Some((root, _)) = fragment.schemas.first() {
            self.ensure_schema_raw(root, fragment.schemas.clone());
        }
        for op in &fragment.operations {
            self.register_operation(op);
        }
    }

    /// Generate the complete document.
    ///
    /// # Errors
    /// Fails if a registered operation uses a method the document cannot express.
    pub fn build_openapi(&self, info: &OpenApiInfo) -> Result<OpenApi> {
        let op_count = self.operation_specs.len();
        tracing::info!("Building OpenAPI: found {op_count} registered operations");

        let mut paths = PathsBuilder::new();
        for spec in self.operation_specs.iter().map(|e| e.value().clone()) {
            let method = http_method(&spec.method)?;

            let mut op = OperationBuilder::new()
                .operation_id(Some(spec.operation_id.clone()))
                .summary(spec.summary.clone())
                .description(spec.description.clone());
            for tag in &spec.tags {
                op = op.tag(tag.clone());
            }

            for p in &spec.params {
                let in_ = match p.location {
                    ParamLocation::Path => ParameterIn::Path,
                    ParamLocation::Query => ParameterIn::Query,
                    ParamLocation::Header => ParameterIn::Header,
                };
                let required = if p.location == ParamLocation::Path || p.required {
                    Required::True
                } else {
                    Required::False
                };
                let ty = match p.param_type.as_str() {
                    "integer" => Type::Integer,
                    "number" => Type::Number,
                    "boolean" => Type::Boolean,
                    _ => Type::String,
                };
                let schema = Schema::Object(ObjectBuilder::new().schema_type(SchemaType::Type(ty)).build());
                op = op.parameter(
                    ParameterBuilder::new()
                        .name(&p.name)
                        .parameter_in(in_)
                        .required(required)
                        .description(p.description.clone())
                        .schema(Some(schema))
                        .build(),
                );
            }

            if let Some(rb) = &spec.request_body {
                let mut body = RequestBodyBuilder::new().description(rb.description.clone());
                for &content_type in &rb.content_types {
                    body = body.content(content_type, schema_content(content_type, &rb.schema_name, false));
                }
                if rb.required {
                    body = body.required(Some(Required::True));
                }
                op = op.request_body(Some(body.build()));
            }

            let mut responses = ResponsesBuilder::new();
            for r in &spec.responses {
                responses = responses.response(r.status.to_string(), build_response(r));
            }
            op = op.responses(responses.build());

            let item = PathItemBuilder::new().operation(method, op.build()).build();
            paths = paths.path(axum_to_openapi_path(&spec.path), item);
        }

        let mut components = ComponentsBuilder::new();
        for (name, schema) in self.components_registry.load().iter() {
            components = components.schema(name.clone(), schema.clone());
        }

        let openapi_info = InfoBuilder::new()
            .title(&info.title)
            .version(&info.version)
            .description(info.description.clone())
            .build();

        Ok(OpenApiBuilder::new()
            .info(openapi_info)
            .paths(paths.build())
            .components(Some(components.build()))
            .build())
    }
}

impl Default for OpenApiRegistryImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenApiRegistry for OpenApiRegistryImpl {
    fn register_operation(&self, spec: &OperationSpec) {
        let operation_key = spec.key();
        if self
            .operation_specs
            .insert(operation_key.clone(), spec.clone())
            .is_some()
        {
            tracing::warn!(%operation_key, "Operation registered twice; overriding with latest");
        }
        tracing::debug!(
            operation_id = %spec.operation_id,
            operation_key = %operation_key,
            "Registered API operation in registry"
        );
    }

    fn ensure_schema_raw(&self, root_name: &str, schemas: SchemaCollection) -> String {
        // Snapshot & copy-on-write
        let current = self.components_registry.load();
        let mut reg = (**current).clone();

        for (name, schema) in schemas {
            // identical -> no-op; different -> warn & override
            if let Some(existing) = reg.get(&name) {
                let a = serde_json::to_value(existing).ok();
                let b = serde_json::to_value(&schema).ok();
                if a == b {
                    continue;
                }
                tracing::warn!(%name, "Schema content conflict; overriding with latest");
            }
            reg.insert(name, schema);
        }

        self.components_registry.store(Arc::new(reg));
        root_name.to_owned()
    }
}

fn http_method(method: &Method) -> Result<HttpMethod> {
    Ok(match *method {
        Method::GET => HttpMethod::Get,
        Method::POST => HttpMethod::Post,
        Method::PUT => HttpMethod::Put,
        Method::DELETE => HttpMethod::Delete,
        Method::PATCH => HttpMethod::Patch,
        Method::HEAD => HttpMethod::Head,
        Method::OPTIONS => HttpMethod::Options,
        ref other => anyhow::bail!("unsupported method in API description: {other}"),
    })
}

fn schema_ref(name: &str) -> RefOr<Schema> {
    RefOr::Ref(Ref::from_schema_name(name))
}

/// Content for one media type. HTML is documented as an opaque string.
fn schema_content(content_type: &str, schema_name: &str, list: bool) -> Content {
    let schema: RefOr<Schema> = if content_type == "text/html" {
        Schema::Object(ObjectBuilder::new().schema_type(SchemaType::Type(Type::String)).build()).into()
    } else if list {
        Schema::Array(Array::new(schema_ref(schema_name))).into()
    } else {
        schema_ref(schema_name)
    };
    ContentBuilder::new().schema(Some(schema)).build()
}

fn build_response(r: &ResponseSpec) -> Response {
    let mut resp = ResponseBuilder::new().description(&r.description);
    for &content_type in &r.content_types {
        let content = match &r.body {
            ResponseBody::Empty => continue,
            ResponseBody::Schema(name) => schema_content(content_type, name, false),
            ResponseBody::List(name) => schema_content(content_type, name, true),
            ResponseBody::Object => ContentBuilder::new()
                .schema(Some(Schema::Object(ObjectBuilder::new().build())))
                .build(),
            ResponseBody::Problem => ContentBuilder::new()
                .schema(Some(schema_ref(PROBLEM_SCHEMA)))
                .build(),
        };
        resp = resp.content(content_type, content);
    }
    resp.build()
}
