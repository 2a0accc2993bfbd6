//! API description fragment derived from a route at build time.

use heck::ToSnakeCase;
use http::Method;

use super::RouteState;
use crate::identity::Entity;
use crate::openapi::{
    ApiFragment, OperationSpec, ParamSpec, RequestBodySpec, ResponseBody, ResponseSpec,
    collect_schemas,
};
use crate::problem::Problem;
use crate::provider::{Operation, Provider};

pub(super) fn fragment<E: Entity, P: Provider<E>>(state: &RouteState<E, P>, tag: &str) -> ApiFragment {
    let (entity, mut schemas) = collect_schemas::<E>();
    let (_, problem_schemas) = collect_schemas::<Problem>();
    schemas.extend(problem_schemas);

    let media_types = unique(state.codecs.media_types().iter().copied());
    let decodable = unique(state.codecs.decodable_media_types());

    let collection = state.prefix.clone();
    let item = format!("{collection}/{{id}}");
    let attribute = format!("{item}/{{attribute}}");
    let stem = collection.trim_start_matches('/').to_snake_case();

    let ops = Ops {
        entity: &entity,
        tag,
        stem: &stem,
        media_types: &media_types,
        decodable: &decodable,
    };

    let mut operations = Vec::new();
    let supports = |op| state.provider.supports(op);

    if supports(Operation::List) {
        let mut spec = ops.base(Method::GET, &collection, "list", format!("List {entity} entities"));
        spec.params = vec![
            ParamSpec::query("offset", "integer", "Number of entries to skip"),
            ParamSpec::query(
                "limit",
                "integer",
                format!(
                    "Page size, default {}, capped at {}",
                    state.config.page_size, state.config.max_page_size
                ),
            ),
        ];
        spec.responses = vec![
            ops.ok(200, "Page of entities", ResponseBody::List(entity.clone())),
            ResponseSpec::problem(500, "Internal error"),
        ];
        operations.push(spec);
    }

    if supports(Operation::Create) {
        let mut spec = ops.base(Method::POST, &collection, "create", format!("Create a {entity}"));
        spec.request_body = Some(ops.body());
        spec.responses = vec![
            ops.ok(201, "Created", ResponseBody::Schema(entity.clone())),
            ResponseSpec::problem(400, "Malformed body"),
            ResponseSpec::problem(500, "Internal error"),
        ];
        operations.push(spec);
    }

    if supports(Operation::Get) {
        let mut spec = ops.base(Method::GET, &item, "get", format!("Get one {entity}"));
        spec.description = Some(format!(
            "The identifier `new` returns a blank {entity} rendered for editing."
        ));
        spec.params = vec![id_param()];
        spec.responses = vec![
            ops.ok(200, "Entity", ResponseBody::Schema(entity.clone())),
            ResponseSpec::problem(404, "Not found"),
            ResponseSpec::problem(500, "Internal error"),
        ];
        operations.push(spec);

        let mut spec = ops.base(
            Method::GET,
            &attribute,
            "get_attribute",
            format!("Get one attribute of a {entity}"),
        );
        spec.params = vec![
            id_param(),
            ParamSpec::path("attribute", "Attribute name as it appears on the wire"),
        ];
        spec.responses = vec![
            ops.ok(200, "Single-attribute object", ResponseBody::Object),
            ResponseSpec::problem(404, "Entity or attribute not found"),
            ResponseSpec::problem(500, "Internal error"),
        ];
        operations.push(spec);
    }

    if supports(Operation::Update) {
        let mut spec = ops.base(Method::PUT, &item, "update", format!("Replace a {entity}"));
        spec.params = vec![id_param()];
        spec.request_body = Some(ops.body());
        spec.responses = vec![
            ops.ok(200, "Updated", ResponseBody::Schema(entity.clone())),
            ResponseSpec::problem(400, "Malformed body"),
            ResponseSpec::problem(404, "Not found"),
            ResponseSpec::problem(500, "Internal error"),
        ];
        operations.push(spec);
    }

    if supports(Operation::Delete) {
        let mut spec = ops.base(Method::DELETE, &item, "delete", format!("Delete a {entity}"));
        spec.description = Some("Deleting an absent entity also answers 204.".to_owned());
        spec.params = vec![id_param()];
        spec.responses = vec![
            ResponseSpec::empty(204, "Deleted"),
            ResponseSpec::problem(404, "Not found"),
            ResponseSpec::problem(500, "Internal error"),
        ];
        operations.push(spec);
    }

    ApiFragment { schemas, operations }
}

struct Ops<'a> {
    entity: &'a str,
    tag: &'a str,
    stem: &'a str,
    media_types: &'a [&'static str],
    decodable: &'a [&'static str],
}

impl Ops<'_> {
    fn base(&self, method: Method, path: &str, verb: &str, summary: String) -> OperationSpec {
        OperationSpec {
            method,
            path: path.to_owned(),
            operation_id: format!("{verb}_{}", self.stem),
            summary: Some(summary),
            description: None,
            tags: vec![self.tag.to_owned()],
            params: Vec::new(),
            request_body: None,
            responses: Vec::new(),
        }
    }

    fn body(&self) -> RequestBodySpec {
        RequestBodySpec {
            content_types: self.decodable.to_vec(),
            description: Some(format!("A {} in any supported encoding", self.entity)),
            schema_name: self.entity.to_owned(),
            required: true,
        }
    }

    fn ok(&self, status: u16, description: &str, body: ResponseBody) -> ResponseSpec {
        ResponseSpec {
            status,
            description: description.to_owned(),
            content_types: self.media_types.to_vec(),
            body,
        }
    }
}

fn unique(media_types: impl IntoIterator<Item = &'static str>) -> Vec<&'static str> {
    let mut out = Vec::new();
    for mt in media_types {
        if !out.contains(&mt) {
            out.push(mt);
        }
    }
    out
}

fn id_param() -> ParamSpec {
    ParamSpec::path("id", "Entity identifier")
}
