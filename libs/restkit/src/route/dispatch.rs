//! Per-request state machine of an entity route.
//!
//! Steps, terminal on the first failure: method check, `Accept`
//! negotiation, `Content-Type` negotiation for POST/PUT, path decomposition,
//! provider call, encoding.

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};

use super::{Page, ResourcePath, RouteState};
use crate::codec::{CodecEntry, CodecError, decode_slice, encode_to_vec};
use crate::identity::Entity;
use crate::negotiate::{best_of, best_value, parse_alternatives};
use crate::problem::{
    Problem, bad_request, extract_trace_id, finalize, internal_error, method_not_allowed,
    not_found, unsupported_media_type,
};
use crate::provider::{Operation, Provider, ProviderError, RequestContext};

/// Identifier that asks for a blank entity rendered for editing.
pub const NEW_ENTITY_ID: &str = "new";

const EDIT_PARAM: &str = "edit";

/// A failed request. 405s carry the methods the path does accept.
struct Rejection {
    problem: Problem,
    allow: Option<String>,
}

impl From<Problem> for Rejection {
    fn from(problem: Problem) -> Self {
        Self {
            problem,
            allow: None,
        }
    }
}

pub(super) async fn handle<E: Entity, P: Provider<E>>(
    State(route): State<Arc<RouteState<E, P>>>,
    req: Request,
) -> Response {
    let trace_id = extract_trace_id(req.headers());
    let path = req.uri().path().to_owned();
    let method = req.method().clone();

    match route.dispatch(req, trace_id.clone()).await {
        Ok(resp) => resp,
        Err(Rejection { problem, allow }) => {
            tracing::debug!(
                %method,
                %path,
                status = problem.status.as_u16(),
                detail = %problem.detail,
                "request rejected"
            );
            let mut resp = finalize(problem, &path, trace_id).into_response();
            if let Some(allow) = allow.and_then(|a| HeaderValue::from_str(&a).ok()) {
                resp.headers_mut().insert(header::ALLOW, allow);
            }
            resp
        }
    }
}

impl<E: Entity, P: Provider<E>> RouteState<E, P> {
    async fn dispatch(&self, req: Request, trace_id: Option<String>) -> Result<Response, Rejection> {
        let method = req.method().clone();
        if !matches!(method, Method::GET | Method::POST | Method::PUT | Method::DELETE) {
            return Err(Rejection {
                problem: method_not_allowed(format!("method {method} is not supported")),
                allow: Some("GET, POST, PUT, DELETE".to_owned()),
            });
        }

        let accept = self.negotiate_accept(req.headers())?;
        let content = if method == Method::POST || method == Method::PUT {
            Some(self.negotiate_content_type(req.headers())?)
        } else {
            None
        };

        let path = req.uri().path().to_owned();
        let Some(resource) = ResourcePath::parse(&self.prefix, &path) else {
            return Err(not_found(format!("`{path}` is not below `{}`", self.prefix)).into());
        };
        let query = req.uri().query().map(str::to_owned);
        let edit = edit_requested(query.as_deref());
        let ctx = RequestContext::new(method.as_str(), path).with_trace_id(trace_id);

        tracing::debug!(
            method = %ctx.method,
            path = %ctx.path,
            ?resource,
            accept = accept.media_type,
            content_type = content.as_ref().map(|c| c.media_type),
            "dispatching entity request"
        );

        match (&method, &resource) {
            (&Method::GET, ResourcePath::Collection) => {
                self.require(Operation::List, &resource)?;
                let page = Page::from_query(
                    query.as_deref(),
                    self.config.page_size,
                    self.config.max_page_size,
                );
                let items = self
                    .provider
                    .list(&ctx, page.offset, page.limit)
                    .await
                    .map_err(|e| self.provider_failure(e, &resource))?;
                self.respond(StatusCode::OK, &accept, &items, edit, None)
            }
            (&Method::POST, ResourcePath::Collection) => {
                self.require(Operation::Create, &resource)?;
                let entity = self.read_entity(req.into_body(), content.as_ref()).await?;
                let created = self
                    .provider
                    .create(&ctx, entity)
                    .await
                    .map_err(|e| self.provider_failure(e, &resource))?;
                let location = format!("{}/{}", self.prefix, urlencoding::encode(created.identity()));
                self.respond(StatusCode::CREATED, &accept, &created, false, Some(location))
            }
            (&Method::GET, ResourcePath::Item { id }) => {
                self.require(Operation::Get, &resource)?;
                let (lookup, edit) = if id == NEW_ENTITY_ID {
                    ("", true)
                } else {
                    (id.as_str(), edit)
                };
                let entity = self
                    .provider
                    .get(&ctx, lookup)
                    .await
                    .map_err(|e| self.provider_failure(e, &resource))?;
                self.respond(StatusCode::OK, &accept, &entity, edit, None)
            }
            (&Method::PUT, ResourcePath::Item { id }) => {
                self.require(Operation::Update, &resource)?;
                let mut entity = self.read_entity(req.into_body(), content.as_ref()).await?;
                // The path id wins over whatever the body carries.
                entity.set_identity(id.clone());
                let value = to_value(&entity)?;
                self.provider
                    .update(&ctx, entity)
                    .await
                    .map_err(|e| self.provider_failure(e, &resource))?;
                self.respond_value(StatusCode::OK, &accept, &value, edit, None)
            }
            (&Method::DELETE, ResourcePath::Item { id }) => {
                self.require(Operation::Delete, &resource)?;
                match self.provider.delete(&ctx, id).await {
                    Ok(()) | Err(ProviderError::NotFound { .. }) => {
                        Ok(StatusCode::NO_CONTENT.into_response())
                    }
                    Err(e) => Err(self.provider_failure(e, &resource)),
                }
            }
            (&Method::GET, ResourcePath::Attribute { id, attribute }) => {
                self.require(Operation::Get, &resource)?;
                let entity = self
                    .provider
                    .get(&ctx, id)
                    .await
                    .map_err(|e| self.provider_failure(e, &resource))?;
                let value = to_value(&entity)?;
                let Some(member) = value.get(attribute.as_str()) else {
                    return Err(not_found(format!(
                        "`{}` has no attribute `{attribute}`",
                        self.identity.entity
                    ))
                    .into());
                };
                let mut single = Map::new();
                single.insert(attribute.clone(), member.clone());
                self.respond_value(StatusCode::OK, &accept, &Value::Object(single), edit, None)
            }
            (method, resource) => Err(Rejection {
                problem: method_not_allowed(format!("method {method} is not allowed on this path")),
                allow: Some(self.allowed_methods(resource)),
            }),
        }
    }

    fn negotiate_accept(&self, headers: &HeaderMap) -> Result<CodecEntry, Rejection> {
        let values = header_values(headers, &header::ACCEPT);
        let alternatives = parse_alternatives(&values)
            .map_err(|e| unsupported_media_type(format!("malformed Accept header: {e}")))?;
        if !alternatives.is_empty() && alternatives.iter().all(|alt| alt.quality <= 0.0) {
            return Err(unsupported_media_type(format!(
                "Accept `{}` refuses every media type",
                values.join(", ")
            ))
            .into());
        }
        // An unmatched preference falls back to the default codec.
        let chosen = best_of(&alternatives, self.codecs.media_types()).unwrap_or_default();
        self.codecs
            .select(chosen)
            .ok_or_else(|| internal_error("no codec available").into())
    }

    fn negotiate_content_type(&self, headers: &HeaderMap) -> Result<CodecEntry, Rejection> {
        let values = header_values(headers, &header::CONTENT_TYPE);
        let catalogue = self.codecs.media_types();
        let chosen = if values.is_empty() {
            String::new()
        } else {
            let chosen = best_value(&values, catalogue)
                .map_err(|e| unsupported_media_type(format!("malformed Content-Type header: {e}")))?;
            if chosen.is_empty() {
                return Err(unsupported_media_type(format!(
                    "Content-Type `{}` is not supported; expected one of: {}",
                    values.join(", "),
                    catalogue.join(", ")
                ))
                .into());
            }
            chosen
        };
        self.codecs
            .select(&chosen)
            .ok_or_else(|| internal_error("no codec available").into())
    }

    async fn read_entity(&self, body: Body, content: Option<&CodecEntry>) -> Result<E, Rejection> {
        let Some(content) = content else {
            return Err(internal_error("request body codec was not negotiated").into());
        };
        let bytes = to_bytes(body, self.config.max_body_bytes).await.map_err(|e| {
            bad_request(format!(
                "failed to read request body (limit {} bytes): {e}",
                self.config.max_body_bytes
            ))
        })?;

        let value = decode_slice(content, &bytes).map_err(|e| match e {
            CodecError::DecodeUnsupported(_) => unsupported_media_type(e.to_string()),
            other => bad_request(other.to_string()),
        })?;
        serde_json::from_value(value).map_err(|e| {
            bad_request(format!("invalid `{}` body: {e}", self.identity.entity)).into()
        })
    }

    fn respond<T: Serialize>(
        &self,
        status: StatusCode,
        accept: &CodecEntry,
        body: &T,
        edit: bool,
        location: Option<String>,
    ) -> Result<Response, Rejection> {
        let value = to_value(body)?;
        self.respond_value(status, accept, &value, edit, location)
    }

    fn respond_value(
        &self,
        status: StatusCode,
        accept: &CodecEntry,
        value: &Value,
        edit: bool,
        location: Option<String>,
    ) -> Result<Response, Rejection> {
        let bytes = encode_to_vec(accept, value, edit).map_err(|e| {
            tracing::error!(
                error = %e,
                entity = %self.identity.entity,
                media_type = accept.media_type,
                "failed to encode response"
            );
            internal_error(e.to_string())
        })?;

        let mut resp = (status, [(header::CONTENT_TYPE, accept.media_type)], bytes).into_response();
        if let Some(location) = location.and_then(|l| HeaderValue::from_str(&l).ok()) {
            resp.headers_mut().insert(header::LOCATION, location);
        }
        Ok(resp)
    }

    /// 405 unless the provider implements `op`.
    fn require(&self, op: Operation, resource: &ResourcePath) -> Result<(), Rejection> {
        if self.provider.supports(op) {
            return Ok(());
        }
        Err(Rejection {
            problem: method_not_allowed(format!("`{}` does not support {op}", self.prefix)),
            allow: Some(self.allowed_methods(resource)),
        })
    }

    fn allowed_methods(&self, resource: &ResourcePath) -> String {
        let candidates: &[(Operation, &str)] = match resource {
            ResourcePath::Collection => &[(Operation::List, "GET"), (Operation::Create, "POST")],
            ResourcePath::Item { .. } => &[
                (Operation::Get, "GET"),
                (Operation::Update, "PUT"),
                (Operation::Delete, "DELETE"),
            ],
            ResourcePath::Attribute { .. } => &[(Operation::Get, "GET")],
        };
        candidates
            .iter()
            .filter(|(op, _)| self.provider.supports(*op))
            .map(|(_, method)| *method)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn provider_failure(&self, err: ProviderError, resource: &ResourcePath) -> Rejection {
        let code = err.code().to_owned();
        let detail = err.to_string();

        if let Some(&status) = self.config.error_statuses.get(&code) {
            if status.is_server_error() {
                tracing::error!(%code, error = %detail, prefix = %self.prefix, "provider failed");
            }
            return Problem::from_status(status, detail).with_code(code).into();
        }

        match err {
            ProviderError::NotFound { .. } => not_found(detail).with_code(code).into(),
            ProviderError::Unsupported(_) => Rejection {
                problem: method_not_allowed(detail).with_code(code),
                allow: Some(self.allowed_methods(resource)),
            },
            ProviderError::Rejected { .. } => {
                tracing::warn!(%code, error = %detail, prefix = %self.prefix, "unmapped provider rejection");
                internal_error(detail).with_code(code).into()
            }
            ProviderError::Internal(error) => {
                tracing::error!(error = ?error, prefix = %self.prefix, "provider failed");
                internal_error("the provider failed to handle the request")
                    .with_code(code)
                    .into()
            }
        }
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, Rejection> {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize entity");
        internal_error(format!("failed to serialize entity: {e}")).into()
    })
}

fn header_values<'h>(headers: &'h HeaderMap, name: &HeaderName) -> Vec<&'h str> {
    headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect()
}

/// `?edit`, `?edit=1` and `?edit=true` turn edit mode on.
fn edit_requested(query: Option<&str>) -> bool {
    let Some(query) = query else {
        return false;
    };
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();
    pairs
        .iter()
        .any(|(k, v)| k == EDIT_PARAM && !matches!(v.as_str(), "0" | "false"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_flag_parsing() {
        assert!(!edit_requested(None));
        assert!(edit_requested(Some("edit")));
        assert!(edit_requested(Some("offset=1&edit=true")));
        assert!(!edit_requested(Some("edit=false")));
        assert!(!edit_requested(Some("editor=1")));
    }
}
