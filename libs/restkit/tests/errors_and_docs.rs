#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{Next, from_fn};
use axum::response::Response;
use common::{User, body_json, body_text, empty, request, send, user, users_app, users_app_with};
use restkit::config::DocsConfig;
use restkit::prelude::*;
use restkit::router::RouterError;
use serde_json::json;

#[tokio::test]
async fn unsupported_method_lists_allowed_methods() {
    let app = users_app();

    let resp = send(&app, empty("PATCH", "/users/jane")).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.headers()["allow"], "GET, POST, PUT, DELETE");

    let resp = send(&app, empty("DELETE", "/users")).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.headers()["allow"], "GET, POST");

    let resp = send(&app, empty("PUT", "/users/jane/name")).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.headers()["allow"], "GET");
}

#[tokio::test]
async fn problem_carries_instance_and_trace_id() {
    let app = users_app();
    let req = request("GET", "/users/ghost")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()["content-type"], "application/problem+json");

    let problem = body_json(resp).await;
    assert_eq!(problem["status"], 404);
    assert_eq!(problem["instance"], "/users/ghost");
    assert_eq!(problem["trace_id"], "req-42");
    assert_eq!(problem["code"], "not_found");
}

#[tokio::test]
async fn foreign_paths_are_not_routed() {
    let app = users_app();
    let resp = send(&app, empty("GET", "/users2")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send(&app, empty("GET", "/accounts/1")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn percent_encoded_ids_round_trip() {
    let app = users_app();
    let resp = send(
        &app,
        common::json_request(
            "POST",
            "/users",
            &json!({"id": "jane doe", "name": "Jane", "birth_date": "2009-11-01"}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(resp.headers()["location"], "/users/jane%20doe");

    let resp = send(&app, empty("GET", "/users/jane%20doe")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["id"], "jane doe");
}

/// Serves reads only.
struct ReadOnly(MemoryProvider<User>);

#[async_trait]
impl Provider<User> for ReadOnly {
    fn supports(&self, op: Operation) -> bool {
        matches!(op, Operation::Get | Operation::List)
    }

    async fn create(&self, _ctx: &RequestContext, _entity: User) -> Result<User, ProviderError> {
        Err(ProviderError::Unsupported(Operation::Create))
    }

    async fn get(&self, ctx: &RequestContext, id: &str) -> Result<User, ProviderError> {
        self.0.get(ctx, id).await
    }

    async fn update(&self, _ctx: &RequestContext, _entity: User) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported(Operation::Update))
    }

    async fn delete(&self, _ctx: &RequestContext, _id: &str) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported(Operation::Delete))
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<User>, ProviderError> {
        self.0.list(ctx, offset, limit).await
    }
}

#[tokio::test]
async fn read_only_provider_refuses_writes() {
    let route = EntityRoute::builder("/users", ReadOnly(MemoryProvider::new()))
        .build()
        .unwrap();
    let mut router = Router::new(OpenApiInfo::default());
    router.register(route).unwrap();
    let app = router.into_axum().unwrap();

    let resp = send(&app, empty("DELETE", "/users/jane")).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.headers()["allow"], "GET");

    let resp = send(&app, empty("GET", "/users")).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

async fn tag(name: &'static str, req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    resp.headers_mut().append("x-layers", HeaderValue::from_static(name));
    resp
}

async fn outer(req: Request, next: Next) -> Response {
    tag("outer", req, next).await
}

async fn inner(req: Request, next: Next) -> Response {
    tag("inner", req, next).await
}

#[tokio::test]
async fn layers_wrap_in_registration_order() {
    let app = users_app_with(MemoryProvider::new(), |b| {
        b.layer(from_fn(outer))
            .layer(from_fn(inner))
            .layer(from_fn(restkit::middleware::log_requests))
    });

    // Still wraps error responses.
    let resp = send(&app, empty("GET", "/users/ghost")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let order: Vec<&str> = resp
        .headers()
        .get_all("x-layers")
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(order, ["inner", "outer"]);
}

#[tokio::test]
async fn openapi_document_is_served_uncached() {
    let app = users_app();
    let resp = send(&app, empty("GET", "/openapi.json")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["cache-control"], "no-store");

    let doc = body_json(resp).await;
    let paths = doc["paths"].as_object().unwrap();
    assert!(paths.contains_key("/users"));
    assert!(paths.contains_key("/users/{id}"));
    assert!(paths.contains_key("/users/{id}/{attribute}"));
    assert!(doc["paths"]["/users"]["post"].is_object());
    assert!(doc["components"]["schemas"]["User"].is_object());
    assert!(doc["components"]["schemas"]["Problem"].is_object());

    let create = &doc["paths"]["/users"]["post"]["requestBody"]["content"];
    assert!(create["application/json"].is_object());
    assert!(create["text/html"].is_null());
}

#[tokio::test]
async fn docs_page_points_at_document() {
    let app = users_app();
    let resp = send(&app, empty("GET", "/docs")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = body_text(resp).await;
    assert!(page.contains("/openapi.json"));
    assert!(page.contains("elements-api"));
}

#[tokio::test]
async fn docs_can_be_disabled() {
    let route = EntityRoute::builder("/users", MemoryProvider::<User>::new())
        .build()
        .unwrap();
    let mut router = Router::new(OpenApiInfo::default()).with_docs(DocsConfig {
        enabled: false,
        ..DocsConfig::default()
    });
    router.register(route).unwrap();
    let app = router.into_axum().unwrap();

    let resp = send(&app, empty("GET", "/openapi.json")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn conflicting_prefixes_are_rejected() {
    let mut router = Router::new(OpenApiInfo::default());
    let build = |prefix: &str| {
        EntityRoute::builder(prefix, MemoryProvider::<User>::new())
            .build()
            .unwrap()
    };
    router.register(build("/users")).unwrap();

    assert_eq!(
        router.register(build("/users")).err(),
        Some(RouterError::DuplicatePrefix("/users".to_owned()))
    );
    assert!(matches!(
        router.register(build("/users/admins")).err(),
        Some(RouterError::OverlappingPrefix { .. })
    ));
    assert!(matches!(
        router.register(build("/docs")).err(),
        Some(RouterError::ReservedPath { .. })
    ));
    assert_eq!(router.prefixes(), ["/users".to_owned()]);
}

#[tokio::test]
async fn two_routes_share_one_document() {
    let mut router = Router::new(OpenApiInfo::default());
    router
        .register(EntityRoute::builder("/users", MemoryProvider::<User>::new()).build().unwrap())
        .unwrap();
    router
        .register(
            EntityRoute::builder("/admins", MemoryProvider::with_entities([user("Root", "1970-01-01")]))
                .build()
                .unwrap(),
        )
        .unwrap();
    let app = router.into_axum().unwrap();

    let doc = body_json(send(&app, empty("GET", "/openapi.json")).await).await;
    assert!(doc["paths"]["/admins/{id}"].is_object());
    assert!(doc["paths"]["/users/{id}"].is_object());

    let resp = send(&app, empty("GET", "/admins")).await;
    assert_eq!(body_json(resp).await.as_array().unwrap().len(), 1);
}
