#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, StatusCode};
use chrono::NaiveDate;
use restkit::prelude::*;
use serde::{Deserialize, Serialize};
use tower::ServiceExt;
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, Entity)]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub birth_date: NaiveDate,
}

pub fn user(name: &str, birth_date: &str) -> User {
    User {
        id: String::new(),
        name: name.to_owned(),
        birth_date: birth_date.parse().unwrap(),
    }
}

/// `/users` backed by a fresh in-memory provider, conflicts answered with 409.
pub fn users_app() -> axum::Router {
    users_app_with(MemoryProvider::new(), |b| b)
}

pub fn users_app_with(
    provider: MemoryProvider<User>,
    configure: impl FnOnce(
        restkit::route::RouteBuilder<User, MemoryProvider<User>>,
    ) -> restkit::route::RouteBuilder<User, MemoryProvider<User>>,
) -> axum::Router {
    let route = configure(
        EntityRoute::builder("/users", provider).error_status("conflict", StatusCode::CONFLICT),
    )
    .build()
    .unwrap();

    let mut router = Router::new(OpenApiInfo::default());
    router.register(route).unwrap();
    router.into_axum().unwrap()
}

pub async fn send(app: &axum::Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

pub fn request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder().method(method).uri(uri)
}

pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    request(method, uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty(method: &str, uri: &str) -> Request<Body> {
    request(method, uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
    to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec()
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

pub async fn body_text(resp: Response<Body>) -> String {
    String::from_utf8(body_bytes(resp).await).unwrap()
}

pub fn content_type(resp: &Response<Body>) -> &str {
    resp.headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
