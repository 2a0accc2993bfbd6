//! The demo resource served at `/users`.

use axum::http::StatusCode;
use axum::middleware::from_fn;
use chrono::NaiveDate;
use restkit::middleware::log_requests;
use restkit::prelude::*;
use restkit::route::RouteError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A registered user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, Entity)]
pub struct User {
    /// Server-assigned when left empty on create.
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub birth_date: NaiveDate,
}

pub fn route(rest: &RestConfig) -> Result<EntityRoute<User, MemoryProvider<User>>, RouteError> {
    EntityRoute::builder("/users", MemoryProvider::new())
        .config(RouteConfig::from(rest))
        .error_status("conflict", StatusCode::CONFLICT)
        .layer(from_fn(log_requests))
        .build()
}
