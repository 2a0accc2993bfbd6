//! Generic REST resources over storage-agnostic providers.
//!
//! A [`Provider`] implements create/get/update/delete/list for one
//! [`Entity`] type. An [`EntityRoute`] exposes it at a URL prefix, negotiating
//! the wire encoding from `Accept`/`Content-Type` against a [`CodecRegistry`].
//! A [`Router`] aggregates routes into one axum application and one OpenAPI
//! document served next to a browsable viewer.
//!
//! ```ignore
//! let users = EntityRoute::builder("/users", MemoryProvider::<User>::new())
//!     .error_status("conflict", StatusCode::CONFLICT)
//!     .build()?;
//!
//! let mut router = Router::new(OpenApiInfo::default());
//! router.register(users)?;
//! axum::serve(listener, router.into_axum()?).await?;
//! ```

// Lets `#[derive(Entity)]` expand to `::restkit::...` inside this crate too.
extern crate self as restkit;

pub mod codec;
pub mod config;
pub mod docs;
pub mod identity;
pub mod middleware;
pub mod negotiate;
pub mod openapi;
pub mod problem;
pub mod provider;
pub mod route;
pub mod router;
pub mod telemetry;

pub use codec::CodecRegistry;
pub use identity::Entity;
pub use openapi::OpenApiInfo;
pub use problem::Problem;
pub use provider::{MemoryProvider, Provider, ProviderError, RequestContext};
pub use restkit_errors;
pub use restkit_macros::Entity;
pub use route::{EntityRoute, RouteConfig};
pub use router::Router;

pub mod prelude {
    pub use crate::codec::CodecRegistry;
    pub use crate::config::{AppConfig, RestConfig};
    pub use crate::identity::Entity;
    pub use crate::openapi::OpenApiInfo;
    pub use crate::provider::{MemoryProvider, Operation, Provider, ProviderError, RequestContext};
    pub use crate::route::{EntityRoute, RouteConfig};
    pub use crate::router::Router;
    pub use restkit_macros::Entity;
}
