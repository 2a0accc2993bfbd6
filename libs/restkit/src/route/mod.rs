//! Generic entity route.
//!
//! An [`EntityRoute`] binds a [`Provider`] to a URL prefix and serves the five
//! CRUD verbs through one handler. The handler negotiates codecs, decomposes
//! the path, calls the provider and maps failures to problem responses. At
//! build time the route resolves its entity's identity and derives the API
//! description fragment; either failing stops the route from being built.
//!
//! Routes hold no per-request mutable state and are shared across requests.

mod dispatch;
mod docs;
mod page;
mod path;

pub use page::Page;
pub use path::ResourcePath;

use std::collections::HashMap;
use std::convert::Infallible;
use std::marker::PhantomData;
use std::sync::Arc;

use axum::extract::Request;
use axum::response::IntoResponse;
use axum::routing::{Route, any};
use http::StatusCode;
use thiserror::Error;
use tower::{Layer, Service};

use crate::codec::CodecRegistry;
use crate::config::RestConfig;
use crate::identity::{Entity, IdentityError, ResolvedIdentity, resolve_identity};
use crate::openapi::ApiFragment;
use crate::provider::Provider;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route prefix `{0}` must start with `/` and name a path below the root")]
    InvalidPrefix(String),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("invalid pagination: page size {page_size} with cap {max_page_size}")]
    InvalidPagination { page_size: usize, max_page_size: usize },
    #[error("route `{0}` has no codecs registered")]
    NoCodecs(String),
}

/// Per-route tuning.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    pub page_size: usize,
    pub max_page_size: usize,
    pub max_body_bytes: usize,
    /// Provider error code → response status.
    pub error_statuses: HashMap<String, StatusCode>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            error_statuses: HashMap::new(),
        }
    }
}

impl From<&RestConfig> for RouteConfig {
    fn from(rest: &RestConfig) -> Self {
        Self {
            page_size: rest.pagination.default_page_size,
            max_page_size: rest.pagination.max_page_size,
            max_body_bytes: rest.max_body_bytes,
            error_statuses: HashMap::new(),
        }
    }
}

type RouteLayer = Box<dyn FnOnce(axum::Router) -> axum::Router + Send + Sync>;

pub(crate) struct RouteState<E, P> {
    pub(crate) prefix: String,
    pub(crate) provider: Arc<P>,
    pub(crate) codecs: Arc<CodecRegistry>,
    pub(crate) config: RouteConfig,
    pub(crate) identity: ResolvedIdentity,
    _entity: PhantomData<fn() -> E>,
}

/// A provider bound to a prefix, ready to be registered with a router.
pub struct EntityRoute<E, P> {
    state: Arc<RouteState<E, P>>,
    layers: Vec<RouteLayer>,
    fragment: ApiFragment,
}

impl<E: Entity, P: Provider<E>> EntityRoute<E, P> {
    pub fn builder(prefix: impl Into<String>, provider: P) -> RouteBuilder<E, P> {
        RouteBuilder::new(prefix.into(), Arc::new(provider))
    }

    /// Prefix without a trailing slash, e.g. `/users`.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.state.prefix
    }

    #[must_use]
    pub fn identity(&self) -> &ResolvedIdentity {
        &self.state.identity
    }

    #[must_use]
    pub fn fragment(&self) -> &ApiFragment {
        &self.fragment
    }

    #[must_use]
    pub fn config(&self) -> &RouteConfig {
        &self.state.config
    }

    /// Split into the prefix, the API fragment and an axum router serving
    /// `P`, `P/` and everything below `P/`.
    pub fn into_parts(self) -> (String, ApiFragment, axum::Router) {
        let base = self.state.prefix.clone();
        let handler = any(dispatch::handle::<E, P>);

        let mut router = axum::Router::new()
            .route(&base, handler.clone())
            .route(&format!("{base}/"), handler.clone())
            .route(&format!("{base}/{{*rest}}"), handler)
            .with_state(self.state);

        // First added is outermost.
        for layer in self.layers.into_iter().rev() {
            router = layer(router);
        }
        (base, self.fragment, router)
    }

    /// The axum router alone, without API documentation.
    pub fn into_router(self) -> axum::Router {
        self.into_parts().2
    }
}

/// Builder for [`EntityRoute`].
pub struct RouteBuilder<E, P> {
    prefix: String,
    provider: Arc<P>,
    codecs: Option<Arc<CodecRegistry>>,
    config: RouteConfig,
    layers: Vec<RouteLayer>,
    tag: Option<String>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, P: Provider<E>> RouteBuilder<E, P> {
    fn new(prefix: String, provider: Arc<P>) -> Self {
        Self {
            prefix,
            provider,
            codecs: None,
            config: RouteConfig::default(),
            layers: Vec::new(),
            tag: None,
            _entity: PhantomData,
        }
    }

    /// Codecs to negotiate with. Defaults to [`CodecRegistry::with_defaults`].
    #[must_use]
    pub fn codecs(mut self, codecs: impl Into<Arc<CodecRegistry>>) -> Self {
        self.codecs = Some(codecs.into());
        self
    }

    /// Replace the whole route config, keeping status overrides already added.
    #[must_use]
    pub fn config(mut self, mut config: RouteConfig) -> Self {
        for (code, status) in std::mem::take(&mut self.config.error_statuses) {
            config.error_statuses.entry(code).or_insert(status);
        }
        self.config = config;
        self
    }

    #[must_use]
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.config.page_size = page_size;
        self
    }

    #[must_use]
    pub fn max_page_size(mut self, max_page_size: usize) -> Self {
        self.config.max_page_size = max_page_size;
        self
    }

    #[must_use]
    pub fn max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.config.max_body_bytes = max_body_bytes;
        self
    }

    /// Answer provider errors with `code` using `status`.
    #[must_use]
    pub fn error_status(mut self, code: impl Into<String>, status: StatusCode) -> Self {
        self.config.error_statuses.insert(code.into(), status);
        self
    }

    /// OpenAPI tag for this route's operations. Defaults to the prefix.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Wrap the route in a tower layer. The first layer added is outermost.
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request>>::Error: Into<Infallible> + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.layers.push(Box::new(move |router: axum::Router| router.layer(layer)));
        self
    }

    /// Validate the configuration and derive the API fragment.
    ///
    /// # Errors
    /// Returns [`RouteError`] for an empty or root prefix, inconsistent
    /// pagination, an empty codec registry or an unresolvable identity.
    pub fn build(self) -> Result<EntityRoute<E, P>, RouteError> {
        let prefix = normalize_prefix(&self.prefix)?;

        let RouteConfig {
            page_size,
            max_page_size,
            ..
        } = self.config;
        if page_size == 0 || max_page_size < page_size {
            return Err(RouteError::InvalidPagination {
                page_size,
                max_page_size,
            });
        }

        let codecs = self
            .codecs
            .unwrap_or_else(|| Arc::new(CodecRegistry::with_defaults()));
        if codecs.is_empty() {
            return Err(RouteError::NoCodecs(prefix));
        }

        let identity = resolve_identity::<E>()?;
        let tag = self
            .tag
            .unwrap_or_else(|| prefix.trim_start_matches('/').to_owned());

        let state = RouteState {
            prefix,
            provider: self.provider,
            codecs,
            config: self.config,
            identity,
            _entity: PhantomData,
        };
        let fragment = docs::fragment::<E, P>(&state, &tag);

        tracing::info!(
            prefix = %state.prefix,
            entity = %state.identity.entity,
            identity = %state.identity.attribute,
            operations = fragment.operations.len(),
            "built entity route"
        );

        Ok(EntityRoute {
            state: Arc::new(state),
            layers: self.layers,
            fragment,
        })
    }
}

fn normalize_prefix(raw: &str) -> Result<String, RouteError> {
    let trimmed = raw.trim_end_matches('/');
    if !trimmed.starts_with('/') || trimmed.contains('{') || trimmed.contains('}') {
        return Err(RouteError::InvalidPrefix(raw.to_owned()));
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryProvider;
    use crate::Entity;
    use serde::{Deserialize, Serialize};
    use utoipa::ToSchema;

    #[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Entity)]
    struct Tag {
        id: String,
        label: String,
    }

    fn builder(prefix: &str) -> RouteBuilder<Tag, MemoryProvider<Tag>> {
        EntityRoute::builder(prefix, MemoryProvider::new())
    }

    #[test]
    fn prefix_is_normalized() {
        let route = builder("/tags/").build().unwrap();
        assert_eq!(route.prefix(), "/tags");
    }

    #[test]
    fn root_and_relative_prefixes_are_rejected() {
        for prefix in ["", "/", "tags", "/tags/{id}"] {
            assert!(
                matches!(builder(prefix).build(), Err(RouteError::InvalidPrefix(_))),
                "{prefix:?} should be rejected"
            );
        }
    }

    #[test]
    fn pagination_must_be_consistent() {
        let err = builder("/tags").page_size(50).max_page_size(10).build().err();
        assert!(matches!(
            err,
            Some(RouteError::InvalidPagination {
                page_size: 50,
                max_page_size: 10
            })
        ));
        assert!(builder("/tags").page_size(0).build().is_err());
    }

    #[test]
    fn empty_codec_registry_is_rejected() {
        let err = builder("/tags").codecs(CodecRegistry::new()).build().err();
        assert!(matches!(err, Some(RouteError::NoCodecs(p)) if p == "/tags"));
    }

    #[test]
    fn config_keeps_earlier_overrides() {
        let route = builder("/tags")
            .error_status("conflict", StatusCode::CONFLICT)
            .config(RouteConfig {
                page_size: 5,
                max_page_size: 10,
                ..RouteConfig::default()
            })
            .build()
            .unwrap();
        assert_eq!(route.config().page_size, 5);
        assert_eq!(
            route.config().error_statuses.get("conflict"),
            Some(&StatusCode::CONFLICT)
        );
    }
}
