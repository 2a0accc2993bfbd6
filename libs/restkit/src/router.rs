//! Aggregates entity routes into one axum application and one API document.

use std::sync::Arc;

use axum::Json;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use thiserror::Error;
use utoipa::openapi::OpenApi;

use crate::config::DocsConfig;
use crate::docs::render_docs_page;
use crate::identity::Entity;
use crate::openapi::{OpenApiInfo, OpenApiRegistryImpl};
use crate::provider::Provider;
use crate::route::EntityRoute;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("a route is already registered at `{0}`")]
    DuplicatePrefix(String),
    #[error("route prefix `{prefix}` overlaps the route at `{existing}`")]
    OverlappingPrefix { prefix: String, existing: String },
    #[error("route prefix `{prefix}` collides with the documentation path `{path}`")]
    ReservedPath { prefix: String, path: String },
}

/// Route aggregate.
///
/// All registration happens before [`Router::into_axum`]; the built
/// application and document are read-only afterwards.
pub struct Router {
    info: OpenApiInfo,
    registry: OpenApiRegistryImpl,
    app: axum::Router,
    prefixes: Vec<String>,
    docs: DocsConfig,
}

impl Router {
    #[must_use]
    pub fn new(info: OpenApiInfo) -> Self {
        Self {
            info,
            registry: OpenApiRegistryImpl::new(),
            app: axum::Router::new(),
            prefixes: Vec::new(),
            docs: DocsConfig::default(),
        }
    }

    /// Where (and whether) the document and viewer are served.
    #[must_use]
    pub fn with_docs(mut self, docs: DocsConfig) -> Self {
        self.docs = docs;
        self
    }

    /// Merge `route`'s API fragment and bind its handler.
    ///
    /// # Errors
    /// Returns [`RouterError`] if the prefix is already bound, nests inside
    /// or around a bound prefix, or collides with a documentation path.
    pub fn register<E: Entity, P: Provider<E>>(
        &mut self,
        route: EntityRoute<E, P>,
    ) -> Result<&mut Self, RouterError> {
        let prefix = route.prefix().to_owned();
        self.check_prefix(&prefix)?;

        let (prefix, fragment, router) = route.into_parts();
        self.registry.merge(&fragment);
        let app = std::mem::take(&mut self.app);
        self.app = app.merge(router);

        tracing::info!(
            %prefix,
            operations = fragment.operations.len(),
            "registered entity route"
        );
        self.prefixes.push(prefix);
        Ok(self)
    }

    /// Registered prefixes in registration order.
    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// The aggregate API document.
    ///
    /// # Errors
    /// Propagates document build failures.
    pub fn document(&self) -> anyhow::Result<OpenApi> {
        self.registry.build_openapi(&self.info)
    }

    /// Build the axum application, adding the document and viewer routes
    /// when docs are enabled.
    ///
    /// # Errors
    /// Fails on unusable docs paths, a registered prefix that collides with
    /// them, or a document build failure.
    pub fn into_axum(self) -> anyhow::Result<axum::Router> {
        if !self.docs.enabled {
            return Ok(self.app);
        }
        self.docs.validate()?;
        // `with_docs` may have run after registration.
        for prefix in &self.prefixes {
            self.check_reserved(prefix)?;
        }

        let mut app = self.app;

        let doc = Arc::new(self.registry.build_openapi(&self.info)?);
        let page = render_docs_page(&self.info.title, &self.docs.openapi_path);

        app = app
            .route(
                &self.docs.openapi_path,
                get(move || async move {
                    ([(header::CACHE_CONTROL, "no-store")], Json(doc.as_ref())).into_response()
                }),
            )
            .route(&self.docs.docs_path, get(move || async move { Html(page) }));

        tracing::info!(
            openapi = %self.docs.openapi_path,
            docs = %self.docs.docs_path,
            "serving API documentation"
        );
        Ok(app)
    }

    fn check_reserved(&self, prefix: &str) -> Result<(), RouterError> {
        if !self.docs.enabled {
            return Ok(());
        }
        for path in [&self.docs.openapi_path, &self.docs.docs_path] {
            if is_within(path, prefix) || is_within(prefix, path) {
                return Err(RouterError::ReservedPath {
                    prefix: prefix.to_owned(),
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_prefix(&self, prefix: &str) -> Result<(), RouterError> {
        self.check_reserved(prefix)?;

        for existing in &self.prefixes {
            if existing == prefix {
                return Err(RouterError::DuplicatePrefix(prefix.to_owned()));
            }
            if is_within(prefix, existing) || is_within(existing, prefix) {
                return Err(RouterError::OverlappingPrefix {
                    prefix: prefix.to_owned(),
                    existing: existing.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Whether `path` equals `base` or lies below it.
fn is_within(path: &str, base: &str) -> bool {
    path.strip_prefix(base)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Entity;
    use crate::provider::MemoryProvider;
    use serde::{Deserialize, Serialize};
    use utoipa::ToSchema;

    #[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Entity)]
    struct Item {
        id: String,
    }

    fn route(prefix: &str) -> EntityRoute<Item, MemoryProvider<Item>> {
        EntityRoute::builder(prefix, MemoryProvider::new()).build().unwrap()
    }

    #[test]
    fn duplicate_prefix_is_rejected() {
        let mut router = Router::new(OpenApiInfo::default());
        router.register(route("/items")).unwrap();
        let err = router.register(route("/items/")).map(|_| ()).unwrap_err();
        assert_eq!(err, RouterError::DuplicatePrefix("/items".to_owned()));
    }

    #[test]
    fn nested_prefixes_are_rejected() {
        let mut router = Router::new(OpenApiInfo::default());
        router.register(route("/items")).unwrap();
        let err = router.register(route("/items/archived")).map(|_| ()).unwrap_err();
        assert!(matches!(err, RouterError::OverlappingPrefix { .. }));

        // Sibling with a shared textual prefix is fine.
        router.register(route("/items2")).unwrap();
        assert_eq!(router.prefixes(), ["/items", "/items2"]);
    }

    #[test]
    fn docs_paths_are_reserved() {
        let mut router = Router::new(OpenApiInfo::default());
        let err = router.register(route("/docs")).map(|_| ()).unwrap_err();
        assert!(matches!(err, RouterError::ReservedPath { .. }));

        let mut router = Router::new(OpenApiInfo::default()).with_docs(DocsConfig {
            enabled: false,
            ..DocsConfig::default()
        });
        router.register(route("/docs")).unwrap();
    }

    #[test]
    fn docs_enabled_after_registration_are_checked() {
        let mut router = Router::new(OpenApiInfo::default()).with_docs(DocsConfig {
            enabled: false,
            ..DocsConfig::default()
        });
        router.register(route("/docs")).unwrap();

        let err = router.with_docs(DocsConfig::default()).into_axum().err().unwrap();
        assert!(matches!(
            err.downcast_ref::<RouterError>(),
            Some(RouterError::ReservedPath { prefix, .. }) if prefix == "/docs"
        ));
    }

    #[test]
    fn clashing_docs_paths_are_an_error() {
        for docs in [
            DocsConfig {
                openapi_path: "/docs".to_owned(),
                ..DocsConfig::default()
            },
            DocsConfig {
                docs_path: "/docs/{page}".to_owned(),
                ..DocsConfig::default()
            },
        ] {
            let router = Router::new(OpenApiInfo::default()).with_docs(docs);
            let err = router.into_axum().err().unwrap();
            assert!(err.downcast_ref::<crate::config::ConfigError>().is_some(), "{err}");
        }
    }

    #[test]
    fn document_aggregates_routes() {
        let mut router = Router::new(OpenApiInfo {
            title: "Inventory".to_owned(),
            ..OpenApiInfo::default()
        });
        router.register(route("/items")).unwrap();
        router.register(route("/archive")).unwrap();

        let json = serde_json::to_value(router.document().unwrap()).unwrap();
        assert_eq!(json["info"]["title"], "Inventory");
        for path in ["/items", "/items/{id}", "/items/{id}/{attribute}", "/archive", "/archive/{id}"] {
            assert!(json["paths"].get(path).is_some(), "missing {path}");
        }
        assert!(json["components"]["schemas"].get("Item").is_some());
        assert!(json["components"]["schemas"].get("Problem").is_some());
    }
}
