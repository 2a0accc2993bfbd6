//! Storage-agnostic provider contract consumed by entity routes.

mod memory;

pub use memory::MemoryProvider;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::identity::Entity;

/// Request metadata handed to every provider call.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub trace_id: Option<String>,
    pub method: String,
    pub path: String,
}

impl RequestContext {
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            trace_id: None,
            method: method.into(),
            path: path.into(),
        }
    }

    #[must_use]
    pub fn with_trace_id(mut self, trace_id: Option<String>) -> Self {
        self.trace_id = trace_id;
        self
    }
}

/// One of the five provider capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Get,
    Update,
    Delete,
    List,
}

impl Operation {
    pub const ALL: [Self; 5] = [Self::Create, Self::Get, Self::Update, Self::Delete, Self::List];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Get => "get",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("entity `{id}` not found")]
    NotFound { id: String },
    /// A domain failure the route maps through its error→status table by `code`.
    #[error("{message}")]
    Rejected { code: String, message: String },
    #[error("operation `{0}` is not supported")]
    Unsupported(Operation),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ProviderError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code, the key of a route's status overrides.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Rejected { code, .. } => code,
            Self::Unsupported(_) => "unsupported",
            Self::Internal(_) => "internal",
        }
    }
}

/// CRUD capability set for one entity type.
///
/// Implementations own their concurrency discipline; routes call them from
/// many requests at once and never retry.
#[async_trait]
pub trait Provider<E: Entity>: Send + Sync + 'static {
    /// Whether the provider implements `op`. Unsupported operations answer
    /// 405 and are left out of the API description.
    fn supports(&self, op: Operation) -> bool {
        let _ = op;
        true
    }

    async fn create(&self, ctx: &RequestContext, entity: E) -> Result<E, ProviderError>;

    /// An empty `id` asks for a blank entity, used to render creation forms.
    async fn get(&self, ctx: &RequestContext, id: &str) -> Result<E, ProviderError>;

    async fn update(&self, ctx: &RequestContext, entity: E) -> Result<(), ProviderError>;

    async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<(), ProviderError>;

    async fn list(&self, ctx: &RequestContext, offset: usize, limit: usize) -> Result<Vec<E>, ProviderError>;
}
