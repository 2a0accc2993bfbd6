//! Declarative operation descriptions fed into the registry.

use http::Method;

/// Convert Axum 0.8+ style path parameters to OpenAPI-style placeholders.
///
/// ```
/// # use restkit::openapi::axum_to_openapi_path;
/// assert_eq!(axum_to_openapi_path("/users/{id}"), "/users/{id}");
/// assert_eq!(axum_to_openapi_path("/static/{*path}"), "/static/{path}");
/// ```
#[must_use]
pub fn axum_to_openapi_path(path: &str) -> String {
    path.replace("{*", "{")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
}

#[derive(Clone, Debug)]
pub struct ParamSpec {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub description: Option<String>,
    /// JSON Schema type (string, integer, ...).
    pub param_type: String,
}

impl ParamSpec {
    pub fn path(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: ParamLocation::Path,
            required: true,
            description: Some(description.into()),
            param_type: "string".to_owned(),
        }
    }

    pub fn query(name: impl Into<String>, param_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: ParamLocation::Query,
            required: false,
            description: Some(description.into()),
            param_type: param_type.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RequestBodySpec {
    /// Every media type the body may be sent as.
    pub content_types: Vec<&'static str>,
    pub description: Option<String>,
    /// Component schema name of the body.
    pub schema_name: String,
    pub required: bool,
}

/// Shape of a response body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseBody {
    Empty,
    /// One instance of a component schema.
    Schema(String),
    /// An array of a component schema.
    List(String),
    /// An object with arbitrary members.
    Object,
    /// An RFC 9457 problem document.
    Problem,
}

#[derive(Clone, Debug)]
pub struct ResponseSpec {
    pub status: u16,
    pub description: String,
    pub content_types: Vec<&'static str>,
    pub body: ResponseBody,
}

impl ResponseSpec {
    pub fn empty(status: u16, description: impl Into<String>) -> Self {
        Self {
            status,
            description: description.into(),
            content_types: Vec::new(),
            body: ResponseBody::Empty,
        }
    }

    pub fn problem(status: u16, description: impl Into<String>) -> Self {
        Self {
            status,
            description: description.into(),
            content_types: vec![restkit_errors::APPLICATION_PROBLEM_JSON],
            body: ResponseBody::Problem,
        }
    }
}

#[derive(Clone, Debug)]
pub struct OperationSpec {
    pub method: Method,
    /// Axum-style path; converted with [`axum_to_openapi_path`] when built.
    pub path: String,
    pub operation_id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub params: Vec<ParamSpec>,
    pub request_body: Option<RequestBodySpec>,
    pub responses: Vec<ResponseSpec>,
}

impl OperationSpec {
    /// Registry key, `METHOD:path`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}", self.method.as_str(), self.path)
    }
}
