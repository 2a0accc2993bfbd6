//! Error payloads for restkit resources.
//!
//! The crate holds the RFC 9457 Problem Details model that every failing
//! request is answered with. It has no dependency on an HTTP framework unless
//! the `axum` feature is enabled.

pub mod problem;

pub use problem::{APPLICATION_PROBLEM_JSON, Problem};

/// Attach the request path and an optional trace id to a Problem.
pub fn finalize(mut p: Problem, instance: &str, trace_id: Option<String>) -> Problem {
    p = p.with_instance(instance);
    if let Some(tid) = trace_id {
        p = p.with_trace_id(tid);
    }
    p
}
