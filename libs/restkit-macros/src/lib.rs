//! # restkit-macros
//!
//! Procedural macros for restkit entities.
//!
//! - `Entity`: implements `restkit::Entity` by locating the identity field of a
//!   struct, either the field named `id` or the first field tagged
//!   `#[entity(id)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity;

/// Derive macro implementing `restkit::Entity`.
///
/// A field named `id` is the identity. Without one, the first field carrying
/// `#[entity(id)]` is used. The identity field must be a `String`. The wire
/// attribute name follows `#[serde(rename = "...")]` and the container's
/// `#[serde(rename_all = "...")]`.
///
/// # Example
///
/// ```ignore
/// use restkit::Entity;
///
/// #[derive(Entity, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
/// pub struct Book {
///     #[entity(id)]
///     pub isbn: String,
///     pub title: String,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand_derive_entity(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
