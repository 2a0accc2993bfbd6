//! Entity identity contract.
//!
//! Every resource type exposes exactly one string identity attribute. The
//! contract is an explicit trait, normally implemented with
//! `#[derive(Entity)]`: a field named `id` (in any case) is the identity,
//! otherwise the first field tagged `#[entity(id)]`. Types with neither fail
//! to compile.
//!
//! [`resolve_identity`] cross-checks the declared attribute against the
//! type's derived schema. Routes call it once at construction time so a
//! mismatch stops the process from starting instead of surfacing per request.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use utoipa::PartialSchema;
use utoipa::openapi::{RefOr, Schema};

/// How the identity attribute was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// The field is named `id`.
    Conventional,
    /// The field carries `#[entity(id)]`.
    Tagged,
}

/// Static description of an entity's identity attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityField {
    /// Rust field name.
    pub field: &'static str,
    /// Attribute name on the wire, after serde renames.
    pub attribute: &'static str,
    pub source: IdentitySource,
}

/// A value type served as a REST resource.
pub trait Entity: Serialize + DeserializeOwned + utoipa::ToSchema + Send + Sync + 'static {
    const IDENTITY: IdentityField;

    fn identity(&self) -> &str;

    fn set_identity(&mut self, id: String);
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("entity `{entity}` has no identity attribute")]
    NoIdentityAttribute { entity: String },
    #[error("identity attribute `{attribute}` of `{entity}` is missing from its schema")]
    NotInSchema { entity: String, attribute: String },
    #[error("schema of `{entity}` is not an object schema")]
    SchemaNotObject { entity: String },
}

/// Identity of an entity type, validated against its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// Schema component name of the entity.
    pub entity: String,
    pub field: &'static str,
    pub attribute: &'static str,
    pub source: IdentitySource,
}

/// Resolve and validate the identity attribute of `E`.
///
/// # Errors
/// Returns [`IdentityError`] when the attribute is empty or absent from the
/// entity's object schema.
pub fn resolve_identity<E: Entity>() -> Result<ResolvedIdentity, IdentityError> {
    let entity = E::name().into_owned();
    let IdentityField {
        field,
        attribute,
        source,
    } = E::IDENTITY;

    if attribute.is_empty() || field.is_empty() {
        return Err(IdentityError::NoIdentityAttribute { entity });
    }

    let RefOr::T(Schema::Object(object)) = <E as PartialSchema>::schema() else {
        return Err(IdentityError::SchemaNotObject { entity });
    };
    if !object.properties.contains_key(attribute) {
        return Err(IdentityError::NotInSchema {
            entity,
            attribute: attribute.to_owned(),
        });
    }

    Ok(ResolvedIdentity {
        entity,
        field,
        attribute,
        source,
    })
}

/// Identity of `entity` rendered as a string.
pub fn get_id<E: Entity>(entity: &E) -> String {
    entity.identity().to_owned()
}

/// Assign `value` to the identity attribute of `entity` in place.
pub fn set_id<E: Entity>(entity: &mut E, value: impl Into<String>) {
    entity.set_identity(value.into());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Entity;
    use serde::Deserialize;
    use utoipa::ToSchema;

    #[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Entity)]
    struct Plain {
        id: String,
        #[entity(id)]
        name: String,
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Entity)]
    #[serde(rename_all = "camelCase")]
    struct Book {
        title: String,
        #[entity(id)]
        book_code: String,
        #[entity(id)]
        isbn: String,
    }

    #[test]
    fn conventional_id_wins_over_tag() {
        let resolved = resolve_identity::<Plain>().unwrap();
        assert_eq!(resolved.field, "id");
        assert_eq!(resolved.source, IdentitySource::Conventional);
        assert_eq!(resolved.entity, "Plain");
    }

    #[test]
    fn first_tagged_field_uses_wire_name() {
        let resolved = resolve_identity::<Book>().unwrap();
        assert_eq!(resolved.field, "book_code");
        assert_eq!(resolved.attribute, "bookCode");
        assert_eq!(resolved.source, IdentitySource::Tagged);
    }

    #[test]
    fn get_and_set_go_through_the_identity_field() {
        let mut book = Book::default();
        set_id(&mut book, "b-1");
        assert_eq!(book.book_code, "b-1");
        assert!(book.isbn.is_empty());
        assert_eq!(get_id(&book), "b-1");
    }

    #[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
    struct Renamed {
        #[serde(rename = "key")]
        id: String,
    }

    // Hand-written impl whose attribute disagrees with the serde rename.
    impl Entity for Renamed {
        const IDENTITY: IdentityField = IdentityField {
            field: "id",
            attribute: "id",
            source: IdentitySource::Conventional,
        };

        fn identity(&self) -> &str {
            &self.id
        }

        fn set_identity(&mut self, id: String) {
            self.id = id;
        }
    }

    #[test]
    fn attribute_must_exist_in_schema() {
        let err = resolve_identity::<Renamed>().unwrap_err();
        assert_eq!(
            err,
            IdentityError::NotInSchema {
                entity: "Renamed".to_owned(),
                attribute: "id".to_owned(),
            }
        );
    }
}
