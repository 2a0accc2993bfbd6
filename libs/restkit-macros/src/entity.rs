use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutyKebabCase, ToShoutySnakeCase, ToSnakeCase,
    ToUpperCamelCase,
};
use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Attribute, Data, DeriveInput, Field, Fields, LitStr, Type};

/// How the identity field was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Conventional,
    Tagged,
}

/// The identity field chosen for a struct.
#[derive(Debug)]
pub struct IdentityChoice<'a> {
    pub field: &'a Field,
    pub source: Source,
}

pub fn expand_derive_entity(input: &DeriveInput) -> syn::Result<TokenStream> {
    let struct_name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Entity only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let fields: Vec<&Field> = fields.iter().collect();
    let choice = choose_identity(struct_name, &fields)?;
    ensure_string(choice.field)?;

    let Some(ident) = choice.field.ident.as_ref() else {
        return Err(syn::Error::new_spanned(
            choice.field,
            "Entity requires named fields",
        ));
    };
    let field_name = ident.unraw().to_string();
    let rename_all = container_rename_all(&input.attrs)?;
    let attribute = wire_name(&choice.field.attrs, &field_name, rename_all.as_deref());
    let source = match choice.source {
        Source::Conventional => quote! { ::restkit::identity::IdentitySource::Conventional },
        Source::Tagged => quote! { ::restkit::identity::IdentitySource::Tagged },
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::restkit::Entity for #struct_name #ty_generics #where_clause {
            const IDENTITY: ::restkit::identity::IdentityField =
                ::restkit::identity::IdentityField {
                    field: #field_name,
                    attribute: #attribute,
                    source: #source,
                };

            fn identity(&self) -> &str {
                &self.#ident
            }

            fn set_identity(&mut self, id: ::std::string::String) {
                self.#ident = id;
            }
        }
    })
}

/// A field named `id` (any case) wins over tags; otherwise the first tagged field.
pub fn choose_identity<'a>(
    struct_name: &syn::Ident,
    fields: &[&'a Field],
) -> syn::Result<IdentityChoice<'a>> {
    for field in fields {
        tagged(field)?;
    }

    let conventional = fields.iter().copied().find(|f| {
        f.ident
            .as_ref()
            .is_some_and(|i| i.unraw().to_string().eq_ignore_ascii_case("id"))
    });
    if let Some(field) = conventional {
        return Ok(IdentityChoice {
            field,
            source: Source::Conventional,
        });
    }

    for &field in fields {
        if tagged(field)? {
            return Ok(IdentityChoice {
                field,
                source: Source::Tagged,
            });
        }
    }

    Err(syn::Error::new_spanned(
        struct_name,
        format!("{struct_name} has no identity attribute: add an `id` field or tag one field with #[entity(id)]"),
    ))
}

fn tagged(field: &Field) -> syn::Result<bool> {
    let mut found = false;
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("entity")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                found = true;
                Ok(())
            } else {
                Err(meta.error("unsupported entity attribute; expected `id`"))
            }
        })?;
    }
    Ok(found)
}

fn ensure_string(field: &Field) -> syn::Result<()> {
    let is_string = match &field.ty {
        Type::Path(p) => p
            .path
            .segments
            .last()
            .is_some_and(|s| s.ident == "String" && s.arguments.is_none()),
        _ => false,
    };
    if is_string {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(
            &field.ty,
            "identity attribute must be a String",
        ))
    }
}

fn container_rename_all(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut rule = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        // Only `rename_all` matters here; serde reports anything malformed itself.
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                if meta.input.peek(syn::Token![=]) {
                    let lit: LitStr = meta.value()?.parse()?;
                    rule = Some(lit.value());
                } else {
                    skip_nested(&meta)?;
                }
            } else {
                skip_value(&meta)?;
            }
            Ok(())
        });
    }
    if let Some(r) = &rule {
        if apply_rule(r, "probe").is_none() {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                format!("unsupported serde rename_all rule `{r}`"),
            ));
        }
    }
    Ok(rule)
}

pub fn wire_name(attrs: &[Attribute], field_name: &str, rename_all: Option<&str>) -> String {
    let mut renamed = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") && meta.input.peek(syn::Token![=]) {
                let lit: LitStr = meta.value()?.parse()?;
                renamed = Some(lit.value());
            } else {
                skip_value(&meta)?;
            }
            Ok(())
        });
    }
    renamed
        .or_else(|| rename_all.and_then(|rule| apply_rule(rule, field_name)))
        .unwrap_or_else(|| field_name.to_owned())
}

fn skip_value(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else {
        skip_nested(meta)?;
    }
    Ok(())
}

fn skip_nested(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_value(&inner))?;
    }
    Ok(())
}

fn apply_rule(rule: &str, field: &str) -> Option<String> {
    let renamed = match rule {
        "lowercase" => field.to_ascii_lowercase(),
        "UPPERCASE" => field.to_ascii_uppercase(),
        "PascalCase" => field.to_upper_camel_case(),
        "camelCase" => field.to_lower_camel_case(),
        "snake_case" => field.to_snake_case(),
        "SCREAMING_SNAKE_CASE" => field.to_shouty_snake_case(),
        "kebab-case" => field.to_kebab_case(),
        "SCREAMING-KEBAB-CASE" => field.to_shouty_kebab_case(),
        _ => return None,
    };
    Some(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn named_fields(input: &DeriveInput) -> Vec<&Field> {
        match &input.data {
            Data::Struct(data) => data.fields.iter().collect(),
            _ => panic!("expected struct"),
        }
    }

    fn chosen(input: &DeriveInput) -> syn::Result<(String, Source)> {
        let fields = named_fields(input);
        let choice = choose_identity(&input.ident, &fields)?;
        let name = choice.field.ident.as_ref().unwrap().to_string();
        Ok((name, choice.source))
    }

    #[test]
    fn conventional_id_wins_over_tag() {
        let input: DeriveInput = parse_quote! {
            struct User {
                #[entity(id)]
                email: String,
                id: String,
            }
        };
        assert_eq!(chosen(&input).unwrap(), ("id".to_owned(), Source::Conventional));
    }

    #[test]
    fn uppercase_id_is_conventional() {
        let input: DeriveInput = parse_quote! {
            #[allow(non_snake_case)]
            struct Legacy {
                ID: String,
                name: String,
            }
        };
        assert_eq!(chosen(&input).unwrap(), ("ID".to_owned(), Source::Conventional));
    }

    #[test]
    fn first_tagged_field_wins() {
        let input: DeriveInput = parse_quote! {
            struct Book {
                title: String,
                #[entity(id)]
                isbn: String,
                #[entity(id)]
                sku: String,
            }
        };
        assert_eq!(chosen(&input).unwrap(), ("isbn".to_owned(), Source::Tagged));
    }

    #[test]
    fn missing_identity_is_an_error() {
        let input: DeriveInput = parse_quote! {
            struct Note {
                body: String,
            }
        };
        let err = chosen(&input).unwrap_err();
        assert!(err.to_string().contains("no identity attribute"));
    }

    #[test]
    fn unknown_entity_attribute_is_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Note {
                #[entity(key)]
                body: String,
            }
        };
        let err = chosen(&input).unwrap_err();
        assert!(err.to_string().contains("unsupported entity attribute"));
    }

    #[test]
    fn non_string_identity_is_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Counter {
                id: u64,
            }
        };
        let err = expand_derive_entity(&input).unwrap_err();
        assert!(err.to_string().contains("must be a String"));
    }

    #[test]
    fn wire_name_follows_serde_renames() {
        let input: DeriveInput = parse_quote! {
            struct User {
                #[serde(default, rename = "userId")]
                id: String,
                #[serde(skip_serializing_if = "String::is_empty")]
                birth_date: String,
            }
        };
        let fields = named_fields(&input);
        assert_eq!(wire_name(&fields[0].attrs, "id", None), "userId");
        assert_eq!(
            wire_name(&fields[1].attrs, "birth_date", Some("PascalCase")),
            "BirthDate"
        );
        assert_eq!(wire_name(&fields[1].attrs, "birth_date", None), "birth_date");
    }

    #[test]
    fn expansion_implements_entity() {
        let input: DeriveInput = parse_quote! {
            #[serde(rename_all = "camelCase")]
            struct Book {
                #[entity(id)]
                book_code: String,
            }
        };
        let tokens = expand_derive_entity(&input).unwrap().to_string();
        assert!(tokens.contains(":: restkit :: Entity for Book"));
        assert!(tokens.contains("\"bookCode\""));
        assert!(tokens.contains("IdentitySource :: Tagged"));
    }

    #[test]
    fn enums_are_rejected() {
        let input: DeriveInput = parse_quote! {
            enum Shape { Circle }
        };
        assert!(expand_derive_entity(&input).is_err());
    }
}
