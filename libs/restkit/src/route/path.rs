use std::borrow::Cow;

/// Shape of a request path below a route prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourcePath {
    Collection,
    Item { id: String },
    Attribute { id: String, attribute: String },
}

impl ResourcePath {
    /// Decompose `path` relative to `prefix`.
    ///
    /// The remainder after the prefix is split on its last `/`: `P/a/b`
    /// addresses attribute `b` of entity `a`, and an id containing `/` can
    /// only be reached through its attribute paths. Segments are
    /// percent-decoded. Returns `None` when `path` is not below `prefix`.
    #[must_use]
    pub fn parse(prefix: &str, path: &str) -> Option<Self> {
        let prefix = prefix.trim_end_matches('/');
        let rest = path.strip_prefix(prefix)?;
        let rest = match rest.strip_prefix('/') {
            Some(rest) => rest,
            None if rest.is_empty() => rest,
            // `/users2` is not below `/users`
            None => return None,
        };
        let rest = rest.trim_end_matches('/');

        if rest.is_empty() {
            return Some(Self::Collection);
        }
        Some(match rest.rsplit_once('/') {
            Some((id, attribute)) => Self::Attribute {
                id: decode(id),
                attribute: decode(attribute),
            },
            None => Self::Item { id: decode(rest) },
        })
    }
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment).map_or_else(|_| segment.to_owned(), Cow::into_owned)
}
