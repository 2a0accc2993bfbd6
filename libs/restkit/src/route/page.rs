/// Pagination window of a list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    /// Read `offset` and `limit` from a raw query string.
    ///
    /// An invalid offset reads as 0. A missing, invalid or zero limit reads
    /// as `page_size`. A limit above `max_page_size` is clamped to it.
    #[must_use]
    pub fn from_query(query: Option<&str>, page_size: usize, max_page_size: usize) -> Self {
        let pairs: Vec<(String, String)> = query
            .and_then(|q| serde_urlencoded::from_str(q).ok())
            .unwrap_or_default();
        let param = |name: &str| {
            pairs
                .iter()
                .rev()
                .find(|(k, _)| k == name)
                .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        };

        let offset = param("offset").unwrap_or(0);
        let limit = match param("limit") {
            Some(0) | None => page_size,
            Some(limit) => limit,
        };
        Self {
            offset,
            limit: limit.min(max_page_size),
        }
    }
}
