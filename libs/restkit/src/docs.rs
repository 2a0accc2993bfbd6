//! Browser documentation page for the OpenAPI document.

use crate::codec::escape_html;

/// Stoplight Elements release loaded from unpkg.
pub const ELEMENTS_VERSION: &str = "9.0.15";

/// HTML page rendering the document served at `openapi_path`.
#[must_use]
pub fn render_docs_page(title: &str, openapi_path: &str) -> String {
    let title = escape_html(title);
    let openapi_path = escape_html(openapi_path);
    format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <script src="https://unpkg.com/@stoplight/elements@{ELEMENTS_VERSION}/web-components.min.js"></script>
    <link rel="stylesheet" href="https://unpkg.com/@stoplight/elements@{ELEMENTS_VERSION}/styles.min.css">
  </head>
  <body style="height:100vh;">
    <elements-api apiDescriptionUrl="{openapi_path}" router="hash" layout="sidebar"></elements-api>
  </body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_points_at_document() {
        let page = render_docs_page("Users & Books", "/openapi.json");
        assert!(page.contains(r#"apiDescriptionUrl="/openapi.json""#));
        assert!(page.contains("<title>Users &amp; Books</title>"));
        assert!(page.contains("@stoplight/elements@9.0.15"));
    }
}
