//! HTML rendering for browsers.
//!
//! Objects render as a definition list, arrays as a table and scalars as text.
//! In edit mode an object renders as a `<form>` whose inputs are named after
//! its members, which posts back as `application/x-www-form-urlencoded`.
//! Output is a fragment with no surrounding document.

use std::fmt::Write as _;
use std::io::{Read, Write};

use serde_json::{Map, Value};

use super::{Codec, CodecError, Decoder, Encoder};

const MEDIA_TYPE: &str = "text/html";

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlCodec;

impl Codec for HtmlCodec {
    fn media_types(&self) -> &'static [&'static str] {
        &[MEDIA_TYPE]
    }

    fn new_encoder<'w>(&self, writer: &'w mut dyn Write, edit_mode: bool) -> Box<dyn Encoder + 'w> {
        Box::new(HtmlEncoder { writer, edit_mode })
    }

    fn new_decoder<'r>(&self, _reader: &'r mut dyn Read) -> Box<dyn Decoder + 'r> {
        Box::new(NoHtmlDecoder)
    }

    fn can_decode(&self) -> bool {
        false
    }
}

struct HtmlEncoder<'w> {
    writer: &'w mut dyn Write,
    edit_mode: bool,
}

impl Encoder for HtmlEncoder<'_> {
    fn encode(&mut self, value: &Value) -> Result<(), CodecError> {
        let mut out = String::new();
        match value {
            Value::Object(members) if self.edit_mode => render_form(&mut out, members),
            Value::Object(members) => render_object(&mut out, members),
            Value::Array(items) => render_table(&mut out, items),
            scalar => out.push_str(&escape_html(&display(scalar))),
        }
        self.writer.write_all(out.as_bytes())?;
        Ok(())
    }
}

struct NoHtmlDecoder;

impl Decoder for NoHtmlDecoder {
    fn decode(&mut self) -> Result<Value, CodecError> {
        Err(CodecError::DecodeUnsupported(MEDIA_TYPE))
    }
}

fn render_object(out: &mut String, members: &Map<String, Value>) {
    out.push_str("<dl>");
    for (key, value) in members {
        let _ = write!(out, "<dt>{}</dt><dd>{}</dd>", escape_html(key), escape_html(&display(value)));
    }
    out.push_str("</dl>");
}

fn render_form(out: &mut String, members: &Map<String, Value>) {
    out.push_str(r#"<form method="post">"#);
    for (key, value) in members {
        let key = escape_html(key);
        let _ = write!(
            out,
            r#"<label>{key} <input name="{key}" value="{}"></label>"#,
            escape_html(&display(value))
        );
    }
    out.push_str(r#"<button type="submit">Save</button></form>"#);
}

fn render_table(out: &mut String, items: &[Value]) {
    let columns: Vec<&String> = items
        .iter()
        .find_map(Value::as_object)
        .map(|first| first.keys().collect())
        .unwrap_or_default();

    out.push_str("<table><thead><tr>");
    for column in &columns {
        let _ = write!(out, "<th>{}</th>", escape_html(column));
    }
    out.push_str("</tr></thead><tbody>");
    for item in items {
        out.push_str("<tr>");
        match item {
            Value::Object(members) => {
                for column in &columns {
                    let cell = members.get(column.as_str()).map(display).unwrap_or_default();
                    let _ = write!(out, "<td>{}</td>", escape_html(&cell));
                }
            }
            other => {
                let _ = write!(out, "<td>{}</td>", escape_html(&display(other)));
            }
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
