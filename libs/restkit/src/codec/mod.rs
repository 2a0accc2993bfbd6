//! Codec registry: maps media types to encoder/decoder constructors.
//!
//! Every codec speaks `serde_json::Value` on the entity side, so a route can
//! convert its entity once and hand the value to whichever codec negotiation
//! picked. The registry remembers the order media types were registered in;
//! that order is the catalogue used for `Accept`/`Content-Type` negotiation.
//!
//! Registration takes `&mut self` and must finish before the registry is
//! shared with a route. Lookups are read-only.

mod form;
mod html;
mod json;
mod yaml;

pub(crate) use html::escape_html;

pub use form::FormCodec;
pub use html::HtmlCodec;
pub use json::JsonCodec;
pub use yaml::YamlCodec;

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

/// Errors raised by codecs and the registry.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("no codec available")]
    NoCodec,
    #[error("{0} bodies cannot be decoded")]
    DecodeUnsupported(&'static str),
    #[error("malformed {media_type} body: {message}")]
    Decode {
        media_type: &'static str,
        message: String,
    },
    #[error("cannot encode {media_type}: {message}")]
    Encode {
        media_type: &'static str,
        message: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Writes one value to the stream the encoder was constructed over.
pub trait Encoder {
    /// # Errors
    /// Returns [`CodecError`] if the value cannot be represented or written.
    fn encode(&mut self, value: &Value) -> Result<(), CodecError>;
}

/// Reads one value from the stream the decoder was constructed over.
pub trait Decoder {
    /// # Errors
    /// Returns [`CodecError`] if the stream does not hold a valid document.
    fn decode(&mut self) -> Result<Value, CodecError>;
}

/// A paired encoder/decoder construction strategy.
pub trait Codec: Send + Sync {
    /// Media types this codec claims. The first one is its canonical type.
    fn media_types(&self) -> &'static [&'static str];

    /// Build an encoder over `writer`.
    ///
    /// `edit_mode` is a rendering hint honored only by form-capable codecs.
    fn new_encoder<'w>(&self, writer: &'w mut dyn Write, edit_mode: bool) -> Box<dyn Encoder + 'w>;

    /// Build a decoder over `reader`.
    fn new_decoder<'r>(&self, reader: &'r mut dyn Read) -> Box<dyn Decoder + 'r>;

    /// Whether request bodies can be read in this codec's media types.
    fn can_decode(&self) -> bool {
        true
    }
}

/// A codec together with the media type it was looked up under.
#[derive(Clone)]
pub struct CodecEntry {
    pub media_type: &'static str,
    pub codec: Arc<dyn Codec>,
}

impl std::fmt::Debug for CodecEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecEntry")
            .field("media_type", &self.media_type)
            .finish_non_exhaustive()
    }
}

/// Mapping from media type to codec, with a default for unmatched lookups.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<String, CodecEntry>,
    catalogue: Vec<&'static str>,
    default: Option<CodecEntry>,
}

impl CodecRegistry {
    /// Empty registry. Encoders built from it fail with [`CodecError::NoCodec`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with JSON (the default), YAML, form and HTML codecs.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(JsonCodec);
        registry.register(YamlCodec);
        registry.register(FormCodec);
        registry.register(HtmlCodec);
        registry
    }

    /// Register `codec` under every media type it declares.
    ///
    /// A later registration for the same media type replaces the earlier one.
    /// The first codec ever registered becomes the default.
    pub fn register<C: Codec + 'static>(&mut self, codec: C) -> &mut Self {
        let media_types = codec.media_types();
        let Some(&canonical) = media_types.first() else {
            tracing::warn!("ignoring codec without media types");
            return self;
        };

        let codec: Arc<dyn Codec> = Arc::new(codec);
        for &media_type in media_types {
            let entry = CodecEntry {
                media_type,
                codec: Arc::clone(&codec),
            };
            if self
                .codecs
                .insert(media_type.to_ascii_lowercase(), entry)
                .is_some()
            {
                tracing::debug!(%media_type, "codec registration replaced an earlier codec");
            }
            self.catalogue.push(media_type);
        }

        if self.default.is_none() {
            self.default = Some(CodecEntry {
                media_type: canonical,
                codec,
            });
        }
        self
    }

    /// Media types in registration order; the negotiation catalogue.
    #[must_use]
    pub fn media_types(&self) -> &[&'static str] {
        &self.catalogue
    }

    /// Catalogue entries whose codec can read request bodies.
    #[must_use]
    pub fn decodable_media_types(&self) -> Vec<&'static str> {
        self.catalogue
            .iter()
            .copied()
            .filter(|mt| self.lookup(mt).is_some_and(|e| e.codec.can_decode()))
            .collect()
    }

    #[must_use]
    pub fn default_media_type(&self) -> Option<&'static str> {
        self.default.as_ref().map(|e| e.media_type)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.default.is_none()
    }

    /// Exact lookup, without falling back to the default.
    #[must_use]
    pub fn lookup(&self, media_type: &str) -> Option<&CodecEntry> {
        self.codecs.get(&media_type.to_ascii_lowercase())
    }

    /// Exact lookup, falling back to the default codec.
    #[must_use]
    pub fn select(&self, media_type: &str) -> Option<CodecEntry> {
        self.lookup(media_type).or(self.default.as_ref()).cloned()
    }

    /// Encoder for `media_type`, backed by the default codec on a miss.
    pub fn encoder<'w>(
        &self,
        media_type: &str,
        writer: &'w mut dyn Write,
        edit_mode: bool,
    ) -> Box<dyn Encoder + 'w> {
        match self.select(media_type) {
            Some(entry) => entry.codec.new_encoder(writer, edit_mode),
            None => Box::new(Unavailable),
        }
    }

    /// Decoder for `media_type`, backed by the default codec on a miss.
    pub fn decoder<'r>(&self, media_type: &str, reader: &'r mut dyn Read) -> Box<dyn Decoder + 'r> {
        match self.select(media_type) {
            Some(entry) => entry.codec.new_decoder(reader),
            None => Box::new(Unavailable),
        }
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("catalogue", &self.catalogue)
            .field("default", &self.default_media_type())
            .finish_non_exhaustive()
    }
}

/// Stand-in returned by an empty registry.
struct Unavailable;

impl Encoder for Unavailable {
    fn encode(&mut self, _value: &Value) -> Result<(), CodecError> {
        Err(CodecError::NoCodec)
    }
}

impl Decoder for Unavailable {
    fn decode(&mut self) -> Result<Value, CodecError> {
        Err(CodecError::NoCodec)
    }
}

/// Encode `value` into a fresh buffer.
///
/// # Errors
/// Returns the encoder's [`CodecError`].
pub fn encode_to_vec(entry: &CodecEntry, value: &Value, edit_mode: bool) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    entry.codec.new_encoder(&mut buf, edit_mode).encode(value)?;
    Ok(buf)
}

/// Decode one value from `body`.
///
/// # Errors
/// Returns the decoder's [`CodecError`].
pub fn decode_slice(entry: &CodecEntry, mut body: &[u8]) -> Result<Value, CodecError> {
    entry.codec.new_decoder(&mut body).decode()
}
