use std::io::{Read, Write};

use serde_json::Value;

use super::{Codec, CodecError, Decoder, Encoder};

const MEDIA_TYPES: &[&str] = &["application/json", "text/json"];

/// JSON via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn media_types(&self) -> &'static [&'static str] {
        MEDIA_TYPES
    }

    fn new_encoder<'w>(&self, writer: &'w mut dyn Write, _edit_mode: bool) -> Box<dyn Encoder + 'w> {
        Box::new(JsonEncoder { writer })
    }

    fn new_decoder<'r>(&self, reader: &'r mut dyn Read) -> Box<dyn Decoder + 'r> {
        Box::new(JsonDecoder { reader })
    }
}

struct JsonEncoder<'w> {
    writer: &'w mut dyn Write,
}

impl Encoder for JsonEncoder<'_> {
    fn encode(&mut self, value: &Value) -> Result<(), CodecError> {
        serde_json::to_writer(&mut *self.writer, value).map_err(|e| CodecError::Encode {
            media_type: MEDIA_TYPES[0],
            message: e.to_string(),
        })
    }
}

struct JsonDecoder<'r> {
    reader: &'r mut dyn Read,
}

impl Decoder for JsonDecoder<'_> {
    fn decode(&mut self) -> Result<Value, CodecError> {
        serde_json::from_reader(&mut *self.reader).map_err(|e| CodecError::Decode {
            media_type: MEDIA_TYPES[0],
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_truncated_documents() {
        let mut body: &[u8] = br#"{"name":"#;
        let err = JsonCodec.new_decoder(&mut body).decode().unwrap_err();
        assert!(matches!(err, CodecError::Decode { media_type: "application/json", .. }));
    }

    #[test]
    fn writes_compact_json() {
        let mut out = Vec::new();
        JsonCodec
            .new_encoder(&mut out, true)
            .encode(&json!({"id": "7", "tags": ["a"]}))
            .unwrap();
        assert_eq!(out, br#"{"id":"7","tags":["a"]}"#);
    }
}
