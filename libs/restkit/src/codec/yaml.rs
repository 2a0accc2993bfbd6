use std::io::{Read, Write};

use serde_json::Value;

use super::{Codec, CodecError, Decoder, Encoder};

const MEDIA_TYPES: &[&str] = &["application/yaml", "application/x-yaml", "text/yaml"];

/// YAML via `serde_yaml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn media_types(&self) -> &'static [&'static str] {
        MEDIA_TYPES
    }

    fn new_encoder<'w>(&self, writer: &'w mut dyn Write, _edit_mode: bool) -> Box<dyn Encoder + 'w> {
        Box::new(YamlEncoder { writer })
    }

    fn new_decoder<'r>(&self, reader: &'r mut dyn Read) -> Box<dyn Decoder + 'r> {
        Box::new(YamlDecoder { reader })
    }
}

struct YamlEncoder<'w> {
    writer: &'w mut dyn Write,
}

impl Encoder for YamlEncoder<'_> {
    fn encode(&mut self, value: &Value) -> Result<(), CodecError> {
        serde_yaml::to_writer(&mut *self.writer, value).map_err(|e| CodecError::Encode {
            media_type: MEDIA_TYPES[0],
            message: e.to_string(),
        })
    }
}

struct YamlDecoder<'r> {
    reader: &'r mut dyn Read,
}

impl Decoder for YamlDecoder<'_> {
    fn decode(&mut self) -> Result<Value, CodecError> {
        serde_yaml::from_reader(&mut *self.reader).map_err(|e| CodecError::Decode {
            media_type: MEDIA_TYPES[0],
            message: e.to_string(),
        })
    }
}
