use std::io::{Read, Write};

use serde_json::{Map, Value};

use super::{Codec, CodecError, Decoder, Encoder};

const MEDIA_TYPE: &str = "application/x-www-form-urlencoded";

/// Flat `application/x-www-form-urlencoded` bodies.
///
/// Only objects whose members are scalars can be encoded. Decoded members are
/// always strings; the entity's deserializer is responsible for coercion.
/// When a key repeats, the last occurrence wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormCodec;

impl Codec for FormCodec {
    fn media_types(&self) -> &'static [&'static str] {
        &[MEDIA_TYPE]
    }

    fn new_encoder<'w>(&self, writer: &'w mut dyn Write, _edit_mode: bool) -> Box<dyn Encoder + 'w> {
        Box::new(FormEncoder { writer })
    }

    fn new_decoder<'r>(&self, reader: &'r mut dyn Read) -> Box<dyn Decoder + 'r> {
        Box::new(FormDecoder { reader })
    }
}

fn encode_error(message: impl Into<String>) -> CodecError {
    CodecError::Encode {
        media_type: MEDIA_TYPE,
        message: message.into(),
    }
}

struct FormEncoder<'w> {
    writer: &'w mut dyn Write,
}

impl Encoder for FormEncoder<'_> {
    fn encode(&mut self, value: &Value) -> Result<(), CodecError> {
        let Value::Object(members) = value else {
            return Err(encode_error("only objects can be form encoded"));
        };

        let mut pairs = Vec::with_capacity(members.len());
        for (key, member) in members {
            let text = match member {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                Value::Bool(_) | Value::Number(_) => member.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(encode_error(format!("member `{key}` is not a scalar")));
                }
            };
            pairs.push((key.as_str(), text));
        }

        let body = serde_urlencoded::to_string(&pairs).map_err(|e| encode_error(e.to_string()))?;
        self.writer.write_all(body.as_bytes())?;
        Ok(())
    }
}

struct FormDecoder<'r> {
    reader: &'r mut dyn Read,
}

impl Decoder for FormDecoder<'_> {
    fn decode(&mut self) -> Result<Value, CodecError> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;

        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_bytes(&buf).map_err(|e| CodecError::Decode {
                media_type: MEDIA_TYPE,
                message: e.to_string(),
            })?;

        let mut members = Map::new();
        for (key, value) in pairs {
            members.insert(key, Value::String(value));
        }
        Ok(Value::Object(members))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_scalars_and_escapes() {
        let mut out = Vec::new();
        FormCodec
            .new_encoder(&mut out, false)
            .encode(&json!({"name": "Jane Doe", "age": 16, "note": null}))
            .unwrap();
        let body = String::from_utf8(out).unwrap();
        let mut pairs: Vec<&str> = body.split('&').collect();
        pairs.sort_unstable();
        assert_eq!(pairs, ["age=16", "name=Jane+Doe", "note="]);
    }

    #[test]
    fn nested_members_are_rejected() {
        let mut out = Vec::new();
        let err = FormCodec
            .new_encoder(&mut out, false)
            .encode(&json!({"tags": ["a", "b"]}))
            .unwrap_err();
        assert!(err.to_string().contains("`tags`"));

        let err = FormCodec
            .new_encoder(&mut out, false)
            .encode(&json!(["a"]))
            .unwrap_err();
        assert!(matches!(err, CodecError::Encode { .. }));
    }

    #[test]
    fn decodes_into_string_members() {
        let mut body: &[u8] = b"name=Jane%20Doe&birth_date=2009-11-01&name=Janet";
        let value = FormCodec.new_decoder(&mut body).decode().unwrap();
        assert_eq!(value, json!({"name": "Janet", "birth_date": "2009-11-01"}));
    }
}
