use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::type_name;
use std::marker::PhantomData;

use super::{ContentDecoder, DecodeError, Result, as_bytes};
use crate::content::{Content, ResponseMeta};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parses a buffered body into a dynamic JSON tree. A leading UTF-8 BOM is
/// ignored.
pub fn as_json(content: Content) -> Result<Value> {
    let bytes = as_bytes(content)?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes[..]);
    serde_json::from_slice(body).map_err(DecodeError::Json)
}

/// Parses a buffered body as JSON, then deserializes it into `T`
///
/// Syntax errors surface as [`DecodeError::Json`]; a well-formed document
/// that does not fit `T` surfaces as [`DecodeError::Deserialize`].
pub fn as_typed<T: DeserializeOwned>(content: Content) -> Result<T> {
    let value = as_json(content)?;
    serde_json::from_value(value).map_err(|source| DecodeError::Deserialize {
        type_name: type_name::<T>(),
        source,
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl ContentDecoder for JsonDecoder {
    type Output = Value;

    fn decode(&self, content: Content, _meta: &ResponseMeta) -> Result<Value> {
        as_json(content)
    }
}

pub struct TypedDecoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedDecoder<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned + Send + 'static> ContentDecoder for TypedDecoder<T> {
    type Output = T;

    fn decode(&self, content: Content, _meta: &ResponseMeta) -> Result<T> {
        as_typed(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::path::PathBuf;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Account {
        id: u64,
        name: String,
        #[serde(default)]
        tags: Vec<String>,
    }

    #[test]
    fn test_as_json_object() {
        let value = as_json(Content::from(r#"{"a":1}"#)).unwrap();
        assert_eq!(value, json!({ "a": 1 }));
        assert_eq!(value["a"].as_i64(), Some(1));
    }

    #[test]
    fn test_as_json_scalars_and_arrays() {
        assert_eq!(as_json(Content::from("[true, null]")).unwrap(), json!([true, null]));
        assert_eq!(as_json(Content::from("\"s\"")).unwrap(), json!("s"));
    }

    #[test]
    fn test_as_json_malformed_is_not_shape_mismatch() {
        let err = as_json(Content::from("not json")).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
        assert!(!err.is_shape_mismatch());
    }

    #[test]
    fn test_as_json_ignores_utf8_bom() {
        let content = Content::Data(bytes::Bytes::from_static(b"\xEF\xBB\xBF{\"a\":1}"));
        assert_eq!(as_json(content).unwrap(), json!({ "a": 1 }));

        let content = Content::Data(bytes::Bytes::from_static(b"\xEF\xBB\xBF{\"id\":1,\"name\":\"b\"}"));
        assert_eq!(as_typed::<Account>(content).unwrap().id, 1);
    }

    #[test]
    fn test_as_json_empty_body_is_malformed() {
        assert!(matches!(as_json(Content::from("")), Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_as_json_rejects_file() {
        let err = as_json(Content::File(PathBuf::from("/tmp/a.json"))).unwrap_err();
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn test_as_typed() {
        let account: Account =
            as_typed(Content::from(r#"{"id": 7, "name": "ada", "tags": ["admin"]}"#)).unwrap();
        assert_eq!(
            account,
            Account {
                id: 7,
                name: "ada".to_string(),
                tags: vec!["admin".to_string()],
            }
        );
    }

    #[test]
    fn test_as_typed_schema_mismatch() {
        let err = as_typed::<Account>(Content::from(r#"{"id": "seven"}"#)).unwrap_err();
        match err {
            DecodeError::Deserialize { type_name, .. } => assert!(type_name.ends_with("Account")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_as_typed_syntax_error() {
        let err = as_typed::<Account>(Content::from("{\"id\": ")).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn test_as_typed_rejects_file() {
        let err = as_typed::<Account>(Content::File(PathBuf::from("/tmp/a.json"))).unwrap_err();
        assert!(err.is_shape_mismatch());
    }
}
