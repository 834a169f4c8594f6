use percent_encoding::percent_decode;
use std::borrow::Cow;
use std::collections::BTreeMap;

use super::{ContentDecoder, DecodeError, Result, as_bytes};
use crate::content::{Content, ResponseMeta};

pub type FormMap = BTreeMap<String, String>;

/// Parses a buffered `application/x-www-form-urlencoded` body
///
/// - keys and values must be UTF-8 once percent-decoded, whether the bytes
///   arrive raw or escaped
/// - when a key repeats, the last value wins
/// - a pair without `=` maps to an empty string
/// - empty segments between `&` are skipped
/// - `%` not followed by two hex digits is kept as is
pub fn as_urlencoded(content: Content) -> Result<FormMap> {
    let bytes = as_bytes(content)?;
    let mut form = FormMap::new();

    for pair in bytes.split(|&b| b == b'&').filter(|pair| !pair.is_empty()) {
        let (key, value) = match pair.iter().position(|&b| b == b'=') {
            Some(eq) => (&pair[..eq], &pair[eq + 1..]),
            None => (pair, &pair[pair.len()..]),
        };
        form.insert(decode_component(key)?, decode_component(value)?);
    }

    Ok(form)
}

fn decode_component(raw: &[u8]) -> Result<String> {
    let spaced: Vec<u8> = raw.iter().map(|&b| if b == b'+' { b' ' } else { b }).collect();
    percent_decode(&spaced)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|e| DecodeError::UrlEncoded(format!("{}: {}", String::from_utf8_lossy(raw), e)))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UrlEncodedDecoder;

impl ContentDecoder for UrlEncodedDecoder {
    type Output = FormMap;

    fn decode(&self, content: Content, _meta: &ResponseMeta) -> Result<FormMap> {
        as_urlencoded(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::path::PathBuf;

    fn form(pairs: &[(&str, &str)]) -> FormMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_simple_pairs() {
        let parsed = as_urlencoded(Content::from("a=1&b=2")).unwrap();
        assert_eq!(parsed, form(&[("a", "1"), ("b", "2")]));
    }

    #[test]
    fn test_missing_value_is_empty_string() {
        let parsed = as_urlencoded(Content::from("a")).unwrap();
        assert_eq!(parsed, form(&[("a", "")]));
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let parsed = as_urlencoded(Content::from("k=first&k=second")).unwrap();
        assert_eq!(parsed, form(&[("k", "second")]));
    }

    #[test]
    fn test_percent_and_plus_decoding() {
        let parsed = as_urlencoded(Content::from("na%20me=J%C3%BCrgen+M&e=a%3Db")).unwrap();
        assert_eq!(parsed, form(&[("na me", "Jürgen M"), ("e", "a=b")]));
    }

    #[test]
    fn test_empty_segments_skipped() {
        let parsed = as_urlencoded(Content::from("a=1&&b=2&")).unwrap();
        assert_eq!(parsed, form(&[("a", "1"), ("b", "2")]));
    }

    #[test]
    fn test_invalid_escape_kept_literally() {
        let parsed = as_urlencoded(Content::from("q=100%zz")).unwrap();
        assert_eq!(parsed, form(&[("q", "100%zz")]));
    }

    #[test]
    fn test_empty_body() {
        assert!(as_urlencoded(Content::from("")).unwrap().is_empty());
    }

    #[test]
    fn test_non_utf8_body_is_malformed() {
        let err = as_urlencoded(Content::Data(Bytes::from_static(b"a=\xFF"))).unwrap_err();
        assert!(matches!(err, DecodeError::UrlEncoded(_)));
        assert!(!err.is_shape_mismatch());
    }

    #[test]
    fn test_escaped_non_utf8_is_malformed() {
        let err = as_urlencoded(Content::from("a=%FF")).unwrap_err();
        assert!(matches!(err, DecodeError::UrlEncoded(_)));

        let err = as_urlencoded(Content::from("%C3=1")).unwrap_err();
        assert!(matches!(err, DecodeError::UrlEncoded(_)));
    }

    #[test]
    fn test_escaped_plus_stays_literal() {
        let parsed = as_urlencoded(Content::from("sum=1%2B1+%3D+2")).unwrap();
        assert_eq!(parsed, form(&[("sum", "1+1 = 2")]));
    }

    #[test]
    fn test_rejects_file() {
        let err = as_urlencoded(Content::File(PathBuf::from("/tmp/form"))).unwrap_err();
        assert!(err.is_shape_mismatch());
    }
}
