use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use thiserror::Error;
use tracing::debug;

use super::{ContentDecoder, DecodeError, Result};
use crate::content::{Content, ResponseMeta};

/// Character encodings understood by the text decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Charset {
    #[default]
    Utf8,
    UsAscii,
    Latin1,
    Utf16Le,
    Utf16Be,
}

#[derive(Debug, Error)]
#[error("unsupported charset: {0}")]
pub struct UnknownCharset(pub String);

impl Charset {
    const ALL: [Charset; 5] = [
        Charset::Utf8,
        Charset::UsAscii,
        Charset::Latin1,
        Charset::Utf16Le,
        Charset::Utf16Be,
    ];

    /// Looks up a charset by its IANA label or a common alias
    pub fn from_label(label: &str) -> Option<Self> {
        let charset = match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Charset::Utf8,
            "us-ascii" | "ascii" => Charset::UsAscii,
            "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "l1" => Charset::Latin1,
            "utf-16le" => Charset::Utf16Le,
            "utf-16be" | "utf-16" => Charset::Utf16Be,
            _ => return None,
        };
        Some(charset)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Charset::Utf8 => "utf-8",
            Charset::UsAscii => "us-ascii",
            Charset::Latin1 => "iso-8859-1",
            Charset::Utf16Le => "utf-16le",
            Charset::Utf16Be => "utf-16be",
        }
    }

    /// Decodes `bytes`, replacing malformed sequences with U+FFFD
    pub fn decode_lossy(&self, bytes: &[u8]) -> String {
        match self {
            Charset::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                String::from_utf8_lossy(bytes).into_owned()
            }
            Charset::UsAscii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
                .collect(),
            Charset::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            Charset::Utf16Le | Charset::Utf16Be => decode_utf16_lossy(bytes, *self == Charset::Utf16Le),
        }
    }
}

fn decode_utf16_lossy(bytes: &[u8], little_endian: bool) -> String {
    // A byte order mark overrides the declared endianness
    let (bytes, little_endian) = match bytes {
        [0xFF, 0xFE, rest @ ..] => (rest, true),
        [0xFE, 0xFF, rest @ ..] => (rest, false),
        _ => (bytes, little_endian),
    };

    let chunks = bytes.chunks_exact(2);
    let dangling = !chunks.remainder().is_empty();
    let units = chunks.map(|pair| {
        let pair = [pair[0], pair[1]];
        if little_endian {
            u16::from_le_bytes(pair)
        } else {
            u16::from_be_bytes(pair)
        }
    });

    let mut text: String = char::decode_utf16(units)
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    if dangling {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

impl FromStr for Charset {
    type Err = UnknownCharset;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Charset::from_label(s).ok_or_else(|| UnknownCharset(s.to_string()))
    }
}

impl TryFrom<String> for Charset {
    type Error = UnknownCharset;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Charset> for String {
    fn from(charset: Charset) -> Self {
        charset.label().to_string()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decodes a buffered body into a `String`
///
/// The charset comes from the `Content-Type` header when it names one we
/// support; otherwise `default_charset` applies. Malformed input is never an
/// error, bad sequences become U+FFFD.
pub fn as_text(content: Content, meta: &ResponseMeta, default_charset: Charset) -> Result<String> {
    let bytes = match content {
        Content::Data(bytes) => bytes,
        Content::File(_) => return Err(DecodeError::InvalidResponse),
    };

    let charset = match meta.charset() {
        Some(label) => Charset::from_label(&label).unwrap_or_else(|| {
            debug!(label = %label, fallback = %default_charset, "Unsupported charset, using default");
            default_charset
        }),
        None => default_charset,
    };

    Ok(charset.decode_lossy(&bytes))
}

/// Fallback charset shared between a task and its text handlers
///
/// Handlers read it at decode time, so a change made after a handler was
/// installed still applies.
#[derive(Debug, Clone, Default)]
pub struct SharedCharset(Arc<AtomicU8>);

impl SharedCharset {
    pub fn new(charset: Charset) -> Self {
        Self(Arc::new(AtomicU8::new(charset as u8)))
    }

    pub fn get(&self) -> Charset {
        let index = usize::from(self.0.load(Ordering::Acquire));
        Charset::ALL.get(index).copied().unwrap_or_default()
    }

    pub fn set(&self, charset: Charset) {
        self.0.store(charset as u8, Ordering::Release);
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextDecoder {
    default_charset: SharedCharset,
}

impl TextDecoder {
    pub fn new(default_charset: Charset) -> Self {
        Self::shared(SharedCharset::new(default_charset))
    }

    /// Decoder that follows later changes to `default_charset`
    pub fn shared(default_charset: SharedCharset) -> Self {
        Self { default_charset }
    }
}

impl ContentDecoder for TextDecoder {
    type Output = String;

    fn decode(&self, content: Content, meta: &ResponseMeta) -> Result<String> {
        as_text(content, meta, self.default_charset.get())
    }
}
