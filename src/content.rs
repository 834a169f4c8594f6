//! Raw response content and its transport metadata
//!
//! [`Content`] is what the transport hands over once a response body has been
//! fully received: either an in-memory buffer or the location of a file the
//! body was streamed into. No decoding has been applied yet.

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use std::fmt;
use std::path::PathBuf;

/// Received response body, before any decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Body buffered in memory
    Data(Bytes),
    /// Body written to a file on disk
    File(PathBuf),
}

/// Tag of a [`Content`] value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Data,
    File,
}

impl Content {
    pub fn kind(&self) -> ContentKind {
        match self {
            Content::Data(_) => ContentKind::Data,
            Content::File(_) => ContentKind::File,
        }
    }
}

impl From<Bytes> for Content {
    fn from(bytes: Bytes) -> Self {
        Content::Data(bytes)
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::Data(Bytes::from(bytes))
    }
}

impl From<&'static str> for Content {
    fn from(text: &'static str) -> Self {
        Content::Data(Bytes::from_static(text.as_bytes()))
    }
}

impl From<PathBuf> for Content {
    fn from(path: PathBuf) -> Self {
        Content::File(path)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Data => f.write_str("data"),
            ContentKind::File => f.write_str("file"),
        }
    }
}

/// Protocol-level response descriptor passed alongside [`Content`]
///
/// Callbacks receive it untouched. The only reader inside the crate is the
/// text decoder, which looks at the `Content-Type` charset.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub content_length: Option<u64>,
}

impl ResponseMeta {
    /// Metadata for a `200 OK` response with no headers
    pub fn new(url: Url) -> Self {
        Self {
            url,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            content_length: None,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    /// Parsed `Content-Type` header, if present and well-formed
    pub fn mime_type(&self) -> Option<mime::Mime> {
        self.headers
            .get(CONTENT_TYPE)?
            .to_str()
            .ok()?
            .parse()
            .ok()
    }

    /// `charset` parameter of the `Content-Type` header, lowercased
    pub fn charset(&self) -> Option<String> {
        let media_type = self.mime_type()?;
        let charset = media_type.get_param(mime::CHARSET)?;
        Some(charset.as_str().to_ascii_lowercase())
    }
}
