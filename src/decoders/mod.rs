//! Content decoders
//!
//! Each decoder turns a [`Content`] into one typed value, checking first that
//! the content has the kind it needs. Decoding is synchronous and free of side
//! effects; it runs inline on whatever context completed the response.
//!
//! ## Error kinds
//!
//! - [`DecodeError::InvalidResponse`] - the content is of the wrong kind
//!   (for example a file where a buffer was required)
//! - every other variant - the content had the right kind but could not be
//!   parsed into the requested shape

mod json;
mod text;
mod urlencoded;

use bytes::Bytes;
use std::path::PathBuf;
use thiserror::Error;

use crate::content::{Content, ResponseMeta};

pub use json::{JsonDecoder, TypedDecoder, as_json, as_typed};
pub use text::{Charset, SharedCharset, TextDecoder, UnknownCharset, as_text};
pub use urlencoded::{FormMap, UrlEncodedDecoder, as_urlencoded};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid response")]
    InvalidResponse,

    #[error("malformed JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("malformed url-encoded body: {0}")]
    UrlEncoded(String),

    #[error("failed to deserialize {type_name}: {source}")]
    Deserialize {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// True when the content kind did not match, as opposed to unparsable
    /// content of the right kind
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, DecodeError::InvalidResponse)
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Converts raw content into a typed value
///
/// Implemented by one unit-like type per output shape so the handler adapter
/// can be generic over the decoder.
pub trait ContentDecoder: Send + 'static {
    type Output: Send + 'static;

    fn decode(&self, content: Content, meta: &ResponseMeta) -> Result<Self::Output>;
}

/// Hands back the content and metadata untouched. Never fails.
pub fn as_raw(content: Content, meta: ResponseMeta) -> (Content, ResponseMeta) {
    (content, meta)
}

pub fn as_bytes(content: Content) -> Result<Bytes> {
    match content {
        Content::Data(bytes) => Ok(bytes),
        Content::File(_) => Err(DecodeError::InvalidResponse),
    }
}

pub fn as_file(content: Content) -> Result<PathBuf> {
    match content {
        Content::File(path) => Ok(path),
        Content::Data(_) => Err(DecodeError::InvalidResponse),
    }
}

/// Passes [`Content`] through as-is
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl ContentDecoder for RawDecoder {
    type Output = Content;

    fn decode(&self, content: Content, _meta: &ResponseMeta) -> Result<Content> {
        Ok(content)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BytesDecoder;

impl ContentDecoder for BytesDecoder {
    type Output = Bytes;

    fn decode(&self, content: Content, _meta: &ResponseMeta) -> Result<Bytes> {
        as_bytes(content)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileDecoder;

impl ContentDecoder for FileDecoder {
    type Output = PathBuf;

    fn decode(&self, content: Content, _meta: &ResponseMeta) -> Result<PathBuf> {
        as_file(content)
    }
}
