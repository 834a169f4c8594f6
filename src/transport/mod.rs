//! Transport: produces the raw content a task's handler consumes
//!
//! The dispatch core only needs `(Content, ResponseMeta)` once a response is
//! complete. [`Transport`] is the seam that provides it; [`HttpTransport`]
//! fetches over HTTP with `reqwest`, [`MockTransport`] replays a canned reply.

mod http;

use async_trait::async_trait;
use reqwest::Url;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

use crate::content::{Content, ResponseMeta};

pub use http::HttpTransport;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Too many redirects")]
    TooManyRedirects,

    #[error("HTTP {status} from {url}")]
    Status { status: reqwest::StatusCode, url: Url },

    #[error("Failed to store response body: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Fetches one resource and returns its body with response metadata
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<(Content, ResponseMeta)>;
}

/// Canned reply returned by [`MockTransport`]
#[derive(Debug, Clone)]
pub enum MockReply {
    Response(Content, ResponseMeta),
    Failure(String),
}

/// Transport that answers every request with the same reply
#[derive(Debug)]
pub struct MockTransport {
    reply: MockReply,
    calls: AtomicUsize,
}

impl MockTransport {
    pub fn new(reply: MockReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    /// Replies with `content` and a plain `200 OK` for the requested URL
    pub fn responding(content: impl Into<Content>) -> Self {
        let url = Url::parse("mock://response").expect("static URL is valid");
        Self::new(MockReply::Response(content.into(), ResponseMeta::new(url)))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(MockReply::Failure(message.into()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, url: &Url) -> Result<(Content, ResponseMeta)> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%url, "Mock fetch");

        match &self.reply {
            MockReply::Response(content, meta) => {
                let mut meta = meta.clone();
                meta.url = url.clone();
                Ok((content.clone(), meta))
            }
            MockReply::Failure(message) => Err(TransportError::RequestFailed(message.clone())),
        }
    }
}
