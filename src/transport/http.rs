//! HTTP transport built on `reqwest`

use async_trait::async_trait;
use reqwest::{Client, Url};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Result, Transport, TransportError};
use crate::config::{HttpConfig, TransferConfig, TransferMode};
use crate::content::{Content, ResponseMeta};

/// Fetches resources with a single GET, no retries
pub struct HttpTransport {
    client: Client,
    transfer: TransferConfig,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig, transfer: TransferConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10));

        if !config.system_proxy {
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        Ok(Self { client, transfer })
    }

    fn stream_to_file(&self, content_length: Option<u64>) -> bool {
        match self.transfer.mode {
            TransferMode::Data => false,
            TransferMode::File => true,
            TransferMode::Auto => {
                content_length.is_some_and(|len| len > self.transfer.max_in_memory_bytes.as_u64())
            }
        }
    }

    async fn write_body(&self, response: reqwest::Response) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.transfer.download_dir).await?;
        let path = self.transfer.download_dir.join(Uuid::new_v4().to_string());

        match write_chunks(response, &path).await {
            Ok(written) => {
                debug!(path = %path.display(), size = written, "Body stored to file");
                Ok(path)
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %cleanup, "Failed to remove partial download");
                }
                Err(e)
            }
        }
    }
}

async fn write_chunks(mut response: reqwest::Response, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| TransportError::RequestFailed(format!("Failed to read body: {}", e)))?
    {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

fn map_request_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_redirect() {
        TransportError::TooManyRedirects
    } else {
        TransportError::RequestFailed(e.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &Url) -> Result<(Content, ResponseMeta)> {
        debug!(%url, "Starting request");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status,
                url: response.url().clone(),
            });
        }

        let meta = ResponseMeta {
            url: response.url().clone(),
            status,
            headers: response.headers().clone(),
            content_length: response.content_length(),
        };

        let content = if self.stream_to_file(meta.content_length) {
            Content::File(self.write_body(response).await?)
        } else {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| TransportError::RequestFailed(format!("Failed to read body: {}", e)))?;
            debug!(%url, size = bytes.len(), "Body buffered");
            Content::Data(bytes)
        };

        Ok((content, meta))
    }
}
