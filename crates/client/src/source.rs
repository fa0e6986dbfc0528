//! Byte-stream sources for generation responses.
//!
//! `TextSource` is the seam between the stream controller and the network:
//! the controller only sees an opened byte stream, so tests can substitute a
//! scripted source for the HTTP transport.

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::Stream;
use reqwest::Client as HttpClient;
use serde::Serialize;
use std::pin::Pin;

use rill_core::{Error, Result};

/// An open response body: raw bytes, no framing.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A source of generation output for one prompt.
#[async_trait::async_trait]
pub trait TextSource: Send + Sync {
    /// Issue the request and return the response body stream.
    ///
    /// Returns an error for connection failures and for non-2xx statuses;
    /// in both cases no bytes were read and the session terminates `Failed`.
    async fn open(&self, prompt: &str) -> Result<ByteStream>;
}

/// Outbound request body: `{"prompt": "..."}`.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

/// HTTP transport for the generation endpoint.
pub struct HttpSource {
    client: HttpClient,
    endpoint: String,
}

impl HttpSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { client: HttpClient::new(), endpoint: endpoint.into() }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl TextSource for HttpSource {
    async fn open(&self, prompt: &str) -> Result<ByteStream> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&GenerateRequest { prompt })
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "generation request rejected");
            return Err(Error::Status(status.as_u16()));
        }

        let stream = response
            .bytes_stream()
            .map(|item| item.map_err(|e| Error::Transport(e.to_string())));

        Ok(Box::pin(stream))
    }
}
