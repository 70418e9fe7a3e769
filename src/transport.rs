//! Transport to the model server
//!
//! The [`Transport`] trait is the seam between the artifact pipeline and the
//! network. [`HttpTransport`] talks to a real server with `reqwest`; tests
//! plug in in-memory implementations.

use crate::config::ClientConfig;
use crate::digest::BlobDigest;
use crate::error::{ClientError, ClientResult};
use crate::types::{CreateModelBody, CreateRequest, ProgressResponse};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

/// Byte stream consumed exactly once as an upload body
pub type UploadBody = BoxStream<'static, std::io::Result<Vec<u8>>>;

/// Live sequence of progress events from a streamed create
pub type ProgressStream = BoxStream<'static, ClientResult<ProgressResponse>>;

/// Outcome of a blob existence probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobStatus {
    Present,
    Missing,
}

/// Operations the pipeline needs from the server
#[async_trait]
pub trait Transport: Send + Sync {
    /// Check whether the server holds a blob for `digest`
    async fn probe(&self, digest: &BlobDigest) -> ClientResult<BlobStatus>;

    /// Upload the full content for `digest`
    async fn upload(&self, digest: &BlobDigest, body: UploadBody) -> ClientResult<()>;

    /// Create a model and wait for the final status
    async fn create_model(&self, request: &CreateRequest) -> ClientResult<ProgressResponse>;

    /// Create a model and stream progress events as they arrive
    async fn create_model_stream(&self, request: &CreateRequest) -> ClientResult<ProgressStream>;

    /// Whether request bodies can be streamed rather than buffered
    fn supports_streaming_upload(&self) -> bool {
        true
    }
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport from configuration
    ///
    /// Only the connect timeout is set on the client itself; the request
    /// deadline applies to probes and non-streamed creates, never to uploads.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let base_url = config.base_url()?;

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(concat!("modelfile-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Transport {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            base_url,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base_url.join(path).map_err(|e| ClientError::Decode {
            endpoint: path.to_string(),
            message: format!("invalid endpoint URL: {}", e),
        })
    }

    fn blob_url(&self, digest: &BlobDigest) -> ClientResult<Url> {
        self.url(&format!("api/blobs/{}", digest))
    }

    async fn send_create(
        &self,
        request: &CreateRequest,
        stream: bool,
    ) -> ClientResult<reqwest::Response> {
        let endpoint = "POST /api/create";
        let mut body = CreateModelBody::from(request);
        body.stream = stream;

        let mut builder = self.http.post(self.url("api/create")?).json(&body);
        if !stream {
            builder = builder.timeout(self.timeout);
        }

        let resp = builder.send().await.map_err(|e| ClientError::Transport {
            endpoint: endpoint.into(),
            source: e,
        })?;

        ensure_success(endpoint, resp).await
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn probe(&self, digest: &BlobDigest) -> ClientResult<BlobStatus> {
        let endpoint = "HEAD /api/blobs";

        let resp = self
            .http
            .head(self.blob_url(digest)?)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClientError::Transport {
                endpoint: endpoint.into(),
                source: e,
            })?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(BlobStatus::Missing);
        }
        if status.is_success() {
            return Ok(BlobStatus::Present);
        }

        Err(ClientError::Api {
            endpoint: endpoint.into(),
            status: status.as_u16(),
            body: String::new(),
        })
    }

    async fn upload(&self, digest: &BlobDigest, body: UploadBody) -> ClientResult<()> {
        let endpoint = "POST /api/blobs";

        let resp = self
            .http
            .post(self.blob_url(digest)?)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await
            .map_err(|e| ClientError::Transport {
                endpoint: endpoint.into(),
                source: e,
            })?;

        ensure_success(endpoint, resp).await?;
        Ok(())
    }

    async fn create_model(&self, request: &CreateRequest) -> ClientResult<ProgressResponse> {
        let endpoint = "POST /api/create";
        let resp = self.send_create(request, false).await?;

        let text = resp.text().await.map_err(|e| ClientError::Transport {
            endpoint: endpoint.into(),
            source: e,
        })?;

        // Some servers answer with NDJSON even when streaming is off; the
        // last event is the result
        let mut last = None;
        for line in text.lines() {
            if let Some(event) = decode_progress_line(endpoint, line.as_bytes())? {
                last = Some(event);
            }
        }

        last.ok_or_else(|| ClientError::Decode {
            endpoint: endpoint.into(),
            message: "empty response body".to_string(),
        })
    }

    async fn create_model_stream(&self, request: &CreateRequest) -> ClientResult<ProgressStream> {
        let resp = self.send_create(request, true).await?;
        Ok(ndjson_events("POST /api/create", resp.bytes_stream()))
    }
}

async fn ensure_success(
    endpoint: &str,
    resp: reqwest::Response,
) -> ClientResult<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }

    let status = resp.status().as_u16();
    let body = match resp.text().await {
        Ok(body) => server_error_message(&body).unwrap_or(body),
        Err(e) => format!("<body unreadable: {}>", e),
    };
    Err(ClientError::Api {
        endpoint: endpoint.into(),
        status,
        body,
    })
}

/// Pull the message out of an `{"error": "..."}` body
fn server_error_message(body: &str) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: String,
    }

    serde_json::from_str::<ErrorBody>(body).ok().map(|b| b.error)
}

/// Decode one NDJSON line; blank lines yield `None`
fn decode_progress_line(endpoint: &str, line: &[u8]) -> ClientResult<Option<ProgressResponse>> {
    let text = std::str::from_utf8(line).map_err(|e| ClientError::Decode {
        endpoint: endpoint.into(),
        message: e.to_string(),
    })?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if let Some(message) = server_error_message(text) {
        return Err(ClientError::Api {
            endpoint: endpoint.into(),
            status: StatusCode::OK.as_u16(),
            body: message,
        });
    }

    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| ClientError::Decode {
            endpoint: endpoint.into(),
            message: e.to_string(),
        })
}

/// Split a chunked body into newline-delimited progress events
///
/// The stream ends after the first error.
fn ndjson_events<S, B, E>(endpoint: &'static str, chunks: S) -> ProgressStream
where
    S: futures::Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ClientErrorSource> + Send + 'static,
{
    let events = async_stream::stream! {
        futures::pin_mut!(chunks);
        let mut buf: Vec<u8> = Vec::new();

        while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    let source: ClientErrorSource = e.into();
                    yield Err(source.into_client_error(endpoint));
                    return;
                }
            };
            buf.extend_from_slice(chunk.as_ref());

            while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                match decode_progress_line(endpoint, &line) {
                    Ok(Some(event)) => yield Ok(event),
                    Ok(None) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        match decode_progress_line(endpoint, &buf) {
            Ok(Some(event)) => yield Ok(event),
            Ok(None) => {}
            Err(e) => yield Err(e),
        }
    };

    Box::pin(events)
}

/// Errors a chunked body can fail with
pub(crate) enum ClientErrorSource {
    Http(reqwest::Error),
    Io(std::io::Error),
}

impl ClientErrorSource {
    fn into_client_error(self, endpoint: &str) -> ClientError {
        match self {
            Self::Http(source) => ClientError::Transport {
                endpoint: endpoint.into(),
                source,
            },
            Self::Io(source) => ClientError::Decode {
                endpoint: endpoint.into(),
                message: source.to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for ClientErrorSource {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

impl From<std::io::Error> for ClientErrorSource {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
