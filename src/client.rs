//! Model creation entry point
//!
//! [`Client::create`] reads or accepts a modelfile, uploads the local
//! artifacts it references, and forwards the rewritten modelfile to the
//! server's create endpoint.

use crate::blob::BlobUploader;
use crate::config::ClientConfig;
use crate::digest::BlobDigest;
use crate::error::{ClientError, ClientResult};
use crate::modelfile::ModelfileRewriter;
use crate::paths::PathResolver;
use crate::transport::{HttpTransport, ProgressStream, Transport};
use crate::types::{CreateRequest, ProgressResponse};
use futures::StreamExt;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of a create call, shaped by the request's `stream` flag
pub enum CreateResponse {
    /// Final status of a non-streamed create
    Single(ProgressResponse),
    /// Live progress events of a streamed create
    Stream(ProgressStream),
}

impl CreateResponse {
    /// Drain the response and return the last event
    pub async fn finish(self) -> ClientResult<ProgressResponse> {
        match self {
            Self::Single(resp) => Ok(resp),
            Self::Stream(mut events) => {
                let mut last = None;
                while let Some(event) = events.next().await {
                    last = Some(event?);
                }
                last.ok_or_else(|| ClientError::Decode {
                    endpoint: "POST /api/create".into(),
                    message: "stream ended without a status".to_string(),
                })
            }
        }
    }
}

impl fmt::Debug for CreateResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(resp) => f.debug_tuple("Single").field(resp).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Client for creating models from modelfiles
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    chunk_size: usize,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create an HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(Arc::new(transport), config.upload_chunk_size))
    }

    /// Create a client over any transport
    pub fn with_transport(transport: Arc<dyn Transport>, chunk_size: usize) -> Self {
        Self {
            transport,
            chunk_size,
        }
    }

    /// Upload a single file as a blob if the server lacks it
    pub async fn ensure_blob(&self, path: &Path) -> ClientResult<BlobDigest> {
        self.uploader().ensure_blob(path).await
    }

    /// Rewrite a modelfile, resolving relative paths against `base_dir`
    ///
    /// A relative `base_dir` is taken relative to the current directory.
    pub async fn rewrite_modelfile(&self, modelfile: &str, base_dir: &Path) -> ClientResult<String> {
        let resolver = PathResolver::new(base_dir).map_err(|e| ClientError::io(base_dir, e))?;
        ModelfileRewriter::new(&resolver, self.uploader())
            .rewrite(modelfile)
            .await
    }

    /// Create a model, resolving inline modelfiles against the current directory
    pub async fn create(&self, request: CreateRequest) -> ClientResult<CreateResponse> {
        let cwd = std::env::current_dir().map_err(|e| ClientError::io(".", e))?;
        self.create_from_dir(request, &cwd).await
    }

    /// Create a model with an explicit working directory
    ///
    /// `cwd` is the base for inline modelfiles and for relative `path`
    /// values. A modelfile read from `path` resolves its directives against
    /// its own directory.
    pub async fn create_from_dir(
        &self,
        mut request: CreateRequest,
        cwd: &Path,
    ) -> ClientResult<CreateResponse> {
        let modelfile = if let Some(path) = request.path.take() {
            let path = cwd.join(path);
            let content = tokio::fs::read(&path)
                .await
                .map_err(|e| ClientError::io(&path, e))?;
            let content = String::from_utf8(content).map_err(|e| {
                ClientError::io(
                    &path,
                    std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                )
            })?;

            let base_dir = modelfile_dir(&path, cwd);
            tracing::info!(model = %request.model, path = ?path, "Creating model from modelfile");
            self.rewrite_modelfile(&content, &base_dir).await?
        } else if let Some(modelfile) = request.modelfile.as_deref() {
            tracing::info!(model = %request.model, base_dir = ?cwd, "Creating model from inline modelfile");
            self.rewrite_modelfile(modelfile, cwd).await?
        } else {
            return Err(ClientError::InvalidArgument(
                "must provide either path or modelfile to create a model".to_string(),
            ));
        };

        request.modelfile = Some(modelfile);
        crate::metrics::record_model_create(&request.model, request.stream);

        if request.stream {
            let events = self.transport.create_model_stream(&request).await?;
            Ok(CreateResponse::Stream(events))
        } else {
            let resp = self.transport.create_model(&request).await?;
            tracing::info!(model = %request.model, status = %resp.status, "Model create finished");
            Ok(CreateResponse::Single(resp))
        }
    }

    fn uploader(&self) -> BlobUploader<'_, dyn Transport> {
        BlobUploader::new(self.transport.as_ref(), self.chunk_size)
    }
}

/// Directory a modelfile path resolves against, made absolute under `cwd`
fn modelfile_dir(path: &Path, cwd: &Path) -> PathBuf {
    cwd.join(path)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.to_path_buf())
}
