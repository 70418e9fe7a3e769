//! Shared fixtures: an in-memory transport that records every call

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use modelfile_client::{
    BlobDigest, BlobStatus, ClientError, ClientResult, CreateRequest, ProgressResponse,
    ProgressStream, Transport, UploadBody,
};
use std::collections::HashSet;
use std::sync::Mutex;

/// One observed transport call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Probe(String),
    Upload { digest: String, bytes: Vec<u8> },
    Create(CreateRequest),
    CreateStream(CreateRequest),
}

/// In-memory blob store standing in for the server
#[derive(Default)]
pub struct RecordingTransport {
    pub blobs: Mutex<HashSet<String>>,
    pub calls: Mutex<Vec<Call>>,
    /// Status returned by probes instead of a lookup, for error injection
    pub probe_failure: Option<u16>,
    pub upload_failure: Option<u16>,
    pub streaming: Option<bool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(self, digest: &BlobDigest) -> Self {
        self.blobs.lock().unwrap().insert(digest.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn probes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Probe(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Upload { digest, bytes } => Some((digest, bytes)),
                _ => None,
            })
            .collect()
    }

    pub fn created(&self) -> Vec<CreateRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create(r) | Call::CreateStream(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn progress(status: &str) -> ProgressResponse {
    ProgressResponse {
        status: status.to_string(),
        ..Default::default()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn probe(&self, digest: &BlobDigest) -> ClientResult<BlobStatus> {
        self.record(Call::Probe(digest.to_string()));

        if let Some(status) = self.probe_failure {
            return Err(ClientError::Api {
                endpoint: "HEAD /api/blobs".into(),
                status,
                body: String::new(),
            });
        }

        if self.blobs.lock().unwrap().contains(digest.as_str()) {
            Ok(BlobStatus::Present)
        } else {
            Ok(BlobStatus::Missing)
        }
    }

    async fn upload(&self, digest: &BlobDigest, mut body: UploadBody) -> ClientResult<()> {
        let mut bytes = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| ClientError::Decode {
                endpoint: "POST /api/blobs".into(),
                message: e.to_string(),
            })?;
            bytes.extend_from_slice(&chunk);
        }
        self.record(Call::Upload {
            digest: digest.to_string(),
            bytes,
        });

        if let Some(status) = self.upload_failure {
            return Err(ClientError::Api {
                endpoint: "POST /api/blobs".into(),
                status,
                body: "upload rejected".into(),
            });
        }

        self.blobs.lock().unwrap().insert(digest.to_string());
        Ok(())
    }

    async fn create_model(&self, request: &CreateRequest) -> ClientResult<ProgressResponse> {
        self.record(Call::Create(request.clone()));
        Ok(progress("success"))
    }

    async fn create_model_stream(&self, request: &CreateRequest) -> ClientResult<ProgressStream> {
        self.record(Call::CreateStream(request.clone()));
        let events: Vec<ClientResult<ProgressResponse>> = vec![
            Ok(progress("parsing modelfile")),
            Ok(progress("creating model layer")),
            Ok(progress("success")),
        ];
        Ok(Box::pin(futures::stream::iter(events)))
    }

    fn supports_streaming_upload(&self) -> bool {
        self.streaming.unwrap_or(true)
    }
}
