//! Request and response models for the create endpoint

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Request to create a model from a modelfile
///
/// Exactly one of `path` or `modelfile` is consulted; `path` wins when both
/// are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Name of the model to create
    pub model: String,

    /// Modelfile on disk; relative directives resolve against its directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Inline modelfile text; relative directives resolve against the cwd
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modelfile: Option<String>,

    /// Stream progress events instead of returning only the final status
    #[serde(default)]
    pub stream: bool,

    /// Quantization level requested from the server (e.g. "q4_K_M")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantize: Option<String>,
}

impl CreateRequest {
    pub fn from_path(model: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn from_modelfile(model: impl Into<String>, modelfile: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            modelfile: Some(modelfile.into()),
            ..Default::default()
        }
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn quantize(mut self, level: impl Into<String>) -> Self {
        self.quantize = Some(level.into());
        self
    }
}

/// Body sent to `POST /api/create`
#[derive(Debug, Serialize)]
pub(crate) struct CreateModelBody<'a> {
    pub name: &'a str,
    pub modelfile: &'a str,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantize: Option<&'a str>,
}

impl<'a> From<&'a CreateRequest> for CreateModelBody<'a> {
    fn from(req: &'a CreateRequest) -> Self {
        Self {
            name: &req.model,
            modelfile: req.modelfile.as_deref().unwrap_or_default(),
            stream: req.stream,
            quantize: req.quantize.as_deref(),
        }
    }
}

/// Progress event reported by the server while it builds a model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<u64>,
}

impl ProgressResponse {
    /// True for the terminal event of a successful create
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}
