//! Modelfile client
//!
//! Creates models on an inference server from modelfiles. Local weights and
//! adapters referenced by `FROM` / `ADAPTER` directives are uploaded as
//! content-addressed blobs and the directives are rewritten to point at
//! their digests, so the server never needs access to the client's disk.

pub mod blob;
pub mod client;
pub mod config;
pub mod digest;
pub mod error;
pub mod image;
pub mod metrics;
pub mod modelfile;
pub mod paths;
pub mod transport;
pub mod types;

pub use blob::BlobUploader;
pub use client::{Client, CreateResponse};
pub use config::ClientConfig;
pub use digest::BlobDigest;
pub use error::{ClientError, ClientResult};
pub use image::{ImageInput, encode_image};
pub use modelfile::{Directive, ModelfileRewriter};
pub use paths::PathResolver;
pub use transport::{BlobStatus, HttpTransport, ProgressStream, Transport, UploadBody};
pub use types::{CreateRequest, ProgressResponse};
