//! Content-addressed blob upload
//!
//! A local file is digested, the server is asked whether it already holds
//! that digest, and the file is streamed up only when it does not. The key
//! is derived from content alone, so repeat calls never upload twice.

use crate::digest::{BlobDigest, digest_file_sized};
use crate::error::{ClientError, ClientResult};
use crate::transport::{BlobStatus, Transport, UploadBody};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Uploads local files to the server's blob store
pub struct BlobUploader<'a, T: Transport + ?Sized> {
    transport: &'a T,
    chunk_size: usize,
}

impl<'a, T: Transport + ?Sized> BlobUploader<'a, T> {
    pub fn new(transport: &'a T, chunk_size: usize) -> Self {
        Self {
            transport,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Make sure the server holds the content of `path`, returning its digest
    ///
    /// Issues one probe and at most one upload. The file is read twice, once
    /// to hash and once to upload. A size change in between is reported as
    /// an I/O error before any bytes are sent; a same-size rewrite is caught
    /// by the server's digest check instead.
    pub async fn ensure_blob(&self, path: &Path) -> ClientResult<BlobDigest> {
        if !self.transport.supports_streaming_upload() {
            return Err(ClientError::UnsupportedEnvironment(
                "streaming uploads are not supported by this transport".to_string(),
            ));
        }

        let (digest, hashed) = digest_file_sized(path, self.chunk_size).await?;

        match self.transport.probe(&digest).await? {
            BlobStatus::Present => {
                tracing::debug!(digest = %digest, path = ?path, "Blob already on server");
                crate::metrics::record_blob_reused();
            }
            BlobStatus::Missing => {
                let size = tokio::fs::metadata(path)
                    .await
                    .map_err(|e| ClientError::io(path, e))?
                    .len();
                if size != hashed {
                    return Err(ClientError::io(
                        path,
                        std::io::Error::other(format!(
                            "file changed after hashing ({} bytes hashed, {} bytes now)",
                            hashed, size
                        )),
                    ));
                }

                tracing::info!(digest = %digest, path = ?path, size_bytes = size, "Uploading blob");
                self.transport
                    .upload(&digest, file_chunks(path.to_path_buf(), self.chunk_size))
                    .await?;
                crate::metrics::record_blob_uploaded(size);
            }
        }

        Ok(digest)
    }
}

/// Stream a file from disk in `chunk_size` pieces
///
/// Only one chunk is held in memory at a time. End of file closes the
/// stream successfully.
pub fn file_chunks(path: PathBuf, chunk_size: usize) -> UploadBody {
    let chunks = async_stream::stream! {
        let mut file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                yield Err(e);
                return;
            }
        };

        let mut buf = vec![0u8; chunk_size.max(1)];
        loop {
            match file.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => yield Ok(buf[..n].to_vec()),
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    };

    Box::pin(chunks)
}
