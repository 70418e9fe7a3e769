//! Client-side counters
//!
//! Emitted through the `metrics` facade; they are no-ops unless the host
//! application installs a recorder.

/// Record a blob that had to be uploaded
pub fn record_blob_uploaded(size_bytes: u64) {
    metrics::counter!("modelfile_client_blobs_uploaded_total").increment(1);
    metrics::counter!("modelfile_client_blob_bytes_uploaded_total").increment(size_bytes);
}

/// Record a blob the server already held
pub fn record_blob_reused() {
    metrics::counter!("modelfile_client_blobs_reused_total").increment(1);
}

/// Record a create call handed to the server
pub fn record_model_create(model: &str, stream: bool) {
    metrics::counter!("modelfile_client_creates_total",
        "model" => model.to_string(),
        "stream" => stream.to_string()
    )
    .increment(1);
}
