use dl_core::wire::{MalformedObject, Status};

/// Upload failed. Aborts the pipeline before any agent call.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("refusing to upload an empty image")]
    EmptyPayload,

    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload endpoint answered HTTP {0}")]
    Status(u16),

    #[error("upload rejected (status {status}): {reason}")]
    Rejected { status: Status, reason: String },

    #[error("upload timed out")]
    Timeout,
}

/// Analysis or layout computation failed. No layout is applied.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("image reference has no URI")]
    MissingReference,

    #[error("layout requested without objects")]
    NoObjects,

    #[error("agent request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("agent endpoint answered HTTP {0}")]
    Status(u16),

    #[error("agent rejected {operation} (status {status})")]
    Rejected { operation: &'static str, status: Status },

    #[error("agent reply unusable: {0}")]
    Malformed(#[from] MalformedObject),

    #[error("agent call timed out")]
    Timeout,
}
