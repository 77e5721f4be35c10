//! Domain-specific error types for ghostgraph.
//!
//! Collaborator failures are typed with `thiserror`; the binary edge uses
//! `anyhow`. None of these are fatal to the graph engine: a failed fetch
//! simply yields no events for that tick.

use thiserror::Error;

/// Errors raised while talking to the ingestion or device collaborators.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response is missing the '{0}' field")]
    MissingField(&'static str),

    #[error("fetch worker is no longer running")]
    WorkerGone,
}
