use thiserror::Error;

/// Errors produced by the generation pipeline.
///
/// The retry controller consults [`LlmError::is_retryable`] to decide which
/// failures consume a retry slot; everything else is surfaced immediately.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The resolved credential env var is unset or empty.
    #[error("missing API key; set {0}")]
    MissingCredential(String),

    /// The backend answered with a non-2xx status.
    #[error("chat request failed: HTTP {status} - {body}")]
    RequestFailed { status: u16, body: String },

    /// The request never completed (DNS, connect, broken transfer).
    #[error("error sending chat request: {0}")]
    Connection(reqwest::Error),

    /// The request hit the client's deadline.
    #[error("chat request timed out")]
    TimedOut,

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// A 2xx response carried an application-level error payload.
    #[error("chat backend reported an error: {0}")]
    Api(String),

    /// A well-formed response with zero choices.
    #[error("no choices returned in chat response")]
    EmptyResponse,

    #[error("failed to encode chat request: {0}")]
    MalformedRequest(String),

    #[error("failed to decode chat response: {0}")]
    MalformedResponse(String),

    /// The completion was empty after trimming.
    #[error("empty AI response")]
    EmptyCompletion,

    #[error("provider {provider} is not implemented yet: {reason}")]
    NotImplemented {
        provider: &'static str,
        reason: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The retry budget ran out; wraps the last underlying failure.
    #[error("chat request failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<LlmError>,
    },
}

impl LlmError {
    /// Transient transport failures are retried; cancellation, deadlines,
    /// and protocol-level problems are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RequestFailed { .. } | LlmError::Connection(_)
        )
    }

    /// Split a reqwest send error into the deadline and connection classes.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::TimedOut
        } else {
            LlmError::Connection(err)
        }
    }
}
