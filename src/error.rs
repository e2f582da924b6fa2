use thiserror::Error;

// Throttling never rejects a call, so there is no "rate exceeded" variant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThrottleError {
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        name: &'static str,
        reason: String,
    },

    // oldest() on an empty buffer; the controller only asks once the buffer is full
    #[error("recency buffer is empty")]
    EmptyState,
}

impl ThrottleError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ThrottleError::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}

// Either the throttle refused the input, or the transport failed and its
// error is handed back untouched
#[derive(Error, Debug)]
pub enum ExecuteError<E> {
    #[error(transparent)]
    Throttle(#[from] ThrottleError),

    #[error("transport failed: {0}")]
    Transport(#[source] E),

    // Only from execute_json
    #[error("response body could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),
}

impl<E> ExecuteError<E> {
    pub fn into_transport(self) -> Option<E> {
        match self {
            ExecuteError::Transport(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ExecuteError::Transport(_))
    }
}
