/// Fatal failures surfaced through the normalized event stream.
///
/// Non-fatal conditions (malformed frames, result-less envelopes, aborts) never
/// appear here: they are absorbed by the stream and production continues or
/// ends cleanly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// The response was accepted but carried no body to stream from.
    #[error("response has no body to stream")]
    MissingBody,
    /// The endpoint rejected the access token (HTTP 401).
    ///
    /// Kept distinct from [`StreamError::Http`] so callers can re-authenticate.
    #[error("Session expired: the access token was rejected")]
    SessionExpired,
    /// Any other non-2xx response.
    #[error("HTTP error {status} for {method}")]
    Http { status: u16, method: String },
    /// The remote side answered a frame with a JSON-RPC `error` object.
    #[error("JSON-RPC error {code}: {message}")]
    Protocol { code: i64, message: String },
    /// Network or body read failure that was not caused by an abort.
    #[error("transport error: {0}")]
    Transport(String),
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl StreamError {
    pub(crate) fn protocol(code: i64, message: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
        }
    }

    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Returns `true` when the caller should refresh credentials before retrying.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// HTTP status associated with this error, when there is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::SessionExpired => Some(401),
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Maps a non-success HTTP status onto the error taxonomy.
pub(crate) fn error_for_status(status: reqwest::StatusCode, method: &str) -> StreamError {
    if status == reqwest::StatusCode::UNAUTHORIZED {
        StreamError::SessionExpired
    } else {
        StreamError::Http {
            status: status.as_u16(),
            method: method.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_session_expired() {
        let err = error_for_status(reqwest::StatusCode::UNAUTHORIZED, "message/stream");
        assert!(err.is_session_expired());
        assert!(err.to_string().contains("Session expired"));
        assert_eq!(err.status_code(), Some(401));
    }

    #[test]
    fn other_statuses_keep_code_and_method() {
        let err = error_for_status(reqwest::StatusCode::BAD_GATEWAY, "message/stream");
        assert_eq!(
            err,
            StreamError::Http {
                status: 502,
                method: "message/stream".into()
            }
        );
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("message/stream"));
    }

    #[test]
    fn protocol_error_message_carries_code_and_text() {
        let err = StreamError::protocol(-32603, "Internal error");
        let text = err.to_string();
        assert!(text.contains("-32603"));
        assert!(text.contains("Internal error"));
    }
}
