//! Error types for the request module.
//!
//! Every failure a request can hit surfaces as one [`FetchError`]. HTTP
//! status failures additionally carry an [`ErrorKind`] so callers can ask
//! "is this a not-found class failure" without matching on status text.

use std::fmt;
use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

use crate::limit::AdmissionError;

/// Semantic classification of a failure, decoupled from the literal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The resource does not exist (HTTP 404, missing local file).
    NotFound,
    /// Access was refused (HTTP 403, local permission error).
    PermissionDenied,
    /// A deadline passed (HTTP 504, transport timeout, context deadline).
    DeadlineExceeded,
    /// The request or the upstream answer was malformed (HTTP 502, bad URL).
    Invalid,
    /// Anything without a more specific kind.
    Other,
}

impl ErrorKind {
    /// Maps an error status code onto its semantic kind.
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::FORBIDDEN => Self::PermissionDenied,
            StatusCode::GATEWAY_TIMEOUT => Self::DeadlineExceeded,
            StatusCode::BAD_GATEWAY => Self::Invalid,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotFound => "not found",
            Self::PermissionDenied => "permission denied",
            Self::DeadlineExceeded => "deadline exceeded",
            Self::Invalid => "invalid argument",
            Self::Other => "unexpected status",
        };
        f.write_str(text)
    }
}

impl From<ErrorKind> for io::ErrorKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => io::ErrorKind::NotFound,
            ErrorKind::PermissionDenied => io::ErrorKind::PermissionDenied,
            ErrorKind::DeadlineExceeded => io::ErrorKind::TimedOut,
            ErrorKind::Invalid => io::ErrorKind::InvalidInput,
            ErrorKind::Other => io::ErrorKind::Other,
        }
    }
}

/// Errors that can occur while building, sending, or consuming a request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The base URL could not be parsed.
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        /// The URL string as configured on the request.
        url: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// Credentials were configured for a URL that has no host to carry them.
    #[error("URL {url} cannot carry user credentials")]
    CredentialsUnsupported {
        /// The URL string as configured on the request.
        url: String,
    },

    /// The method string is not a valid HTTP token.
    #[error("invalid HTTP method {method:?}")]
    InvalidMethod {
        /// The rejected method.
        method: String,
    },

    /// A header name or value cannot be sent on the wire.
    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader {
        /// The header name as configured.
        name: String,
        /// Why the header was rejected.
        reason: String,
    },

    /// A JSON request body could not be serialized.
    #[error("failed to serialize request body: {source}")]
    Serialize {
        /// The underlying serializer error.
        #[source]
        source: serde_json::Error,
    },

    /// The attached rate limiter refused to admit the request.
    #[error("rate limiter refused request to {url}: {source}")]
    Admission {
        /// The URL that was about to be requested.
        url: String,
        /// Why the limiter refused.
        #[source]
        source: AdmissionError,
    },

    /// Network-level error (DNS resolution, connection refused, TLS, timeout).
    #[error("network error requesting {url}: {source}")]
    Transport {
        /// The URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The request context was cancelled before the request finished.
    #[error("request to {url} was cancelled")]
    Cancelled {
        /// The URL that was being requested.
        url: String,
    },

    /// The request context deadline passed before the request finished.
    #[error("deadline exceeded requesting {url}")]
    DeadlineExceeded {
        /// The URL that was being requested.
        url: String,
    },

    /// The server answered with a status code of 400 or above.
    #[error("{kind}: {status} from {url}: {body}")]
    Status {
        /// The requested URL.
        url: String,
        /// The response status.
        status: StatusCode,
        /// The semantic kind derived from `status`.
        kind: ErrorKind,
        /// Response body excerpt, capped at 4096 bytes plus a marker.
        body: String,
    },

    /// The response body could not be read.
    #[error("failed to read response body from {url}: {source}")]
    Body {
        /// The requested URL.
        url: String,
        /// The underlying read error.
        #[source]
        source: io::Error,
    },

    /// The response body is not valid JSON for the requested type.
    #[error("failed to decode JSON from {url}: {source}")]
    Json {
        /// The requested URL.
        url: String,
        /// The underlying decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// The response body is not valid XML for the requested type.
    #[error("failed to decode XML from {url}: {source}")]
    Xml {
        /// The requested URL.
        url: String,
        /// The underlying decoder error.
        #[source]
        source: quick_xml::DeError,
    },

    /// File system error while writing a download.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid method error.
    pub fn invalid_method(method: impl Into<String>) -> Self {
        Self::InvalidMethod {
            method: method.into(),
        }
    }

    /// Creates an invalid header error.
    pub fn invalid_header(name: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an admission error.
    pub fn admission(url: impl Into<String>, source: AdmissionError) -> Self {
        Self::Admission {
            url: url.into(),
            source,
        }
    }

    /// Creates a transport error from a reqwest error.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    /// Creates a classified status error. The kind is derived from `status`.
    pub fn status(url: impl Into<String>, status: StatusCode, body: impl Into<String>) -> Self {
        Self::Status {
            url: url.into(),
            status,
            kind: ErrorKind::from_status(status),
            body: body.into(),
        }
    }

    /// Creates a body read error.
    pub fn body(url: impl Into<String>, source: io::Error) -> Self {
        Self::Body {
            url: url.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the semantic kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl { .. }
            | Self::CredentialsUnsupported { .. }
            | Self::InvalidMethod { .. }
            | Self::InvalidHeader { .. }
            | Self::Serialize { .. } => ErrorKind::Invalid,
            Self::Status { kind, .. } => *kind,
            Self::Transport { source, .. } if source.is_timeout() => ErrorKind::DeadlineExceeded,
            Self::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            Self::Body { source, .. } if source.kind() == io::ErrorKind::TimedOut => {
                ErrorKind::DeadlineExceeded
            }
            Self::Io { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => ErrorKind::NotFound,
                io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
                _ => ErrorKind::Other,
            },
            _ => ErrorKind::Other,
        }
    }

    /// Returns true for not-found class failures.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns true for permission-denied class failures.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        self.kind() == ErrorKind::PermissionDenied
    }

    /// Returns true for deadline-exceeded class failures.
    #[must_use]
    pub fn is_deadline_exceeded(&self) -> bool {
        self.kind() == ErrorKind::DeadlineExceeded
    }

    /// Returns true for invalid-request class failures.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.kind() == ErrorKind::Invalid
    }

    /// The response status, for status errors.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The truncated response body, for status errors.
    #[must_use]
    pub fn body_excerpt(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<FetchError> for io::Error {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Body { source, .. } | FetchError::Io { source, .. } => source,
            other => io::Error::new(other.kind().into(), other),
        }
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// URL or path for context, so the constructors above are the only way in.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display_contains_status_url_and_body() {
        let error = FetchError::status("https://example.com/a", StatusCode::NOT_FOUND, "missing");
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(msg.contains("https://example.com/a"), "Expected URL in: {msg}");
        assert!(msg.contains("missing"), "Expected body in: {msg}");
        assert!(msg.starts_with("not found"), "Expected kind prefix in: {msg}");
    }

    #[test]
    fn test_status_kind_mapping() {
        let cases = [
            (404, ErrorKind::NotFound),
            (403, ErrorKind::PermissionDenied),
            (504, ErrorKind::DeadlineExceeded),
            (502, ErrorKind::Invalid),
            (500, ErrorKind::Other),
            (401, ErrorKind::Other),
            (418, ErrorKind::Other),
        ];
        for (code, expected) in cases {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(ErrorKind::from_status(status), expected, "status {code}");
        }
    }

    #[test]
    fn test_kind_predicates() {
        let err = FetchError::status("u", StatusCode::FORBIDDEN, "");
        assert!(err.is_permission_denied());
        assert!(!err.is_not_found());

        let err = FetchError::status("u", StatusCode::GATEWAY_TIMEOUT, "");
        assert!(err.is_deadline_exceeded());

        let err = FetchError::invalid_method("BAD METHOD");
        assert!(err.is_invalid());
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_io_error_kind_classification() {
        let err = FetchError::io(
            "/tmp/x",
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(err.is_permission_denied());

        let err = FetchError::io("/tmp/x", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_into_io_error_maps_kind() {
        let err = FetchError::status("u", StatusCode::NOT_FOUND, "missing");
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::NotFound);
        assert!(io_err.to_string().contains("missing"));

        let err = FetchError::DeadlineExceeded { url: "u".into() };
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_body_excerpt_accessor() {
        let err = FetchError::status("u", StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(err.body_excerpt(), Some("upstream down"));
        assert_eq!(err.status_code(), Some(StatusCode::BAD_GATEWAY));
        assert!(err.is_invalid());
    }

    #[test]
    fn test_invalid_header_display() {
        let err = FetchError::invalid_header("Bad Name", "invalid HTTP header name");
        let msg = err.to_string();
        assert!(msg.contains("Bad Name"), "Expected header name in: {msg}");
    }
}
