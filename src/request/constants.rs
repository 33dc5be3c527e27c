//! Constants for the request module (error excerpts, MIME types, defaults).

use std::time::Duration;

/// Maximum number of error-body bytes kept in a status error (4 KiB).
pub const MAX_ERROR_BODY_LEN: usize = 1 << 12;

/// Appended to an error-body excerpt when it was cut at [`MAX_ERROR_BODY_LEN`].
pub const TRUNCATION_MARKER: &str = "...";

/// Scheme and host prefixed to URLs that start with `/` or `:`.
pub const LOCAL_AUTHORITY: &str = "http://localhost";

/// Body MIME type set by `Request::json`.
pub const JSON_MIME: &str = "application/json; charset=utf-8";

/// Body MIME type set by `Request::form`.
pub const FORM_MIME: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Permission bits for files written by `Request::download` (owner read/write).
pub const DOWNLOAD_MODE: u32 = 0o600;

/// Suffix of the temporary file a download streams into before the rename.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default HTTP read timeout (5 minutes for large bodies).
pub const READ_TIMEOUT: Duration = Duration::from_secs(300);
