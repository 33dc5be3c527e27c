//! Conversion of error responses (status >= 400) into [`FetchError::Status`].

use futures_util::StreamExt;
use tracing::debug;

use super::constants::{MAX_ERROR_BODY_LEN, TRUNCATION_MARKER};
use super::error::FetchError;

/// Drains `response` and returns the classified status error.
///
/// Only the first [`MAX_ERROR_BODY_LEN`] bytes are kept; the rest of the body
/// is read and discarded so the connection can be released. A body read
/// failure ends the drain early and keeps what was read so far.
pub async fn classify(url: &str, response: reqwest::Response) -> FetchError {
    let status = response.status();
    let mut stream = response.bytes_stream();
    let mut excerpt: Vec<u8> = Vec::new();
    let mut truncated = false;

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) => {
                let room = MAX_ERROR_BODY_LEN - excerpt.len();
                if chunk.len() > room {
                    truncated = true;
                }
                excerpt.extend_from_slice(&chunk[..chunk.len().min(room)]);
            }
            Err(error) => {
                debug!(url, %error, "error body read failed");
                break;
            }
        }
    }

    debug!(url, status = status.as_u16(), truncated, "classified error response");
    FetchError::status(url, status, render_excerpt(&excerpt, truncated))
}

/// Cuts `body` to [`MAX_ERROR_BODY_LEN`] bytes, appending the truncation
/// marker when anything was dropped.
#[must_use]
pub fn truncate_body(body: &[u8]) -> String {
    let truncated = body.len() > MAX_ERROR_BODY_LEN;
    render_excerpt(&body[..body.len().min(MAX_ERROR_BODY_LEN)], truncated)
}

/// Renders at most [`MAX_ERROR_BODY_LEN`] bytes of text. A character split
/// by the truncation cut is dropped, and replacement characters for invalid
/// bytes never push the text past the cap.
fn render_excerpt(excerpt: &[u8], truncated: bool) -> String {
    let excerpt = match std::str::from_utf8(excerpt) {
        Err(e) if truncated && e.error_len().is_none() => &excerpt[..e.valid_up_to()],
        _ => excerpt,
    };
    let mut text = String::from_utf8_lossy(excerpt).into_owned();
    if text.len() > MAX_ERROR_BODY_LEN {
        let end = (0..=MAX_ERROR_BODY_LEN)
            .rev()
            .find(|&i| text.is_char_boundary(i))
            .unwrap_or(0);
        text.truncate(end);
    }
    if truncated {
        text.push_str(TRUNCATION_MARKER);
    }
    text
}
