//! Metadata for file handles.

use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, LAST_MODIFIED};
use tracing::debug;
use url::Url;

/// Name, size and modification time of a file handle.
///
/// For responses these come from the request URL and the response headers;
/// for local files from filesystem metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    name: String,
    size: Option<u64>,
    modified: Option<SystemTime>,
    content_type: Option<String>,
    url: Option<Url>,
    is_dir: bool,
}

impl FileInfo {
    /// Builds metadata for a response to `url` carrying `headers`.
    #[must_use]
    pub fn from_response(url: &Url, headers: &HeaderMap) -> Self {
        let size = header_str(headers, CONTENT_LENGTH.as_str()).and_then(|v| v.parse::<u64>().ok());
        let modified = header_str(headers, LAST_MODIFIED.as_str())
            .and_then(|v| httpdate::parse_http_date(v).ok());
        let content_type = header_str(headers, CONTENT_TYPE.as_str()).map(str::to_string);
        Self {
            name: name_from_url(url),
            size,
            modified,
            content_type,
            url: Some(url.clone()),
            is_dir: false,
        }
    }

    /// Builds metadata for the local file at `path`.
    #[must_use]
    pub fn from_metadata(path: &Path, metadata: &Metadata) -> Self {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self {
            name,
            size: Some(metadata.len()),
            modified: metadata.modified().ok(),
            content_type: None,
            url: None,
            is_dir: metadata.is_dir(),
        }
    }

    /// Base name: last URL path segment (percent-decoded) or file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes, when the server sent `Content-Length`.
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Modification time, when the server sent a valid `Last-Modified`.
    #[must_use]
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// `Content-Type` of the response.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The request URL, for response-backed handles.
    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Responses are never directories.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Last non-empty path segment, percent-decoded; the host when the path is
/// empty; `/` as a last resort.
fn name_from_url(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()));
    if let Some(last) = segment {
        return urlencoding::decode(last).map_or_else(
            |e| {
                debug!(segment = %last, error = %e, "URL decoding failed, using raw segment");
                last.to_string()
            },
            std::borrow::Cow::into_owned,
        );
    }
    url.host_str().map_or_else(|| "/".to_string(), str::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use reqwest::header::HeaderValue;

    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_from_response_reads_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("10240"));
        headers.insert(
            LAST_MODIFIED,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/pdf"));

        let info = FileInfo::from_response(&url("http://localhost/papers/a.pdf"), &headers);
        assert_eq!(info.name(), "a.pdf");
        assert_eq!(info.size(), Some(10240));
        assert_eq!(
            info.modified(),
            Some(UNIX_EPOCH + Duration::from_secs(1_445_412_480))
        );
        assert_eq!(info.content_type(), Some("application/pdf"));
        assert!(!info.is_dir());
    }

    #[test]
    fn test_from_response_missing_or_bad_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(LAST_MODIFIED, HeaderValue::from_static("yesterday"));
        let info = FileInfo::from_response(&url("http://localhost/x"), &headers);
        assert_eq!(info.size(), None);
        assert_eq!(info.modified(), None);
    }

    #[test]
    fn test_name_from_url_variants() {
        assert_eq!(name_from_url(&url("http://h/dir/file%20name.txt")), "file name.txt");
        assert_eq!(name_from_url(&url("http://h/dir/sub/")), "sub");
        assert_eq!(name_from_url(&url("http://example.com/")), "example.com");
        assert_eq!(name_from_url(&url("http://h/a.json?x=1")), "a.json");
    }

    #[test]
    fn test_from_metadata() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();
        let metadata = std::fs::metadata(&path).unwrap();

        let info = FileInfo::from_metadata(&path, &metadata);
        assert_eq!(info.name(), "notes.txt");
        assert_eq!(info.size(), Some(5));
        assert!(info.modified().is_some());
        assert!(info.url().is_none());
    }
}
