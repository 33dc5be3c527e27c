//! File handle over a live HTTP response body.

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::Sleep;
use tokio_util::io::StreamReader;
use tokio_util::sync::WaitForCancellationFutureOwned;
use url::Url;

use super::{File, FileInfo};
use crate::request::{ContextError, RequestContext};

type BodyStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// A successful response exposed as a read-once file.
///
/// The body streams straight from the connection and can be read through
/// exactly once. The handle must be closed (or dropped) to release the
/// connection; reads after [`close`](File::close) fail immediately.
pub struct ResponseFile {
    info: FileInfo,
    body: Option<StreamReader<BodyStream, Bytes>>,
    context: Option<RequestContext>,
    watch: Option<ContextWatch>,
}

/// Wakers for the attached context, armed on the first read so a pending
/// body read is woken by a cancel or by the deadline.
struct ContextWatch {
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    deadline: Option<Pin<Box<Sleep>>>,
}

impl ContextWatch {
    fn arm(context: &RequestContext) -> Self {
        Self {
            cancelled: Box::pin(context.token().clone().cancelled_owned()),
            deadline: context
                .deadline()
                .map(|deadline| Box::pin(tokio::time::sleep_until(deadline))),
        }
    }

    fn poll_done(&mut self, cx: &mut Context<'_>) -> Poll<ContextError> {
        if self.cancelled.as_mut().poll(cx).is_ready() {
            return Poll::Ready(ContextError::Cancelled);
        }
        if let Some(sleep) = self.deadline.as_mut() {
            if sleep.as_mut().poll(cx).is_ready() {
                return Poll::Ready(ContextError::DeadlineExceeded);
            }
        }
        Poll::Pending
    }
}

impl ResponseFile {
    /// Wraps `response`, describing it as the resource at `url`.
    ///
    /// When `context` is given, reads fail once it is cancelled or past its
    /// deadline.
    #[must_use]
    pub fn new(response: reqwest::Response, url: &Url, context: Option<RequestContext>) -> Self {
        let info = FileInfo::from_response(url, response.headers());
        let stream: BodyStream = Box::pin(response.bytes_stream().map_err(body_io_error));
        Self {
            info,
            body: Some(StreamReader::new(stream)),
            context,
            watch: None,
        }
    }
}

impl fmt::Debug for ResponseFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseFile")
            .field("info", &self.info)
            .field("closed", &self.body.is_none())
            .field("context", &self.context)
            .finish()
    }
}

impl AsyncRead for ResponseFile {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(context) = this.context.as_ref() {
            if let Some(reason) = context.err() {
                return Poll::Ready(Err(context_io_error(reason)));
            }
            let watch = this.watch.get_or_insert_with(|| ContextWatch::arm(context));
            if let Poll::Ready(reason) = watch.poll_done(cx) {
                return Poll::Ready(Err(context_io_error(reason)));
            }
        }
        match this.body.as_mut() {
            Some(body) => Pin::new(body).poll_read(cx, buf),
            None => Poll::Ready(Err(io::Error::other("read on closed response body"))),
        }
    }
}

impl File for ResponseFile {
    fn stat(&self) -> &FileInfo {
        &self.info
    }

    fn close(&mut self) -> io::Result<()> {
        self.body = None;
        self.watch = None;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.body.is_none()
    }
}

fn body_io_error(error: reqwest::Error) -> io::Error {
    if error.is_timeout() {
        io::Error::new(io::ErrorKind::TimedOut, error)
    } else {
        io::Error::other(error)
    }
}

fn context_io_error(reason: ContextError) -> io::Error {
    match reason {
        ContextError::Cancelled => {
            io::Error::new(io::ErrorKind::ConnectionAborted, "request cancelled")
        }
        ContextError::DeadlineExceeded => {
            io::Error::new(io::ErrorKind::TimedOut, "request deadline exceeded")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    fn response(body: &'static str, headers: &[(&str, &str)]) -> reqwest::Response {
        let mut builder = http::Response::builder().status(200);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        reqwest::Response::from(builder.body(body).unwrap())
    }

    fn url() -> Url {
        Url::parse("http://localhost/files/report.txt").unwrap()
    }

    #[tokio::test]
    async fn test_reads_body_and_exposes_stat() {
        let mut file = ResponseFile::new(response("hello", &[("content-length", "5")]), &url(), None);
        assert_eq!(file.stat().name(), "report.txt");
        assert_eq!(file.stat().size(), Some(5));

        let mut body = String::new();
        file.read_to_string(&mut body).await.unwrap();
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn test_read_after_close_fails() {
        let mut file = ResponseFile::new(response("hello", &[]), &url(), None);
        file.close().unwrap();
        assert!(file.is_closed());

        let mut buf = [0u8; 4];
        let err = file.read(&mut buf).await.unwrap_err();
        assert!(err.to_string().contains("closed"));

        // second close is a no-op
        file.close().unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_context_fails_reads() {
        let ctx = RequestContext::new();
        let mut file = ResponseFile::new(response("hello", &[]), &url(), Some(ctx.clone()));
        ctx.cancel();

        let mut buf = Vec::new();
        let err = file.read_to_end(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionAborted);
    }

    fn stalled_response() -> reqwest::Response {
        let body = reqwest::Body::wrap_stream(futures_util::stream::pending::<io::Result<Bytes>>());
        reqwest::Response::from(http::Response::builder().status(200).body(body).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_wakes_stalled_read() {
        let ctx = RequestContext::with_timeout(std::time::Duration::from_millis(200));
        let mut file = ResponseFile::new(stalled_response(), &url(), Some(ctx));
        let start = tokio::time::Instant::now();

        let mut buf = Vec::new();
        let err = file.read_to_end(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(start.elapsed() >= std::time::Duration::from_millis(200));
        assert!(start.elapsed() < std::time::Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_cancel_wakes_stalled_read() {
        let ctx = RequestContext::new();
        let mut file = ResponseFile::new(stalled_response(), &url(), Some(ctx.clone()));

        let mut buf = [0u8; 16];
        let mut read = tokio_test::task::spawn(file.read(&mut buf));
        tokio_test::assert_pending!(read.poll());

        ctx.cancel();
        assert!(read.is_woken());
        let err = tokio_test::assert_ready_err!(read.poll());
        assert_eq!(err.kind(), io::ErrorKind::ConnectionAborted);
    }

    #[tokio::test]
    async fn test_usable_as_dyn_file() {
        let mut file: Box<dyn File> = Box::new(ResponseFile::new(response("abc", &[]), &url(), None));
        let mut body = Vec::new();
        file.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"abc");
        file.close().unwrap();
    }
}
