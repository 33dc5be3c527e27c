//! File handle over a local filesystem file.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

use super::{File, FileInfo};

/// A local file behind the same [`File`] surface as [`super::ResponseFile`].
#[derive(Debug)]
pub struct LocalFile {
    info: FileInfo,
    file: Option<tokio::fs::File>,
}

impl LocalFile {
    /// Opens `path` for reading and captures its metadata.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from opening the file or reading its metadata.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await?;
        let metadata = file.metadata().await?;
        Ok(Self {
            info: FileInfo::from_metadata(path, &metadata),
            file: Some(file),
        })
    }
}

impl AsyncRead for LocalFile {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut().file.as_mut() {
            Some(file) => Pin::new(file).poll_read(cx, buf),
            None => Poll::Ready(Err(io::Error::other("read on closed file"))),
        }
    }
}

impl File for LocalFile {
    fn stat(&self) -> &FileInfo {
        &self.info
    }

    fn close(&mut self) -> io::Result<()> {
        self.file = None;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.file.is_none()
    }
}
