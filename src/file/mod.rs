//! File-like views of HTTP responses and local files.
//!
//! [`File`] is the capability set shared by both backings: stream the
//! contents with `AsyncRead`, look at [`FileInfo`] metadata, and close.
//! Code written against `File` does not care whether the bytes come from a
//! live response body ([`ResponseFile`]) or the filesystem ([`LocalFile`]).

mod info;
mod local;
mod response;

use std::io;

use tokio::io::AsyncRead;

pub use info::FileInfo;
pub use local::LocalFile;
pub use response::ResponseFile;

/// A readable, stat-able, closable file handle.
pub trait File: AsyncRead + Unpin + Send {
    /// Metadata captured when the handle was opened.
    fn stat(&self) -> &FileInfo;

    /// Releases the underlying resource. Later reads fail; closing twice is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the backing resource reports one on release.
    fn close(&mut self) -> io::Result<()>;

    /// Returns true once [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;
}
