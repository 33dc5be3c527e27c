//! Operations that execute a request and consume its response.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio_util::io::SyncIoBridge;
use tracing::{debug, instrument};

use super::builder::Request;
use super::constants::PARTIAL_SUFFIX;
use super::context::RequestContext;
use super::error::FetchError;
use super::execute::context_error;
use super::materialize::redacted;
use crate::file::{File, FileInfo, ResponseFile};

const COPY_BUFFER_LEN: usize = 64 * 1024;

impl Request {
    /// Executes the request and returns the body as an open file handle.
    ///
    /// The caller owns the handle and should [`close`](File::close) it (or
    /// drop it) to release the connection.
    ///
    /// # Errors
    ///
    /// Any error from [`execute`](Self::execute).
    pub async fn open(&self) -> Result<ResponseFile, FetchError> {
        let (response, identity) = self.execute().await?;
        Ok(ResponseFile::new(
            response,
            &redacted(identity.url()),
            self.context.clone(),
        ))
    }

    /// Executes the request and reads the whole body into memory.
    ///
    /// # Errors
    ///
    /// Any error from [`execute`](Self::execute), or [`FetchError::Body`]
    /// if the body cannot be read.
    pub async fn read(&self) -> Result<Vec<u8>, FetchError> {
        self.read_located().await.map(|(bytes, _)| bytes)
    }

    /// Executes the request and reads the whole body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// As [`read`](Self::read); invalid UTF-8 is a [`FetchError::Body`]
    /// with kind `InvalidData`.
    pub async fn read_string(&self) -> Result<String, FetchError> {
        let (bytes, url) = self.read_located().await?;
        String::from_utf8(bytes)
            .map_err(|e| FetchError::body(url, io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    /// Executes the request and decodes the body as JSON while it streams.
    ///
    /// # Errors
    ///
    /// Any error from [`execute`](Self::execute), [`FetchError::Json`] if the
    /// body does not decode into `T`, or [`FetchError::Body`] if reading fails.
    pub async fn read_json<T>(&self) -> Result<T, FetchError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let file = self.open().await?;
        let url = location(&file);
        let bridge = SyncIoBridge::new(file);
        let decoded = tokio::task::spawn_blocking(move || {
            serde_json::from_reader::<_, T>(io::BufReader::new(bridge))
        })
        .await
        .map_err(|e| FetchError::body(&url, io::Error::other(e)))?;

        decoded.map_err(|source| {
            if source.is_io() {
                self.body_error(&url, io::Error::from(source))
            } else {
                FetchError::Json { url, source }
            }
        })
    }

    /// Executes the request and decodes the body as XML while it streams.
    ///
    /// # Errors
    ///
    /// Any error from [`execute`](Self::execute), or [`FetchError::Xml`] if
    /// the body does not decode into `T` or cannot be read.
    pub async fn read_xml<T>(&self) -> Result<T, FetchError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let file = self.open().await?;
        let url = location(&file);
        let bridge = SyncIoBridge::new(file);
        let decoded = tokio::task::spawn_blocking(move || {
            quick_xml::de::from_reader::<_, T>(io::BufReader::new(bridge))
        })
        .await
        .map_err(|e| FetchError::body(&url, io::Error::other(e)))?;

        decoded.map_err(|source| match self.live_context_error(&url) {
            Some(err) => err,
            None => FetchError::Xml { url, source },
        })
    }

    /// Executes the request, discards the body, and returns its metadata.
    ///
    /// # Errors
    ///
    /// Any error from [`execute`](Self::execute).
    pub async fn stat(&self) -> Result<FileInfo, FetchError> {
        let mut file = self.open().await?;
        let info = file.stat().clone();
        let _ = file.close();
        Ok(info)
    }

    /// Executes the request and streams the body to `path`.
    ///
    /// Bytes go to `<path>.part` first (owner read/write only on Unix), which
    /// is renamed over `path` once fully written and synced. On any failure
    /// the partial file is removed. Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Any error from [`execute`](Self::execute), [`FetchError::Body`] if the
    /// body cannot be read, or [`FetchError::Io`] if the file cannot be
    /// written or renamed.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn download(&self, path: impl AsRef<Path>) -> Result<u64, FetchError> {
        let path = path.as_ref();
        let mut file = self.open().await?;
        let url = location(&file);
        let partial = partial_path(path);

        let written = self.write_partial(&mut file, &url, &partial).await;
        let _ = file.close();

        let result = match written {
            Ok(bytes) => tokio::fs::rename(&partial, path)
                .await
                .map(|()| bytes)
                .map_err(|e| FetchError::io(path, e)),
            Err(err) => Err(err),
        };

        match result {
            Ok(bytes) => {
                debug!(bytes, "download complete");
                Ok(bytes)
            }
            Err(err) => {
                debug!(path = %partial.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(&partial).await;
                Err(err)
            }
        }
    }

    /// Executes the request, discarding a successful body, and reports only
    /// whether it succeeded.
    ///
    /// # Errors
    ///
    /// Any error from [`execute`](Self::execute).
    pub async fn check(&self) -> Result<(), FetchError> {
        let (response, _) = self.execute().await?;
        drop(response);
        Ok(())
    }

    async fn read_located(&self) -> Result<(Vec<u8>, String), FetchError> {
        let mut file = self.open().await?;
        let url = location(&file);
        let mut buf = Vec::new();
        let result = file.read_to_end(&mut buf).await;
        let _ = file.close();
        result.map_err(|e| self.body_error(&url, e))?;
        Ok((buf, url))
    }

    async fn write_partial(
        &self,
        file: &mut ResponseFile,
        url: &str,
        partial: &Path,
    ) -> Result<u64, FetchError> {
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(super::constants::DOWNLOAD_MODE);
        let out = options
            .open(partial)
            .await
            .map_err(|e| FetchError::io(partial, e))?;

        let mut writer = BufWriter::new(out);
        let mut buf = vec![0u8; COPY_BUFFER_LEN];
        let mut bytes_written: u64 = 0;

        loop {
            let n = file
                .read(&mut buf)
                .await
                .map_err(|e| self.body_error(url, e))?;
            if n == 0 {
                break;
            }
            writer
                .write_all(&buf[..n])
                .await
                .map_err(|e| FetchError::io(partial, e))?;
            bytes_written += n as u64;
        }

        writer.flush().await.map_err(|e| FetchError::io(partial, e))?;
        writer
            .get_mut()
            .sync_all()
            .await
            .map_err(|e| FetchError::io(partial, e))?;

        Ok(bytes_written)
    }

    /// Maps a body read failure, preferring the context's reason when the
    /// context is what stopped the read.
    fn body_error(&self, url: &str, error: io::Error) -> FetchError {
        self.live_context_error(url)
            .unwrap_or_else(|| FetchError::body(url, error))
    }

    fn live_context_error(&self, url: &str) -> Option<FetchError> {
        self.context
            .as_ref()
            .and_then(RequestContext::err)
            .map(|reason| context_error(url, reason))
    }
}

fn location(file: &ResponseFile) -> String {
    file.stat().url().map(ToString::to_string).unwrap_or_default()
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}
