//! Fetch Core Library
//!
//! A fluent, copy-on-write HTTP request builder on top of `reqwest`.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`request`] - the [`Request`] builder, materialization, execution,
//!   status classification and the terminal read/decode/download operations
//! - [`file`] - file-like views of responses ([`ResponseFile`]) and local files
//! - [`limit`] - rate-limit admission ([`TokenBucket`], [`DomainLimiter`])
//! - [`transport`] - the dispatch seam and the shared default client

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod file;
pub mod limit;
pub mod request;
pub mod transport;
pub(crate) mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use file::{File, FileInfo, LocalFile, ResponseFile};
pub use limit::{AdmissionError, DomainLimiter, Limiter, TokenBucket};
pub use request::{
    ContextError, Credentials, ErrorKind, FetchError, MaterializedRequest, Pair, PairList,
    Request, RequestContext, RequestIdentity, Value,
};
pub use transport::{Transport, TransportConfig, default_transport};
