//! Rate-limit admission for outgoing requests.
//!
//! A request with an attached [`Limiter`] waits in [`Limiter::admit`] before
//! it is dispatched. The wait is unbounded: it does not observe the request's
//! cancellation context. Two implementations are provided:
//!
//! - [`TokenBucket`] - a global rate with a burst allowance
//! - [`DomainLimiter`] - a minimum spacing between requests to the same host
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fetch_core::{Request, TokenBucket};
//!
//! # async fn example() -> Result<(), fetch_core::FetchError> {
//! let limiter = Arc::new(TokenBucket::new(5.0, 1));
//! let base = Request::get("https://example.com/items").limit(limiter);
//! for page in 1..=3 {
//!     let body = base.query("page", page).read_string().await?;
//!     println!("{body}");
//! }
//! # Ok(())
//! # }
//! ```

mod bucket;
mod domain;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

pub use bucket::TokenBucket;
pub use domain::DomainLimiter;

/// Hard rejections a limiter can signal instead of waiting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// The request needs more tokens than the bucket can ever hold.
    #[error("request needs {requested} token(s) but limiter burst is {burst}")]
    BurstExceeded {
        /// Tokens needed by the request.
        requested: u32,
        /// Bucket capacity.
        burst: u32,
    },

    /// The bucket is empty and cannot refill a token in any representable time.
    #[error("limiter has no capacity left and no usable refill rate")]
    Exhausted,
}

/// Blocking admission primitive consulted before every dispatch.
///
/// Implementations must be safe to share across tasks; the request builder
/// holds them behind an `Arc` and adds no locking of its own.
#[async_trait]
pub trait Limiter: Send + Sync + fmt::Debug {
    /// Waits until a request to `url` may be sent.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError`] when the limiter refuses outright; the
    /// request is then never dispatched.
    async fn admit(&self, url: &Url) -> Result<(), AdmissionError>;
}
