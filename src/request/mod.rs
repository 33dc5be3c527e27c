//! Fluent HTTP requests.
//!
//! A [`Request`] accumulates method, URL, query parameters, headers, body,
//! credentials, an optional rate limiter and an optional cancellation
//! context. Every configuration call returns a new value and leaves the
//! original untouched. Terminal operations ([`Request::read`],
//! [`Request::read_json`], [`Request::download`], ...) materialize the
//! request, pass limiter admission, dispatch it, and turn any status of 400
//! or above into a classified [`FetchError`].
//!
//! # Example
//!
//! ```no_run
//! use fetch_core::Request;
//!
//! # async fn example() -> Result<(), fetch_core::FetchError> {
//! let api = Request::get("https://api.example.com/search").header("Accept", "application/json");
//!
//! // `false`, `0` and `""` are never sent, so optional flags pass straight through
//! let verbose = false;
//! let body = api.query("q", "tokio").query("verbose", verbose).read_string().await?;
//! println!("{body}");
//! # Ok(())
//! # }
//! ```

mod builder;
mod classify;
pub mod constants;
mod context;
mod error;
mod execute;
mod materialize;
mod pair;
mod terminal;

pub use builder::{Credentials, Request};
pub use classify::{classify, truncate_body};
pub use context::{ContextError, RequestContext};
pub use error::{ErrorKind, FetchError};
pub use execute::RequestIdentity;
pub use materialize::MaterializedRequest;
pub use pair::{Pair, PairList, Value, canonical_header_key, is_omitted};
