//! The copy-on-write request builder.
//!
//! Every configuration method borrows the current [`Request`] and returns a
//! new one with a single field changed. The original stays usable, so a
//! common base can be shared and specialized freely:
//!
//! ```
//! use fetch_core::Request;
//!
//! let base = Request::get("https://api.example.com/items").header("Accept", "application/json");
//! let page_one = base.query("page", 1);
//! let page_two = base.query("page", 2);
//! assert_eq!(base.query_pairs().len(), 0);
//! assert_eq!(page_one.query_pairs().len(), 1);
//! assert_eq!(page_two.query_pairs().len(), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use url::form_urlencoded;

use super::constants::{FORM_MIME, JSON_MIME, LOCAL_AUTHORITY};
use super::context::RequestContext;
use super::error::FetchError;
use super::pair::{Pair, PairList, Value, canonical_header_key};
use crate::limit::Limiter;
use crate::transport::{Transport, default_transport};

/// User name and optional password placed in the URL user-info.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: Option<String>,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: Option<String>) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    /// The user name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password, if one was given.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// An HTTP request under construction.
///
/// Cloning is cheap: the transport, limiter and context are shared by
/// reference; everything else is owned per value.
#[derive(Debug, Clone)]
pub struct Request {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) context: Option<RequestContext>,
    pub(crate) method: String,
    pub(crate) url: String,
    pub(crate) query: PairList,
    pub(crate) header: PairList,
    pub(crate) user: Option<Credentials>,
    pub(crate) limiter: Option<Arc<dyn Limiter>>,
    pub(crate) body: Option<Bytes>,
    pub(crate) body_mime: Option<String>,
}

impl Request {
    /// Creates a request for an arbitrary method.
    ///
    /// URLs starting with `/` or `:` are resolved against
    /// `http://localhost`, and any `?query` written into the URL is
    /// discarded: use [`query`](Self::query) instead.
    #[must_use]
    pub fn new(method: impl Into<String>, url: impl AsRef<str>) -> Self {
        Self {
            transport: default_transport(),
            context: None,
            method: method.into(),
            url: normalize_url(url.as_ref()),
            query: PairList::new(),
            header: PairList::new(),
            user: None,
            limiter: None,
            body: None,
            body_mime: None,
        }
    }

    /// `GET url`.
    #[must_use]
    pub fn get(url: impl AsRef<str>) -> Self {
        Self::new(Method::GET.as_str(), url)
    }

    /// `POST url`.
    #[must_use]
    pub fn post(url: impl AsRef<str>) -> Self {
        Self::new(Method::POST.as_str(), url)
    }

    /// `PUT url`.
    #[must_use]
    pub fn put(url: impl AsRef<str>) -> Self {
        Self::new(Method::PUT.as_str(), url)
    }

    /// `DELETE url`.
    #[must_use]
    pub fn delete(url: impl AsRef<str>) -> Self {
        Self::new(Method::DELETE.as_str(), url)
    }

    /// `HEAD url`.
    #[must_use]
    pub fn head(url: impl AsRef<str>) -> Self {
        Self::new(Method::HEAD.as_str(), url)
    }

    /// `PATCH url`.
    #[must_use]
    pub fn patch(url: impl AsRef<str>) -> Self {
        Self::new(Method::PATCH.as_str(), url)
    }

    fn with(&self, update: impl FnOnce(&mut Self)) -> Self {
        let mut next = self.clone();
        update(&mut next);
        next
    }

    /// Uses `client` instead of the shared default client.
    #[must_use]
    pub fn client<T: Transport + 'static>(&self, client: T) -> Self {
        self.transport(Arc::new(client))
    }

    /// Uses a shared transport instead of the default client.
    #[must_use]
    pub fn transport(&self, transport: Arc<dyn Transport>) -> Self {
        self.with(|r| r.transport = transport)
    }

    /// Attaches a cancellation context to the dispatch and the body reads.
    #[must_use]
    pub fn context(&self, context: RequestContext) -> Self {
        self.with(|r| r.context = Some(context))
    }

    /// Adds a query parameter.
    ///
    /// Values rendering as `""`, `"0"` or `"false"` are not sent. Repeating
    /// a key sends every surviving value, in order.
    #[must_use]
    pub fn query(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query_values(key, [value])
    }

    /// Adds a query parameter with several candidate values; only the last
    /// one is used.
    #[must_use]
    pub fn query_values<V: Into<Value>>(
        &self,
        key: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let pair = Pair::new(key, values.into_iter().map(Into::into).collect());
        self.with(|r| r.query.push(pair))
    }

    /// Adds a header. The key is canonicalized (`content-type` → `Content-Type`).
    ///
    /// The same omission rule as for [`query`](Self::query) applies.
    #[must_use]
    pub fn header(&self, key: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.header_values(key, [value])
    }

    /// Adds a header with several candidate values; only the last one is used.
    #[must_use]
    pub fn header_values<V: Into<Value>>(
        &self,
        key: impl AsRef<str>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let pair = Pair::new(
            canonical_header_key(key.as_ref()),
            values.into_iter().map(Into::into).collect(),
        );
        self.with(|r| r.header.push(pair))
    }

    /// Sets the `User-Agent` header.
    #[must_use]
    pub fn user_agent(&self, user_agent: impl Into<String>) -> Self {
        self.header("User-Agent", user_agent.into())
    }

    /// Sets the `Authorization` header verbatim.
    #[must_use]
    pub fn authorization(&self, auth_header: impl Into<String>) -> Self {
        self.header("Authorization", auth_header.into())
    }

    /// Sets the URL user name (no password).
    #[must_use]
    pub fn user(&self, username: impl Into<String>) -> Self {
        let credentials = Credentials::new(username, None);
        self.with(|r| r.user = Some(credentials))
    }

    /// Sets the URL user name and password.
    #[must_use]
    pub fn user_password(&self, username: impl Into<String>, password: impl Into<String>) -> Self {
        let credentials = Credentials::new(username, Some(password.into()));
        self.with(|r| r.user = Some(credentials))
    }

    /// Sets a raw body and its MIME type.
    #[must_use]
    pub fn body(&self, data: impl Into<Bytes>, mime: impl Into<String>) -> Self {
        let data = data.into();
        let mime = mime.into();
        self.with(|r| {
            r.body = Some(data);
            r.body_mime = Some(mime);
        })
    }

    /// Sets a URL-encoded form body.
    #[must_use]
    pub fn form<K, V>(&self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in fields {
            serializer.append_pair(key.as_ref(), value.as_ref());
        }
        self.body(serializer.finish(), FORM_MIME)
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Serialize`] if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<Self, FetchError> {
        let data = serde_json::to_vec(value).map_err(|source| FetchError::Serialize { source })?;
        Ok(self.body(data, JSON_MIME))
    }

    /// Waits on `limiter` before every dispatch of this request.
    #[must_use]
    pub fn limit(&self, limiter: Arc<dyn Limiter>) -> Self {
        self.with(|r| r.limiter = Some(limiter))
    }

    /// The method string.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The normalized base URL (never contains a query).
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Configured query entries, including ones that will be omitted.
    #[must_use]
    pub fn query_pairs(&self) -> &PairList {
        &self.query
    }

    /// Configured header entries, including ones that will be omitted.
    #[must_use]
    pub fn header_pairs(&self) -> &PairList {
        &self.header
    }

    /// The URL credentials.
    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.user.as_ref()
    }

    /// The body bytes.
    #[must_use]
    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// The body MIME type.
    #[must_use]
    pub fn body_mime(&self) -> Option<&str> {
        self.body_mime.as_deref()
    }

    /// The attached context.
    #[must_use]
    pub fn request_context(&self) -> Option<&RequestContext> {
        self.context.as_ref()
    }

    /// The attached limiter.
    #[must_use]
    pub fn limiter(&self) -> Option<&Arc<dyn Limiter>> {
        self.limiter.as_ref()
    }
}

/// Resolves `/path` and `:port/path` against the local authority and drops
/// any query written into the URL (a fragment is kept).
fn normalize_url(url: &str) -> String {
    let mut url = if url.starts_with('/') || url.starts_with(':') {
        format!("{LOCAL_AUTHORITY}{url}")
    } else {
        url.to_string()
    };
    let end = url.find('#').unwrap_or(url.len());
    if let Some(start) = url[..end].find('?') {
        url.replace_range(start..end, "");
    }
    url
}
