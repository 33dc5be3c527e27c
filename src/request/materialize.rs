//! Turns a [`Request`] into one wire-ready `reqwest::Request`.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use url::{Url, form_urlencoded};

use super::builder::{Credentials, Request};
use super::context::RequestContext;
use super::error::FetchError;
use super::pair::PairList;

/// A concrete outbound request plus the context that bounds its dispatch.
///
/// Produced fresh for every execution and consumed by it.
#[derive(Debug)]
pub struct MaterializedRequest {
    request: reqwest::Request,
    context: Option<RequestContext>,
}

impl MaterializedRequest {
    /// The final URL, merged query and user-info included.
    #[must_use]
    pub fn url(&self) -> &Url {
        self.request.url()
    }

    /// The validated method.
    #[must_use]
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// The outgoing header map.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// The body bytes, if a body is attached.
    #[must_use]
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.request.body().and_then(reqwest::Body::as_bytes)
    }

    /// The attached context.
    #[must_use]
    pub fn context(&self) -> Option<&RequestContext> {
        self.context.as_ref()
    }

    /// Splits into the request and its context.
    #[must_use]
    pub fn into_parts(self) -> (reqwest::Request, Option<RequestContext>) {
        (self.request, self.context)
    }
}

impl Request {
    /// Builds the outbound request without sending it.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] if the base URL does not parse
    /// - [`FetchError::CredentialsUnsupported`] if credentials are set on a
    ///   URL without a host
    /// - [`FetchError::InvalidMethod`] if the method is not an HTTP token
    /// - [`FetchError::InvalidHeader`] if a header name or value cannot be sent
    pub fn materialize(&self) -> Result<MaterializedRequest, FetchError> {
        let mut url =
            Url::parse(&self.url).map_err(|source| FetchError::invalid_url(&self.url, source))?;
        merge_query(&mut url, &self.query);
        apply_user_info(&mut url, self.user.as_ref())
            .map_err(|()| FetchError::CredentialsUnsupported { url: self.url.clone() })?;

        let method = Method::from_bytes(self.method.as_bytes())
            .map_err(|_| FetchError::invalid_method(&self.method))?;

        let mut request = reqwest::Request::new(method, url);
        let headers = request.headers_mut();
        append_headers(headers, &self.header)?;

        if let Some(credentials) = &self.user {
            if !headers.contains_key(AUTHORIZATION) {
                headers.insert(AUTHORIZATION, basic_auth(credentials)?);
            }
        }

        if let Some(body) = self.body.as_ref().filter(|body| !body.is_empty()) {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
            *request.body_mut() = Some(reqwest::Body::from(Bytes::clone(body)));
        }

        if let Some(mime) = self.body_mime.as_deref().filter(|mime| !mime.is_empty()) {
            let value = HeaderValue::from_str(mime)
                .map_err(|e| FetchError::invalid_header(CONTENT_TYPE.as_str(), e))?;
            request.headers_mut().insert(CONTENT_TYPE, value);
        }

        Ok(MaterializedRequest {
            request,
            context: self.context.clone(),
        })
    }
}

/// Merges surviving query entries into the URL's own query parameters.
///
/// Keys come out sorted; values under one key keep their order. The query
/// is only replaced when the merged set is non-empty.
fn merge_query(url: &mut Url, pairs: &PairList) {
    let mut merged: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in url.query_pairs() {
        merged.entry(key.into_owned()).or_default().push(value.into_owned());
    }
    for (key, value) in pairs.effective() {
        merged.entry(key.to_string()).or_default().push(value);
    }
    if merged.is_empty() {
        return;
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, values) in &merged {
        for value in values {
            serializer.append_pair(key, value);
        }
    }
    url.set_query(Some(&serializer.finish()));
}

/// Overwrites the URL user-info with `credentials`, clearing it when none
/// are configured. Fails only when credentials are set on a URL that cannot
/// hold them.
fn apply_user_info(url: &mut Url, credentials: Option<&Credentials>) -> Result<(), ()> {
    let (username, password) = credentials.map_or(("", None), |c| (c.username(), c.password()));
    url.set_username(username)
        .and_then(|()| url.set_password(password))
        .or_else(|()| if credentials.is_none() { Ok(()) } else { Err(()) })
}

fn append_headers(headers: &mut HeaderMap, pairs: &PairList) -> Result<(), FetchError> {
    for (key, value) in pairs.effective() {
        let name =
            HeaderName::from_bytes(key.as_bytes()).map_err(|e| FetchError::invalid_header(key, e))?;
        let value = HeaderValue::from_str(&value).map_err(|e| FetchError::invalid_header(key, e))?;
        headers.append(name, value);
    }
    Ok(())
}

fn basic_auth(credentials: &Credentials) -> Result<HeaderValue, FetchError> {
    let token = STANDARD.encode(format!(
        "{}:{}",
        credentials.username(),
        credentials.password().unwrap_or_default()
    ));
    let mut value = HeaderValue::from_str(&format!("Basic {token}"))
        .map_err(|e| FetchError::invalid_header(AUTHORIZATION.as_str(), e))?;
    value.set_sensitive(true);
    Ok(value)
}

/// A copy of `url` safe to show in logs and errors: the password is masked.
pub(crate) fn redacted(url: &Url) -> Url {
    let mut shown = url.clone();
    if shown.password().is_some() {
        let _ = shown.set_password(Some("xxxxx"));
    }
    shown
}
