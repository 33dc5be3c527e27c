//! Admission, dispatch and status triage for one request.

use reqwest::Method;
use reqwest::header::HeaderMap;
use tracing::{debug, instrument};
use url::Url;

use super::builder::Request;
use super::classify::classify;
use super::context::ContextError;
use super::error::FetchError;
use super::materialize::redacted;

/// What was actually sent: method, final URL and headers.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    method: Method,
    url: Url,
    headers: HeaderMap,
}

impl RequestIdentity {
    /// The method sent.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The URL sent, with merged query and user-info.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The headers sent.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl Request {
    /// Sends the request and returns the live response.
    ///
    /// Runs in order: materialization, limiter admission (if a limiter is
    /// attached; this wait ignores the request context), dispatch (bounded
    /// by the context, if any), then status triage. A status of 400 or above
    /// becomes a [`FetchError::Status`] after the error body is drained.
    /// On success the body is left unread.
    ///
    /// # Errors
    ///
    /// Any [`FetchError`] from the steps above.
    #[instrument(skip_all, fields(method = %self.method, url = tracing::field::Empty))]
    pub async fn execute(&self) -> Result<(reqwest::Response, RequestIdentity), FetchError> {
        let (request, context) = self.materialize()?.into_parts();
        let shown = redacted(request.url()).to_string();
        tracing::Span::current().record("url", shown.as_str());

        if let Some(limiter) = &self.limiter {
            limiter
                .admit(request.url())
                .await
                .map_err(|source| FetchError::admission(&shown, source))?;
        }

        let identity = RequestIdentity {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
        };

        let dispatch = self.transport.execute(request);
        let response = match &context {
            Some(context) => context
                .run(dispatch)
                .await
                .map_err(|reason| context_error(&shown, reason))?,
            None => dispatch.await,
        }
        .map_err(|source| FetchError::transport(&shown, source))?;

        let status = response.status();
        debug!(status = status.as_u16(), "response received");

        if status.as_u16() >= 400 {
            return Err(match &context {
                Some(context) => context
                    .run(classify(&shown, response))
                    .await
                    .unwrap_or_else(|reason| context_error(&shown, reason)),
                None => classify(&shown, response).await,
            });
        }

        Ok((response, identity))
    }
}

pub(super) fn context_error(url: &str, reason: ContextError) -> FetchError {
    match reason {
        ContextError::Cancelled => FetchError::Cancelled {
            url: url.to_string(),
        },
        ContextError::DeadlineExceeded => FetchError::DeadlineExceeded {
            url: url.to_string(),
        },
    }
}
