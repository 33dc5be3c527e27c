//! Default User-Agent string for requests sent through the shared client.

/// Default User-Agent for requests (identifies the tool and its version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("fetch/{version}")
}
