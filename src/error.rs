//! Error types for Centreon API calls.
//!
//! The taxonomy separates caller mistakes ([`Error::Usage`]) from remote
//! failures ([`Error::Request`], [`Error::Allocation`]) and from endpoints
//! that answer with something other than JSON ([`Error::Content`]). A
//! missing record is never an error: detail lookups that hit a 404 surface
//! as `Ok(None)` so callers can write plain existence checks.
//!
//! No error is ever retried by this crate; the caller decides whether a
//! conflict or a request failure warrants another attempt.

use http::StatusCode;
use serde_json::Value;

/// The main error type for Centreon API calls.
///
/// # Examples
///
/// ```no_run
/// use centreon_api::{Api, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let api = Api::builder()
///     .url("https://centreon.example.com/centreon")?
///     .token("d6f4e314a5b5fefd164995169f28ae32d987704f")
///     .build()?;
///
/// let hosts = api.configuration().endpoint("hosts");
/// match hosts.get(42).await {
///     Ok(Some(host)) => println!("found: {}", host),
///     Ok(None) => println!("no such host"),
///     Err(Error::Request { status, .. }) => eprintln!("request failed: {}", status),
///     Err(e) => eprintln!("other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection failed, DNS lookup
    /// failed, body transfer aborted, etc.).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The caller misused the API: bad argument shape, reserved filter
    /// field, ambiguous `get`, page without a positive limit. Raised
    /// before any request is issued where possible.
    #[error("{0}")]
    Usage(String),

    /// The server answered with a non-success status.
    ///
    /// Carries the status code and the decoded JSON error body when the
    /// server provided one. The reason phrase is available through
    /// [`Error::reason`].
    #[error("the request to {url} failed with code {status}: {}", body_note(.body))]
    Request {
        /// The URL the failing request was sent to.
        url: String,
        /// The HTTP status code.
        status: StatusCode,
        /// The decoded JSON error body, if the server returned one.
        body: Option<Value>,
    },

    /// The server answered a creating call with HTTP 409.
    ///
    /// Distinct from [`Error::Request`]: a conflict (typically a duplicate
    /// unique key) is an expected outcome the caller may resolve and
    /// retry, not a structural failure.
    #[error("the requested allocation at {url} could not be fulfilled")]
    Allocation {
        /// The URL the conflicting request was sent to.
        url: String,
        /// The decoded JSON error body, if the server returned one.
        body: Option<Value>,
    },

    /// The server answered a success status with a body that is not JSON.
    ///
    /// This signals a misconfigured endpoint or URL rather than a data
    /// problem.
    #[error("invalid content from {url}: {detail}")]
    Content {
        /// The URL that produced the unusable response.
        url: String,
        /// What was wrong with the response body.
        detail: String,
    },

    /// An invalid URL was provided.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

fn body_note(body: &Option<Value>) -> String {
    match body {
        Some(v) => v.to_string(),
        None => "more specific details were not returned in JSON".to_string(),
    }
}

impl Error {
    /// Returns the HTTP status code if this error has one.
    ///
    /// `Allocation` always reports [`StatusCode::CONFLICT`].
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Request { status, .. } => Some(*status),
            Error::Allocation { .. } => Some(StatusCode::CONFLICT),
            _ => None,
        }
    }

    /// Returns the canonical reason phrase for the status, if any.
    pub fn reason(&self) -> Option<&'static str> {
        self.status().and_then(|s| s.canonical_reason())
    }

    /// Returns the decoded JSON error body if the server returned one.
    pub fn body(&self) -> Option<&Value> {
        match self {
            Error::Request { body, .. } => body.as_ref(),
            Error::Allocation { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Returns `true` if this error signals a caller mistake rather than
    /// a remote failure.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_))
    }
}

/// A specialized `Result` type for Centreon API calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_error_includes_decoded_body() {
        let err = Error::Request {
            url: "https://ctn/api/latest/configuration/hosts".to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: Some(json!({"message": "boom"})),
        };
        let text = err.to_string();
        assert!(text.contains("500"));
        assert!(text.contains("boom"));
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(err.reason(), Some("Internal Server Error"));
    }

    #[test]
    fn request_error_without_json_body_falls_back() {
        let err = Error::Request {
            url: "https://ctn/api/latest/configuration/hosts".to_string(),
            status: StatusCode::BAD_GATEWAY,
            body: None,
        };
        assert!(err.to_string().contains("not returned in JSON"));
    }

    #[test]
    fn allocation_reports_conflict_status() {
        let err = Error::Allocation {
            url: "https://ctn/api/latest/configuration/hosts".to_string(),
            body: None,
        };
        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
    }
}
