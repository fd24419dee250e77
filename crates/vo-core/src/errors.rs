//! The error vocabulary every failure in this workspace is normalized into.

use thiserror::Error;

use crate::votable::VoTableError;

/// Convenience alias for results returned from DAL operations.
pub type DalResult<T> = Result<T, AccessError>;

/// Root error type covering every failure mode raised by the client crates.
///
/// Matching on this enum separates transport failures, unusable response
/// bodies, server-reported query failures, and local parameter validation.
#[derive(Error, Debug)]
pub enum AccessError {
    /// Failure reaching or talking to the remote service.
    #[error("{0}")]
    Service(#[from] ServiceError),
    /// The response could not be interpreted as a valid result table.
    #[error("{0}")]
    Format(#[from] FormatError),
    /// The service understood the request but reported a logical failure.
    #[error("{0}")]
    Query(#[from] QueryError),
    /// A constraint violation caught client-side before any request.
    #[error("{0}")]
    Param(#[from] ParamError),
}

impl AccessError {
    /// Returns the URL of the request that failed, when recorded.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Service(e) => e.url(),
            Self::Format(e) => e.url(),
            Self::Query(e) => e.url(),
            Self::Param(_) => None,
        }
    }
}

/// Transport or HTTP failure while reaching the remote service.
#[derive(Error, Debug)]
#[error("{reason}")]
pub struct ServiceError {
    pub(crate) reason: String,
    pub(crate) code: Option<u16>,
    pub(crate) url: Option<String>,
    pub(crate) protocol: Option<String>,
    pub(crate) version: Option<String>,
}

impl ServiceError {
    /// Creates a service error from a bare reason string.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            code: None,
            url: None,
            protocol: None,
            version: None,
        }
    }

    /// Creates a service error from a non-2xx HTTP response.
    ///
    /// The body is used as the reason when the server sent one, otherwise the
    /// status line stands in.
    pub fn from_response(code: u16, body: &str, url: impl Into<String>) -> Self {
        let body = body.trim();
        let reason = if body.is_empty() {
            format!("HTTP error {code}")
        } else {
            body.to_string()
        };
        Self {
            reason,
            code: Some(code),
            url: Some(url.into()),
            protocol: None,
            version: None,
        }
    }

    /// Creates a service error from a transport-layer `reqwest` failure.
    pub fn from_reqwest(err: &reqwest::Error, url: Option<&str>) -> Self {
        Self {
            reason: err.to_string(),
            code: err.status().map(|status| status.as_u16()),
            url: url
                .map(str::to_string)
                .or_else(|| err.url().map(|u| u.as_str().to_string())),
            protocol: None,
            version: None,
        }
    }

    /// Creates a service error from an arbitrary causing error.
    ///
    /// The reason takes the form `"<TypeName>: <message>"` and no HTTP code
    /// is recorded.
    pub fn from_cause<E: std::error::Error>(err: &E) -> Self {
        let name = std::any::type_name::<E>()
            .rsplit("::")
            .next()
            .unwrap_or("Error");
        Self::new(format!("{name}: {err}"))
    }

    /// Attaches the request URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attaches the protocol tag and version of the failed request.
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>, version: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self.version = Some(version.into());
        self
    }

    /// HTTP status code, when one was received.
    pub fn code(&self) -> Option<u16> {
        self.code
    }

    /// Human-readable description of the failure.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// URL of the failed request, when recorded.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Protocol tag of the failed request, when recorded.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// Protocol version of the failed request, when recorded.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

/// The response body could not be used to build records.
#[derive(Error, Debug)]
#[error("{reason}")]
pub struct FormatError {
    pub(crate) reason: String,
    pub(crate) url: Option<String>,
    pub(crate) protocol: Option<String>,
    pub(crate) version: Option<String>,
}

impl FormatError {
    /// Creates a format error from a bare reason string.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            url: None,
            protocol: None,
            version: None,
        }
    }

    /// Attaches the request URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attaches the protocol tag and version of the failed request.
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>, version: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self.version = Some(version.into());
        self
    }

    /// Human-readable description of the failure.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// URL of the failed request, when recorded.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Protocol tag of the failed request, when recorded.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// Protocol version of the failed request, when recorded.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl From<VoTableError> for FormatError {
    fn from(err: VoTableError) -> Self {
        Self::new(err.to_string())
    }
}

/// The service reported a logical failure through its status mechanism.
#[derive(Error, Debug)]
#[error("{reason}")]
pub struct QueryError {
    pub(crate) label: String,
    pub(crate) reason: String,
    pub(crate) url: Option<String>,
    pub(crate) protocol: Option<String>,
    pub(crate) version: Option<String>,
}

impl QueryError {
    /// Creates a query error from the server's error label and message.
    pub fn new(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            reason: reason.into(),
            url: None,
            protocol: None,
            version: None,
        }
    }

    /// Attaches the request URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attaches the protocol tag and version of the failed request.
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>, version: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self.version = Some(version.into());
        self
    }

    /// Error name reported by the server (typically `"ERROR"`).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Human-readable message reported by the server.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// URL of the failed request, when recorded.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Protocol tag of the failed request, when recorded.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// Protocol version of the failed request, when recorded.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

/// Client-side parameter validation failure, raised before any request.
#[derive(Error, Debug)]
pub enum ParamError {
    /// A numeric constraint value fell outside its legal range.
    #[error("{name} value {value} out of range, expected {expected}")]
    OutOfRange {
        /// Parameter name as sent on the wire.
        name: &'static str,
        /// Offending value, formatted for display.
        value: String,
        /// Description of the legal range.
        expected: &'static str,
    },
    /// A value was not a member of the parameter's enumerated domain.
    #[error("{name} does not accept \"{value}\"")]
    UnknownValue {
        /// Parameter name as sent on the wire.
        name: &'static str,
        /// Offending value.
        value: String,
    },
    /// A range-list constraint did not match the required syntax.
    #[error("malformed {name} range list: \"{value}\"")]
    BadRangeList {
        /// Parameter name as sent on the wire.
        name: &'static str,
        /// Offending value.
        value: String,
    },
    /// A cursor was scrolled outside the result set.
    #[error("scroll position {position} out of range for {len} rows")]
    ScrollOutOfRange {
        /// Requested absolute row position.
        position: i64,
        /// Number of rows in the result set.
        len: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_from_response_keeps_code_and_body() {
        let err = ServiceError::from_response(404, "no such table", "http://example.org/q");
        assert_eq!(err.code(), Some(404));
        assert!(err.reason().contains("no such table"));
        assert_eq!(err.url(), Some("http://example.org/q"));
    }

    #[test]
    fn service_error_from_response_falls_back_to_status() {
        let err = ServiceError::from_response(503, "  ", "http://example.org/q");
        assert_eq!(err.reason(), "HTTP error 503");
    }

    #[test]
    fn service_error_from_cause_names_the_error_type() {
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ServiceError::from_cause(&cause);
        assert_eq!(err.code(), None);
        assert_eq!(err.reason(), "Error: refused");
    }

    #[test]
    fn query_error_displays_reason_only() {
        let err = QueryError::new("ERROR", "Forced Fail");
        assert_eq!(err.label(), "ERROR");
        assert_eq!(err.to_string(), "Forced Fail");
    }

    #[test]
    fn access_error_carries_context_through() {
        let err: AccessError = ServiceError::new("down")
            .with_url("http://example.org/sia")
            .with_protocol("sia", "1.0")
            .into();
        assert_eq!(err.url(), Some("http://example.org/sia"));
    }
}
