//! The generic query object every protocol builder wraps.

use url::form_urlencoded;

use vo_core::errors::{DalResult, FormatError};
use vo_core::session::Session;
use vo_core::votable::{parse_votable, VoTable};

use crate::protocol::Protocol;
use crate::results::DalResults;

/// HTTP method used to submit a query.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum HttpMethod {
    /// Parameters serialized into the query string.
    #[default]
    Get,
    /// Parameters submitted as a form-encoded body.
    Post,
}

/// An accumulating, order-stable set of named query parameters bound to a
/// service endpoint.
///
/// Queries are reusable: every `execute*` call re-serializes the current
/// parameters and re-issues the request.
#[derive(Debug, Clone)]
pub struct DalQuery {
    base_url: String,
    protocol: Protocol,
    version: String,
    params: Vec<(String, String)>,
    method: HttpMethod,
    session: Session,
}

impl DalQuery {
    /// Creates an empty query against a service endpoint.
    pub fn new(base_url: impl Into<String>, protocol: Protocol, session: Session) -> Self {
        Self {
            base_url: base_url.into(),
            protocol,
            version: protocol.default_version().to_string(),
            params: Vec::new(),
            method: HttpMethod::Get,
            session,
        }
    }

    /// Overrides the protocol version recorded in error context.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Overrides the HTTP method used on execution.
    #[must_use]
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// The service endpoint this query runs against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The protocol tag of this query.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// The protocol version of this query.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The session requests are issued through.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Sets a parameter, replacing any previous value in place.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(entry) = self.params.iter_mut().find(|(n, _)| n == name) {
            entry.1 = value;
        } else {
            self.params.push((name.to_string(), value));
        }
    }

    /// Sets a parameter from a sequence, serialized as a comma list.
    pub fn set_seq<I, T>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        let joined = values
            .into_iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.set(name, joined);
    }

    /// Returns the current value of a parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Removes a parameter, returning its previous value.
    pub fn unset(&mut self, name: &str) -> Option<String> {
        let index = self.params.iter().position(|(n, _)| n == name)?;
        Some(self.params.remove(index).1)
    }

    /// The parameters in insertion order.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Serializes the query into a GET URL.
    ///
    /// Appends with `&` when the endpoint already carries a query string.
    pub fn query_url(&self) -> String {
        if self.params.is_empty() {
            return self.base_url.clone();
        }
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.params {
            serializer.append_pair(name, value);
        }
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.base_url, separator, serializer.finish())
    }

    /// Submits the query and returns the raw response stream.
    pub fn execute_stream(&self) -> DalResult<reqwest::blocking::Response> {
        let response = match self.method {
            HttpMethod::Get => self.session.get(&self.query_url()),
            HttpMethod::Post => self.session.post_form(&self.base_url, &self.params),
        };
        response
            .map_err(|err| err.with_protocol(self.protocol.as_str(), self.version.as_str()).into())
    }

    /// Submits the query and reads the full response body.
    pub fn execute_raw(&self) -> DalResult<Vec<u8>> {
        let url = self.query_url();
        let response = self.execute_stream()?;
        let bytes = response.bytes().map_err(|err| {
            vo_core::errors::ServiceError::from_reqwest(&err, Some(&url))
                .with_protocol(self.protocol.as_str(), self.version.as_str())
        })?;
        Ok(bytes.to_vec())
    }

    /// Submits the query and parses the response as a VOTable.
    pub fn execute_votable(&self) -> DalResult<VoTable> {
        let raw = self.execute_raw()?;
        parse_votable(&raw).map_err(|err| {
            FormatError::from(err)
                .with_url(self.query_url())
                .with_protocol(self.protocol.as_str(), self.version.as_str())
                .into()
        })
    }

    /// Submits the query and wraps the response as navigable results.
    pub fn execute(&self) -> DalResult<DalResults> {
        let votable = self.execute_votable()?;
        DalResults::new(
            votable,
            self.protocol,
            &self.version,
            Some(self.query_url()),
            self.session.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> DalQuery {
        DalQuery::new("http://example.org/sia", Protocol::Sia, Session::new())
    }

    #[test]
    fn parameters_keep_insertion_order() {
        let mut q = query();
        q.set("POS", "202.48,47.23");
        q.set("SIZE", "0.25");
        q.set("POS", "10,20");
        assert_eq!(
            q.params(),
            &[
                ("POS".to_string(), "10,20".to_string()),
                ("SIZE".to_string(), "0.25".to_string()),
            ]
        );
        assert_eq!(q.get("SIZE"), Some("0.25"));
        assert_eq!(q.unset("SIZE"), Some("0.25".to_string()));
        assert_eq!(q.get("SIZE"), None);
    }

    #[test]
    fn query_url_percent_encodes_values() {
        let mut q = query();
        q.set("POS", "202.48,47.23");
        q.set("FORMAT", "image/fits");
        assert_eq!(
            q.query_url(),
            "http://example.org/sia?POS=202.48%2C47.23&FORMAT=image%2Ffits"
        );
    }

    #[test]
    fn query_url_appends_to_existing_query_string() {
        let mut q = DalQuery::new(
            "http://example.org/cgi?survey=dss",
            Protocol::Cone,
            Session::new(),
        );
        q.set("RA", "12.5");
        assert_eq!(q.query_url(), "http://example.org/cgi?survey=dss&RA=12.5");
    }

    #[test]
    fn sequences_serialize_as_comma_lists() {
        let mut q = query();
        q.set_seq("SIZE", [0.5, 0.25]);
        assert_eq!(q.get("SIZE"), Some("0.5,0.25"));
    }
}
