//! Simple Line Access: spectral line list queries.

use vo_core::errors::{DalResult, ParamError};
use vo_core::session::Session;

use crate::params::validate_range_list;
use crate::protocol::Protocol;
use crate::query::DalQuery;
use crate::results::DalResults;

/// A spectral line access service endpoint.
#[derive(Debug, Clone)]
pub struct SlaService {
    base_url: String,
    session: Session,
}

impl SlaService {
    /// Creates a service client for an SLAP endpoint.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            session: Session::new(),
        }
    }

    /// Replaces the session used for requests.
    #[must_use]
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    /// The service endpoint URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Starts a query against this service with `REQUEST=queryData` preset.
    pub fn create_query(&self) -> SlaQuery {
        let mut query = DalQuery::new(&self.base_url, Protocol::Sla, self.session.clone());
        query.set("REQUEST", "queryData");
        SlaQuery { query }
    }

    /// Searches for lines within a wavelength range list in meters.
    pub fn search(&self, wavelength: &str) -> DalResult<DalResults> {
        self.create_query().with_wavelength(wavelength)?.execute()
    }
}

/// A line list query under construction.
#[derive(Debug, Clone)]
pub struct SlaQuery {
    query: DalQuery,
}

impl SlaQuery {
    /// Constrains the line wavelength as a range list in meters, e.g.
    /// `5.1e-7/5.6e-7`.
    pub fn with_wavelength(mut self, wavelength: &str) -> Result<Self, ParamError> {
        validate_range_list("WAVELENGTH", wavelength)?;
        self.query.set("WAVELENGTH", wavelength);
        Ok(self)
    }

    /// Constrains the response format (`metadata` or a MIME type).
    #[must_use]
    pub fn with_format(mut self, format: &str) -> Self {
        self.query.set("FORMAT", format);
        self
    }

    /// The wavelength constraint currently set, when any.
    pub fn wavelength(&self) -> Option<&str> {
        self.query.get("WAVELENGTH")
    }

    /// The underlying generic query.
    pub fn query(&self) -> &DalQuery {
        &self.query
    }

    /// Serializes the query into its GET URL.
    pub fn query_url(&self) -> String {
        self.query.query_url()
    }

    /// Submits the query and wraps the response.
    pub fn execute(&self) -> DalResult<DalResults> {
        self.query.execute()
    }
}
