//! Simple Spectral Access: spectrum searches over sky positions and bands.

use vo_core::errors::{DalResult, ParamError};
use vo_core::session::Session;

use crate::params::{
    validate_radius, validate_range_list, validate_spectrum_format, validate_time_list, Pos,
};
use crate::protocol::Protocol;
use crate::query::DalQuery;
use crate::results::DalResults;

/// A spectral access service endpoint.
#[derive(Debug, Clone)]
pub struct SsaService {
    base_url: String,
    session: Session,
}

impl SsaService {
    /// Creates a service client for an SSA endpoint.
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
    pub fn create_query(&self) -> SsaQuery {
        let mut query = DalQuery::new(&self.base_url, Protocol::Ssa, self.session.clone());
        query.set("REQUEST", "queryData");
        SsaQuery { query }
    }

    /// Runs a spectrum search around `(ra, dec)` with the given diameter, in
    /// degrees.
    pub fn search(&self, ra: f64, dec: f64, diameter: f64) -> DalResult<DalResults> {
        self.create_query()
            .with_pos(ra, dec)?
            .with_diameter(diameter)?
            .execute()
    }
}

/// A spectrum search query under construction.
#[derive(Debug, Clone)]
pub struct SsaQuery {
    query: DalQuery,
}

impl SsaQuery {
    /// Sets the search center.
    pub fn with_pos(mut self, ra: f64, dec: f64) -> Result<Self, ParamError> {
        let pos = Pos::new(ra, dec)?;
        self.query.set("POS", pos.to_wire());
        Ok(self)
    }

    /// Sets the search diameter in degrees, `(0, 180]`.
    pub fn with_diameter(mut self, diameter: f64) -> Result<Self, ParamError> {
        self.query
            .set("SIZE", validate_radius("SIZE", diameter)?.to_string());
        Ok(self)
    }

    /// Constrains the spectral band as a range list in meters, e.g.
    /// `1e-7/2e-6`.
    pub fn with_band(mut self, band: &str) -> Result<Self, ParamError> {
        validate_range_list("BAND", band)?;
        self.query.set("BAND", band);
        Ok(self)
    }

    /// Constrains the observation epoch as an ISO-8601 range list.
    pub fn with_time(mut self, time: &str) -> Result<Self, ParamError> {
        validate_time_list("TIME", time)?;
        self.query.set("TIME", time);
        Ok(self)
    }

    /// Constrains the returned spectrum formats.
    pub fn with_format(mut self, format: &str) -> Result<Self, ParamError> {
        self.query.set("FORMAT", validate_spectrum_format(format)?);
        Ok(self)
    }

    /// The search center currently set, when any.
    pub fn pos(&self) -> Option<(f64, f64)> {
        let raw = self.query.get("POS")?;
        let (ra, dec) = raw.split_once(',')?;
        Some((ra.parse().ok()?, dec.parse().ok()?))
    }

    /// The band constraint currently set, when any.
    pub fn band(&self) -> Option<&str> {
        self.query.get("BAND")
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
