//! Simple Cone Search: positional queries against remote catalogs.

use vo_core::errors::{DalResult, ParamError};
use vo_core::session::Session;

use crate::params::{validate_radius, validate_verbosity, Pos};
use crate::protocol::Protocol;
use crate::query::DalQuery;
use crate::results::DalResults;

/// A cone search service endpoint.
#[derive(Debug, Clone)]
pub struct ScsService {
    base_url: String,
    session: Session,
}

impl ScsService {
    /// Creates a service client for a cone search endpoint.
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

    /// Starts an empty query against this service.
    pub fn create_query(&self) -> ScsQuery {
        ScsQuery {
            query: DalQuery::new(&self.base_url, Protocol::Cone, self.session.clone()),
        }
    }

    /// Runs a cone search around `(ra, dec)` with the given radius, all in
    /// degrees.
    pub fn search(&self, ra: f64, dec: f64, radius: f64) -> DalResult<DalResults> {
        self.create_query().with_pos(ra, dec)?.with_radius(radius)?.execute()
    }
}

/// A cone search query under construction.
#[derive(Debug, Clone)]
pub struct ScsQuery {
    query: DalQuery,
}

impl ScsQuery {
    /// Sets the search center; declination is validated, right ascension
    /// normalized into `[0, 360)`.
    pub fn with_pos(mut self, ra: f64, dec: f64) -> Result<Self, ParamError> {
        let pos = Pos::new(ra, dec)?;
        self.query.set("RA", pos.ra().to_string());
        self.query.set("DEC", pos.dec().to_string());
        Ok(self)
    }

    /// Sets the search radius in degrees, `(0, 180]`.
    pub fn with_radius(mut self, radius: f64) -> Result<Self, ParamError> {
        self.query.set("SR", validate_radius("SR", radius)?.to_string());
        Ok(self)
    }

    /// Sets the verbosity of the returned columns, `0..=3`.
    pub fn with_verbosity(mut self, level: u8) -> Result<Self, ParamError> {
        self.query
            .set("VERB", validate_verbosity(level, 3)?.to_string());
        Ok(self)
    }

    /// The right ascension currently set, when any.
    pub fn ra(&self) -> Option<f64> {
        self.query.get("RA")?.parse().ok()
    }

    /// The declination currently set, when any.
    pub fn dec(&self) -> Option<f64> {
        self.query.get("DEC")?.parse().ok()
    }

    /// The search radius currently set, when any.
    pub fn radius(&self) -> Option<f64> {
        self.query.get("SR")?.parse().ok()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pos_roundtrips_through_the_query() {
        let query = ScsService::new("http://example.org/scs")
            .create_query()
            .with_pos(-30.0, 47.23)
            .unwrap();
        assert_eq!(query.ra(), Some(330.0));
        assert_eq!(query.dec(), Some(47.23));
    }

    #[test]
    fn invalid_declination_fails_before_any_request() {
        let query = ScsService::new("http://example.org/scs").create_query();
        assert!(matches!(
            query.with_pos(10.0, 91.0),
            Err(ParamError::OutOfRange { name: "DEC", .. })
        ));
    }

    #[test]
    fn query_url_carries_scs_parameters() {
        let url = ScsService::new("http://example.org/scs")
            .create_query()
            .with_pos(12.5, -30.0)
            .unwrap()
            .with_radius(0.5)
            .unwrap()
            .query_url();
        assert_eq!(url, "http://example.org/scs?RA=12.5&DEC=-30&SR=0.5");
    }

    #[test]
    fn verbosity_is_bounded() {
        let query = ScsService::new("http://example.org/scs").create_query();
        assert!(query.with_verbosity(4).is_err());
    }
}
