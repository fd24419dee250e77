//! Simple Image Access: image searches over sky regions.

use vo_core::errors::{DalResult, ParamError};
use vo_core::session::Session;

use crate::params::{validate_image_format, validate_verbosity, Intersect, Pos, Size};
use crate::protocol::Protocol;
use crate::query::DalQuery;
use crate::results::DalResults;

/// An image access service endpoint.
#[derive(Debug, Clone)]
pub struct SiaService {
    base_url: String,
    session: Session,
}

impl SiaService {
    /// Creates a service client for an SIA endpoint.
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
    pub fn create_query(&self) -> SiaQuery {
        SiaQuery {
            query: DalQuery::new(&self.base_url, Protocol::Sia, self.session.clone()),
        }
    }

    /// Runs an image search centered on `(ra, dec)` with the given size, in
    /// degrees.
    pub fn search(&self, ra: f64, dec: f64, size: &[f64]) -> DalResult<DalResults> {
        self.create_query().with_pos(ra, dec)?.with_size(size)?.execute()
    }
}

/// An image search query under construction.
#[derive(Debug, Clone)]
pub struct SiaQuery {
    query: DalQuery,
}

impl SiaQuery {
    /// Sets the search region center.
    pub fn with_pos(mut self, ra: f64, dec: f64) -> Result<Self, ParamError> {
        let pos = Pos::new(ra, dec)?;
        self.query.set("POS", pos.to_wire());
        Ok(self)
    }

    /// Sets the search region size: one component for a square region, two
    /// for the RA and Dec axes.
    pub fn with_size(mut self, size: &[f64]) -> Result<Self, ParamError> {
        let size = Size::new(size)?;
        self.query.set("SIZE", size.to_wire());
        Ok(self)
    }

    /// Constrains the returned image formats.
    pub fn with_format(mut self, format: &str) -> Result<Self, ParamError> {
        self.query.set("FORMAT", validate_image_format(format)?);
        Ok(self)
    }

    /// Sets the region intersection mode.
    pub fn with_intersect(mut self, intersect: Intersect) -> Self {
        self.query.set("INTERSECT", intersect.to_string());
        self
    }

    /// Sets the region intersection mode from its wire value.
    pub fn with_intersect_str(self, intersect: &str) -> Result<Self, ParamError> {
        Ok(self.with_intersect(Intersect::from_wire(intersect)?))
    }

    /// Sets the verbosity of the returned columns, `0..=3`.
    pub fn with_verbosity(mut self, level: u8) -> Result<Self, ParamError> {
        self.query
            .set("VERB", validate_verbosity(level, 3)?.to_string());
        Ok(self)
    }

    /// The search center currently set, when any.
    pub fn pos(&self) -> Option<(f64, f64)> {
        let raw = self.query.get("POS")?;
        let (ra, dec) = raw.split_once(',')?;
        Some((ra.parse().ok()?, dec.parse().ok()?))
    }

    /// The region size components currently set, when any.
    pub fn size(&self) -> Option<Vec<f64>> {
        self.query
            .get("SIZE")?
            .split(',')
            .map(|part| part.parse().ok())
            .collect()
    }

    /// The format constraint currently set, when any.
    pub fn format(&self) -> Option<&str> {
        self.query.get("FORMAT")
    }

    /// The intersection mode currently set, when any.
    pub fn intersect(&self) -> Option<Intersect> {
        Intersect::from_wire(self.query.get("INTERSECT")?).ok()
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
