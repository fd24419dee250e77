//! Table Access Protocol: ADQL queries, synchronous and job-based.
//!
//! Asynchronous jobs are driven entirely by caller-invoked methods issuing
//! sequential HTTP calls; there are no timers, polling loops, or retries.

use vo_core::errors::{DalResult, FormatError, ServiceError};
use vo_core::session::Session;
use vo_core::vosi::{
    parse_availability, parse_capabilities, parse_tableset, Availability, Capability, TableSet,
};
use vo_core::votable::parse_votable;

use crate::protocol::Protocol;
use crate::query::{DalQuery, HttpMethod};
use crate::results::DalResults;
use crate::uws::{parse_job, JobPhase, UwsJob};

/// A TAP service endpoint.
#[derive(Debug, Clone)]
pub struct TapService {
    base_url: String,
    session: Session,
}

impl TapService {
    /// Creates a service client for a TAP endpoint.
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

    fn endpoint(&self, suffix: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), suffix)
    }

    /// Builds a synchronous query for an ADQL string.
    pub fn create_query(&self, adql: &str) -> TapQuery {
        let mut query = DalQuery::new(self.endpoint("sync"), Protocol::Tap, self.session.clone())
            .with_method(HttpMethod::Post);
        query.set("REQUEST", "doQuery");
        query.set("LANG", "ADQL");
        query.set("QUERY", adql);
        query.set("FORMAT", "votable");
        TapQuery {
            query,
            uploads: Vec::new(),
        }
    }

    /// Runs an ADQL query synchronously.
    pub fn run_sync(&self, adql: &str) -> DalResult<DalResults> {
        self.create_query(adql).execute()
    }

    /// Creates an asynchronous job for an ADQL query without starting it.
    pub fn submit_job(&self, adql: &str) -> DalResult<AsyncTapJob> {
        let url = self.endpoint("async");
        let params = vec![
            ("REQUEST".to_string(), "doQuery".to_string()),
            ("LANG".to_string(), "ADQL".to_string()),
            ("QUERY".to_string(), adql.to_string()),
            ("FORMAT".to_string(), "votable".to_string()),
        ];
        // Job creation redirects to the job record; the final URL is the
        // job's own endpoint.
        let response = self.session.post_form(&url, &params)?;
        let job_url = response.url().as_str().to_string();
        Ok(AsyncTapJob {
            url: job_url,
            session: self.session.clone(),
        })
    }

    /// Reads the service's VOSI availability document.
    pub fn availability(&self) -> DalResult<Availability> {
        let url = self.endpoint("availability");
        let text = self.session.get_text(&url)?;
        Ok(parse_availability(&text).map_err(|err| vosi_format_error(&err, &url))?)
    }

    /// Reads the service's VOSI capabilities and indexes them for auth.
    pub fn capabilities(&self) -> DalResult<Vec<Capability>> {
        let url = self.endpoint("capabilities");
        let text = self.session.get_text(&url)?;
        let capabilities =
            parse_capabilities(&text).map_err(|err| vosi_format_error(&err, &url))?;
        self.session
            .auth()
            .update_from_capabilities(&self.base_url, capabilities.clone());
        Ok(capabilities)
    }

    /// Reads the service's VOSI table descriptions.
    pub fn tables(&self) -> DalResult<TableSet> {
        let url = self.endpoint("tables");
        let text = self.session.get_text(&url)?;
        Ok(parse_tableset(&text).map_err(|err| vosi_format_error(&err, &url))?)
    }
}

fn vosi_format_error<E: std::error::Error>(err: &E, url: &str) -> FormatError {
    FormatError::new(err.to_string())
        .with_url(url)
        .with_protocol(Protocol::Tap.as_str(), Protocol::Tap.default_version())
}

/// A synchronous TAP query, optionally carrying inline table uploads.
#[derive(Debug, Clone)]
pub struct TapQuery {
    query: DalQuery,
    uploads: Vec<(String, Vec<u8>)>,
}

impl TapQuery {
    /// Caps the number of returned rows.
    #[must_use]
    pub fn with_maxrec(mut self, maxrec: usize) -> Self {
        self.query.set("MAXREC", maxrec.to_string());
        self
    }

    /// Overrides the query language reported to the service.
    #[must_use]
    pub fn with_lang(mut self, lang: &str) -> Self {
        self.query.set("LANG", lang);
        self
    }

    /// Attaches an inline table upload, referenced as `TAP_UPLOAD.<name>`.
    #[must_use]
    pub fn with_upload(mut self, name: &str, votable: Vec<u8>) -> Self {
        let reference = format!("{name},param:{name}");
        match self.query.get("UPLOAD") {
            Some(existing) => {
                let joined = format!("{existing};{reference}");
                self.query.set("UPLOAD", joined);
            }
            None => self.query.set("UPLOAD", reference),
        }
        self.uploads.push((name.to_string(), votable));
        self
    }

    /// The ADQL text of this query.
    pub fn adql(&self) -> Option<&str> {
        self.query.get("QUERY")
    }

    /// The underlying generic query.
    pub fn query(&self) -> &DalQuery {
        &self.query
    }

    /// Submits the query and wraps the response.
    pub fn execute(&self) -> DalResult<DalResults> {
        if self.uploads.is_empty() {
            return self.query.execute();
        }
        let url = self.query.base_url().to_string();
        let response = self.query.session().post_multipart(
            &url,
            self.query.params(),
            self.uploads.clone(),
        )?;
        let bytes = response
            .bytes()
            .map_err(|err| ServiceError::from_reqwest(&err, Some(&url)))?;
        let votable = parse_votable(&bytes).map_err(|err| {
            FormatError::from(err)
                .with_url(url.clone())
                .with_protocol(Protocol::Tap.as_str(), self.query.version())
        })?;
        DalResults::new(
            votable,
            Protocol::Tap,
            self.query.version(),
            Some(url),
            self.query.session().clone(),
        )
    }
}

/// An asynchronous TAP job, addressed by its UWS job URL.
#[derive(Debug, Clone)]
pub struct AsyncTapJob {
    url: String,
    session: Session,
}

impl AsyncTapJob {
    /// Re-attaches to an existing job by its URL.
    pub fn from_url(url: impl Into<String>, session: Session) -> Self {
        Self {
            url: url.into(),
            session,
        }
    }

    /// The job's UWS endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), suffix)
    }

    /// Reads the job's current phase.
    pub fn phase(&self) -> DalResult<JobPhase> {
        let text = self.session.get_text(&self.endpoint("phase"))?;
        Ok(JobPhase::from_identifier(&text))
    }

    /// Reads the full UWS job description.
    pub fn job(&self) -> DalResult<UwsJob> {
        let text = self.session.get_text(&self.url)?;
        parse_job(&text).map_err(|err| {
            FormatError::new(err.to_string())
                .with_url(self.url.clone())
                .with_protocol(Protocol::Tap.as_str(), Protocol::Tap.default_version())
                .into()
        })
    }

    /// Asks the service to start executing the job.
    pub fn run(&self) -> DalResult<()> {
        self.post_phase("RUN")
    }

    /// Asks the service to abort the job.
    pub fn abort(&self) -> DalResult<()> {
        self.post_phase("ABORT")
    }

    fn post_phase(&self, phase: &str) -> DalResult<()> {
        let params = vec![("PHASE".to_string(), phase.to_string())];
        self.session.post_form(&self.endpoint("phase"), &params)?;
        Ok(())
    }

    /// Deletes the job record on the service.
    pub fn delete(&self) -> DalResult<()> {
        self.session.delete(&self.url)?;
        Ok(())
    }

    /// Fetches the job's primary result as navigable results.
    pub fn fetch_result(&self) -> DalResult<DalResults> {
        let url = self.endpoint("results/result");
        let response = self.session.get(&url)?;
        let bytes = response
            .bytes()
            .map_err(|err| ServiceError::from_reqwest(&err, Some(&url)))?;
        let votable = parse_votable(&bytes).map_err(|err| {
            FormatError::from(err)
                .with_url(url.clone())
                .with_protocol(Protocol::Tap.as_str(), Protocol::Tap.default_version())
        })?;
        DalResults::new(
            votable,
            Protocol::Tap,
            Protocol::Tap.default_version(),
            Some(url),
            self.session.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_queries_carry_the_standard_parameters() {
        let service = TapService::new("http://example.org/tap/");
        let query = service.create_query("SELECT TOP 5 * FROM ivoa.obscore");
        assert_eq!(query.query().base_url(), "http://example.org/tap/sync");
        assert_eq!(query.query().get("REQUEST"), Some("doQuery"));
        assert_eq!(query.query().get("LANG"), Some("ADQL"));
        assert_eq!(query.adql(), Some("SELECT TOP 5 * FROM ivoa.obscore"));
        assert_eq!(query.query().get("FORMAT"), Some("votable"));
    }

    #[test]
    fn maxrec_and_uploads_extend_the_parameter_set() {
        let service = TapService::new("http://example.org/tap");
        let query = service
            .create_query("SELECT * FROM TAP_UPLOAD.mine")
            .with_maxrec(100)
            .with_upload("mine", b"<VOTABLE/>".to_vec());
        assert_eq!(query.query().get("MAXREC"), Some("100"));
        assert_eq!(query.query().get("UPLOAD"), Some("mine,param:mine"));
    }

    #[test]
    fn job_endpoints_derive_from_the_job_url() {
        let job = AsyncTapJob::from_url("http://example.org/tap/async/42/", Session::new());
        assert_eq!(job.endpoint("phase"), "http://example.org/tap/async/42/phase");
    }
}
