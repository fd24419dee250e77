//! Datalink: follow-on access links attached to query results.

use vo_core::errors::DalResult;
use vo_core::session::Session;
use vo_core::votable::{Param, Resource, Value};

use crate::protocol::Protocol;
use crate::record::Record;
use crate::results::DalResults;

/// Results of a datalink query: one row per access link.
#[derive(Debug, Clone)]
pub struct DatalinkResults {
    results: DalResults,
}

impl DatalinkResults {
    /// Wraps an already-parsed datalink response.
    pub fn new(results: DalResults) -> Self {
        Self { results }
    }

    /// Parses raw datalink response bytes.
    pub fn from_bytes(bytes: &[u8]) -> DalResult<Self> {
        Ok(Self::new(DalResults::from_bytes(bytes, Protocol::Datalink)?))
    }

    /// Fetches and parses a datalink document from a URL.
    pub fn from_url(url: &str, session: &Session) -> DalResult<Self> {
        let bytes = session.get(url)?.bytes().map_err(|err| {
            vo_core::errors::ServiceError::from_reqwest(&err, Some(url))
        })?;
        Self::from_bytes(&bytes)
    }

    /// The underlying generic results.
    pub fn results(&self) -> &DalResults {
        &self.results
    }

    /// Number of link rows.
    pub fn len(&self) -> usize {
        self.results.rowcount()
    }

    /// Whether the document advertises no links.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// The link row at `index`.
    pub fn get(&self, index: usize) -> Option<DatalinkRecord<'_>> {
        self.results.getrecord(index).map(DatalinkRecord::new)
    }

    /// Iterates all link rows.
    pub fn iter(&self) -> impl Iterator<Item = DatalinkRecord<'_>> {
        self.results.iter().map(DatalinkRecord::new)
    }

    /// Iterates link rows whose semantics tag matches `term`.
    ///
    /// A bare term such as `#this` also matches namespaced variants ending
    /// in the same fragment.
    pub fn bysemantics<'a>(
        &'a self,
        term: &'a str,
    ) -> impl Iterator<Item = DatalinkRecord<'a>> + 'a {
        self.iter().filter(move |record| {
            record
                .semantics()
                .is_some_and(|s| s == term || s.ends_with(term))
        })
    }

    /// Service descriptors advertised alongside the links.
    ///
    /// These come from `RESOURCE type="meta"` blocks declaring an invocable
    /// service (SODA and friends), read in a post-processing pass over the
    /// parsed document.
    pub fn services(&self) -> Vec<ServiceDescriptor> {
        fn walk(resources: &[Resource], found: &mut Vec<ServiceDescriptor>) {
            for resource in resources {
                let is_service = resource.type_attr() == Some("meta")
                    && resource
                        .utype()
                        .is_some_and(|u| u.eq_ignore_ascii_case("adhoc:service"));
                if is_service {
                    found.push(ServiceDescriptor {
                        access_url: resource.param("accessURL").map(|p| p.value().to_string()),
                        standard_id: resource.param("standardID").map(|p| p.value().to_string()),
                        input_params: resource
                            .group("inputParams")
                            .map(|group| group.params().to_vec())
                            .unwrap_or_default(),
                    });
                }
                walk(resource.resources(), found);
            }
        }
        let mut found = Vec::new();
        walk(self.results.votable().resources(), &mut found);
        found
    }
}

/// One datalink row, exposing the standard datalink columns by name.
#[derive(Debug, Copy, Clone)]
pub struct DatalinkRecord<'a> {
    record: Record<'a>,
}

impl<'a> DatalinkRecord<'a> {
    fn new(record: Record<'a>) -> Self {
        Self { record }
    }

    /// The generic record underneath.
    pub fn record(&self) -> &Record<'a> {
        &self.record
    }

    fn text(&self, name: &str) -> Option<&'a str> {
        self.record.get(name)?.as_str().filter(|s| !s.is_empty())
    }

    /// Identifier of the dataset the link belongs to.
    pub fn id(&self) -> Option<&'a str> {
        self.text("ID")
    }

    /// Direct access URL, when the link is immediately retrievable.
    pub fn access_url(&self) -> Option<&'a str> {
        self.text("access_url")
    }

    /// Name of the service descriptor to invoke, for parameterized links.
    pub fn service_def(&self) -> Option<&'a str> {
        self.text("service_def")
    }

    /// Error message, when the service could not produce this link.
    pub fn error_message(&self) -> Option<&'a str> {
        self.text("error_message")
    }

    /// Human-readable link description.
    pub fn description(&self) -> Option<&'a str> {
        self.text("description")
    }

    /// Semantics tag describing the link's relation to the dataset.
    pub fn semantics(&self) -> Option<&'a str> {
        self.text("semantics")
    }

    /// Media type of the linked content.
    pub fn content_type(&self) -> Option<&'a str> {
        self.text("content_type")
    }

    /// Size of the linked content in bytes, when reported.
    pub fn content_length(&self) -> Option<i64> {
        match self.record.get("content_length")? {
            Value::Long(v) => Some(v),
            Value::Double(v) => Some(v as i64),
            Value::Text(v) => v.parse().ok(),
            _ => None,
        }
    }
}

/// An invocable service advertised in a datalink document.
#[derive(Debug, Clone, Default)]
pub struct ServiceDescriptor {
    pub(crate) access_url: Option<String>,
    pub(crate) standard_id: Option<String>,
    pub(crate) input_params: Vec<Param>,
}

impl ServiceDescriptor {
    /// Base URL the service is invoked at.
    pub fn access_url(&self) -> Option<&str> {
        self.access_url.as_deref()
    }

    /// Standard identifier of the service protocol, when declared.
    pub fn standard_id(&self) -> Option<&str> {
        self.standard_id.as_deref()
    }

    /// Declared input parameters.
    pub fn input_params(&self) -> &[Param] {
        &self.input_params
    }

    /// The declared input parameter with the given name.
    pub fn input_param(&self, name: &str) -> Option<&Param> {
        self.input_params.iter().find(|param| param.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATALINK: &str = r#"<VOTABLE>
      <RESOURCE type="results">
        <INFO name="QUERY_STATUS" value="OK"/>
        <TABLE>
          <FIELD name="ID" datatype="char" arraysize="*"/>
          <FIELD name="access_url" datatype="char" arraysize="*"/>
          <FIELD name="service_def" datatype="char" arraysize="*"/>
          <FIELD name="error_message" datatype="char" arraysize="*"/>
          <FIELD name="description" datatype="char" arraysize="*"/>
          <FIELD name="semantics" datatype="char" arraysize="*"/>
          <FIELD name="content_type" datatype="char" arraysize="*"/>
          <FIELD name="content_length" datatype="long"/>
          <DATA><TABLEDATA>
            <TR><TD>ivo://obs/1</TD><TD>http://example.org/data.fits</TD><TD></TD><TD></TD>
                <TD>the dataset</TD><TD>#this</TD><TD>application/fits</TD><TD>1024</TD></TR>
            <TR><TD>ivo://obs/1</TD><TD></TD><TD>soda-sync</TD><TD></TD>
                <TD>cutout</TD><TD>#cutout</TD><TD></TD><TD></TD></TR>
          </TABLEDATA></DATA>
        </TABLE>
      </RESOURCE>
      <RESOURCE type="meta" utype="adhoc:service" name="soda-sync">
        <PARAM name="accessURL" datatype="char" arraysize="*" value="http://example.org/soda"/>
        <PARAM name="standardID" datatype="char" arraysize="*" value="ivo://ivoa.net/std/SODA#sync-1.0"/>
        <GROUP name="inputParams">
          <PARAM name="ID" datatype="char" arraysize="*" value="ivo://obs/1"/>
          <PARAM name="CIRCLE" datatype="double" arraysize="3" value=""/>
        </GROUP>
      </RESOURCE>
    </VOTABLE>"#;

    #[test]
    fn links_resolve_standard_columns() {
        let links = DatalinkResults::from_bytes(DATALINK.as_bytes()).unwrap();
        assert_eq!(links.len(), 2);
        let this = links.get(0).unwrap();
        assert_eq!(this.access_url(), Some("http://example.org/data.fits"));
        assert_eq!(this.semantics(), Some("#this"));
        assert_eq!(this.content_length(), Some(1024));
        let cutout = links.get(1).unwrap();
        assert_eq!(cutout.access_url(), None);
        assert_eq!(cutout.service_def(), Some("soda-sync"));
    }

    #[test]
    fn bysemantics_filters_rows() {
        let links = DatalinkResults::from_bytes(DATALINK.as_bytes()).unwrap();
        let this: Vec<_> = links.bysemantics("#this").collect();
        assert_eq!(this.len(), 1);
        assert_eq!(this[0].id(), Some("ivo://obs/1"));
    }

    #[test]
    fn service_descriptors_are_extracted() {
        let links = DatalinkResults::from_bytes(DATALINK.as_bytes()).unwrap();
        let services = links.services();
        assert_eq!(services.len(), 1);
        let soda = &services[0];
        assert_eq!(soda.access_url(), Some("http://example.org/soda"));
        assert_eq!(
            soda.standard_id(),
            Some("ivo://ivoa.net/std/SODA#sync-1.0")
        );
        assert!(soda.input_param("CIRCLE").is_some());
        assert!(soda.input_param("POLYGON").is_none());
    }
}
