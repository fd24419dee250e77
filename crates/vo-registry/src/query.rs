//! Keyword and predicate search against the registry's RESTful endpoint.

use itertools::Itertools;

use vo_core::errors::{DalResult, ParamError};
use vo_core::session::Session;
use vo_core::votable::Value;

use vo_dal::protocol::Protocol;
use vo_dal::query::DalQuery;
use vo_dal::results::DalResults;

use crate::resource::ResourceRecord;

/// Default RESTful registry search endpoint.
pub const DEFAULT_REGISTRY_URL: &str = "http://nvo.stsci.edu/vor10/ribs/VOTCapBandPredOpt.aspx";

/// Text columns keyword predicates match against.
const KEYWORD_COLUMNS: &[&str] = &[
    "title",
    "shortName",
    "identifier",
    "[content/subject]",
    "[curation/publisher]",
    "[content/description]",
];

/// Maps a service type synonym to the registry's capability class name.
pub fn capability_class_for(servicetype: &str) -> Result<&'static str, ParamError> {
    match servicetype.to_lowercase().as_str() {
        "sia" | "image" | "images" => Ok("SimpleImageAccess"),
        "ssa" | "spectrum" | "spectra" => Ok("SimpleSpectralAccess"),
        "scs" | "cone" | "conesearch" | "catalog" => Ok("ConeSearch"),
        "sla" | "slap" | "line" => Ok("SimpleLineAccess"),
        "tap" | "table" | "tables" => Ok("TableAccess"),
        _ => Err(ParamError::UnknownValue {
            name: "servicetype",
            value: servicetype.to_string(),
        }),
    }
}

const WAVEBANDS: &[&str] = &[
    "Radio",
    "Millimeter",
    "Infrared",
    "Optical",
    "UV",
    "EUV",
    "X-ray",
    "Gamma-ray",
];

/// Normalizes a waveband name, accepting common synonyms case-insensitively.
pub fn normalize_waveband(waveband: &str) -> Result<String, ParamError> {
    let canonical = match waveband.to_lowercase().as_str() {
        "radio" => Some("Radio"),
        "mm" | "millimeter" => Some("Millimeter"),
        "ir" | "infrared" => Some("Infrared"),
        "optical" | "visible" => Some("Optical"),
        "uv" | "ultraviolet" => Some("UV"),
        "euv" | "extreme-uv" => Some("EUV"),
        "xray" | "x-ray" => Some("X-ray"),
        "gammaray" | "gamma-ray" => Some("Gamma-ray"),
        _ => None,
    };
    if let Some(canonical) = canonical {
        return Ok(canonical.to_string());
    }
    // Last chance: capitalize and check against the enumerated list.
    let mut chars = waveband.chars();
    let capitalized = chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().collect::<String>() + chars.as_str()
    });
    if WAVEBANDS.contains(&capitalized.as_str()) {
        Ok(capitalized)
    } else {
        Err(ParamError::UnknownValue {
            name: "waveband",
            value: waveband.to_string(),
        })
    }
}

/// Builds the SQL-ish predicate the registry endpoint expects from a
/// keyword list.
///
/// Each keyword expands to an OR over the standard text columns; keywords
/// combine with `OR` or `AND` per `or_keywords`.
pub fn keywords_to_predicate(keywords: &[String], or_keywords: bool) -> String {
    let joiner = if or_keywords { " OR " } else { " AND " };
    keywords
        .iter()
        .map(|keyword| {
            let clause = KEYWORD_COLUMNS
                .iter()
                .map(|column| format!("{column} LIKE '%{keyword}%'"))
                .join(" OR ");
            format!("({clause})")
        })
        .join(joiner)
}

/// A registry search service endpoint.
#[derive(Debug, Clone)]
pub struct RegistryService {
    base_url: String,
    session: Session,
}

impl Default for RegistryService {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_URL)
    }
}

impl RegistryService {
    /// Creates a client for a registry search endpoint.
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

    /// Starts an empty registry query.
    pub fn create_query(&self) -> RegistryQuery {
        let mut query = DalQuery::new(&self.base_url, Protocol::Registry, self.session.clone());
        query.set("VOTStyleOption", "2");
        RegistryQuery {
            query,
            keywords: Vec::new(),
            or_keywords: true,
            capability_class: None,
        }
    }

    /// Searches for resources matching keywords, optionally restricted to a
    /// service type and waveband.
    pub fn search(
        &self,
        keywords: &[&str],
        servicetype: Option<&str>,
        waveband: Option<&str>,
        or_keywords: bool,
    ) -> DalResult<RegistryResults> {
        let mut query = self
            .create_query()
            .with_keywords(keywords)
            .with_or_keywords(or_keywords);
        if let Some(servicetype) = servicetype {
            query = query.with_servicetype(servicetype)?;
        }
        if let Some(waveband) = waveband {
            query = query.with_waveband(waveband)?;
        }
        query.execute()
    }
}

/// A registry search under construction.
#[derive(Debug, Clone)]
pub struct RegistryQuery {
    query: DalQuery,
    keywords: Vec<String>,
    or_keywords: bool,
    capability_class: Option<&'static str>,
}

impl RegistryQuery {
    /// Sets the keywords matched against the registry's text columns.
    #[must_use]
    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|k| (*k).to_string()).collect();
        self
    }

    /// Chooses whether keywords combine with `OR` (default) or `AND`.
    #[must_use]
    pub fn with_or_keywords(mut self, or_keywords: bool) -> Self {
        self.or_keywords = or_keywords;
        self
    }

    /// Restricts results to services of the given type.
    pub fn with_servicetype(mut self, servicetype: &str) -> Result<Self, ParamError> {
        let class = capability_class_for(servicetype)?;
        self.capability_class = Some(class);
        self.query.set("capability", class);
        Ok(self)
    }

    /// Restricts results to resources covering the given waveband.
    pub fn with_waveband(mut self, waveband: &str) -> Result<Self, ParamError> {
        self.query.set("waveband", normalize_waveband(waveband)?);
        Ok(self)
    }

    /// Adds a raw predicate clause, passed through to the endpoint.
    #[must_use]
    pub fn with_predicate(mut self, predicate: &str) -> Self {
        self.query.set("predicate", predicate);
        self
    }

    /// The keywords currently set.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// The capability class the results will be filtered to, when any.
    pub fn capability_class(&self) -> Option<&'static str> {
        self.capability_class
    }

    /// The underlying generic query.
    pub fn query(&self) -> &DalQuery {
        &self.query
    }

    /// The predicate that will be sent, combining any raw clause with the
    /// keyword expansion.
    ///
    /// The endpoint takes a single predicate parameter, so a clause set via
    /// [`RegistryQuery::with_predicate`] is AND-ed with the keywords.
    pub fn predicate(&self) -> Option<String> {
        let raw = self.query.get("predicate");
        if self.keywords.is_empty() {
            return raw.map(str::to_string);
        }
        let keyword_predicate = keywords_to_predicate(&self.keywords, self.or_keywords);
        Some(match raw {
            Some(existing) => format!("({existing}) AND ({keyword_predicate})"),
            None => keyword_predicate,
        })
    }

    /// Submits the search and filters the response to matching capability
    /// rows.
    ///
    /// The endpoint returns every capability row of any matching resource
    /// regardless of the requested service type, so the requested class is
    /// re-applied client-side.
    pub fn execute(&self) -> DalResult<RegistryResults> {
        let mut query = self.query.clone();
        if let Some(predicate) = self.predicate() {
            query.set("predicate", predicate);
        }
        let results = query.execute()?;
        Ok(RegistryResults::filtered(results, self.capability_class))
    }
}

/// Registry search results: a row-filtered view over the response table.
#[derive(Debug, Clone)]
pub struct RegistryResults {
    results: DalResults,
    rows: Vec<usize>,
}

impl RegistryResults {
    /// Wraps parsed results, keeping only rows of the wanted capability
    /// class (all rows when `None`).
    pub fn filtered(results: DalResults, capability_class: Option<&str>) -> Self {
        let rows = match capability_class {
            None => (0..results.rowcount()).collect(),
            Some(wanted) => {
                let column = results
                    .fieldnames()
                    .iter()
                    .position(|name| name == "capabilityClass");
                (0..results.rowcount())
                    .filter(|&row| {
                        column.is_some_and(|column| {
                            matches!(
                                results.table().get(row, column),
                                Some(Value::Text(cell)) if cell == wanted
                            )
                        })
                    })
                    .collect()
            }
        };
        Self { results, rows }
    }

    /// The unfiltered response underneath.
    pub fn results(&self) -> &DalResults {
        &self.results
    }

    /// Number of matching resource capability rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the search matched nothing.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The matching resource record at `index`.
    pub fn getrecord(&self, index: usize) -> Option<ResourceRecord<'_>> {
        let row = *self.rows.get(index)?;
        self.results.getrecord(row).map(ResourceRecord::new)
    }

    /// Iterates the matching resource records.
    pub fn iter(&self) -> impl Iterator<Item = ResourceRecord<'_>> {
        self.rows
            .iter()
            .filter_map(|&row| self.results.getrecord(row).map(ResourceRecord::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vo_dal::protocol::Protocol;

    #[test]
    fn keyword_predicates_expand_per_column() {
        let predicate = keywords_to_predicate(&["quasar".to_string()], true);
        assert!(predicate.starts_with("(title LIKE '%quasar%' OR shortName LIKE '%quasar%'"));
        assert!(predicate.contains("[content/description] LIKE '%quasar%'"));
        assert!(predicate.ends_with(")"));
    }

    #[test]
    fn keyword_joiner_follows_the_flag() {
        let keywords = vec!["a".to_string(), "b".to_string()];
        let ored = keywords_to_predicate(&keywords, true);
        let anded = keywords_to_predicate(&keywords, false);
        assert!(ored.contains(") OR ("));
        assert!(!ored.contains(") AND ("));
        assert!(anded.contains(") AND ("));
    }

    #[test]
    fn raw_predicates_combine_with_keywords() {
        let service = RegistryService::new("http://example.org/registry");
        let query = service
            .create_query()
            .with_keywords(&["quasar"])
            .with_predicate("waveband LIKE '%Radio%'");
        let predicate = query.predicate().unwrap();
        assert!(predicate.starts_with("(waveband LIKE '%Radio%') AND ("));
        assert!(predicate.contains("title LIKE '%quasar%'"));
        let bare = service.create_query().with_predicate("title LIKE '%x%'");
        assert_eq!(bare.predicate().as_deref(), Some("title LIKE '%x%'"));
        assert_eq!(service.create_query().predicate(), None);
    }

    #[test]
    fn servicetype_synonyms_map_to_capability_classes() {
        assert_eq!(capability_class_for("sia").unwrap(), "SimpleImageAccess");
        assert_eq!(capability_class_for("Cone").unwrap(), "ConeSearch");
        assert_eq!(capability_class_for("TAP").unwrap(), "TableAccess");
        assert!(capability_class_for("telescope").is_err());
    }

    #[test]
    fn waveband_synonyms_normalize() {
        assert_eq!(normalize_waveband("ir").unwrap(), "Infrared");
        assert_eq!(normalize_waveband("xray").unwrap(), "X-ray");
        assert_eq!(normalize_waveband("optical").unwrap(), "Optical");
        assert_eq!(normalize_waveband("radio").unwrap(), "Radio");
        assert!(normalize_waveband("sound").is_err());
    }

    const REGISTRY_RESPONSE: &str = r#"<VOTABLE>
      <RESOURCE type="results">
        <INFO name="QUERY_STATUS" value="OK"/>
        <TABLE>
          <FIELD name="title" datatype="char" arraysize="*"/>
          <FIELD name="identifier" datatype="char" arraysize="*"/>
          <FIELD name="capabilityClass" datatype="char" arraysize="*"/>
          <FIELD name="accessURL" datatype="char" arraysize="*"/>
          <DATA><TABLEDATA>
            <TR><TD>A survey</TD><TD>ivo://a</TD><TD>SimpleImageAccess</TD><TD>http://a/sia</TD></TR>
            <TR><TD>A survey</TD><TD>ivo://a</TD><TD>ConeSearch</TD><TD>http://a/scs</TD></TR>
            <TR><TD>B catalog</TD><TD>ivo://b</TD><TD>ConeSearch</TD><TD>http://b/scs</TD></TR>
          </TABLEDATA></DATA>
        </TABLE>
      </RESOURCE>
    </VOTABLE>"#;

    #[test]
    fn capability_rows_are_filtered_client_side() {
        let results =
            DalResults::from_bytes(REGISTRY_RESPONSE.as_bytes(), Protocol::Registry).unwrap();
        let filtered = RegistryResults::filtered(results, Some("ConeSearch"));
        assert_eq!(filtered.len(), 2);
        let record = filtered.getrecord(0).unwrap();
        assert_eq!(record.capability_class(), Some("ConeSearch"));
        assert_eq!(record.accessurl(), Some("http://a/scs"));
    }

    #[test]
    fn unfiltered_results_keep_every_row() {
        let results =
            DalResults::from_bytes(REGISTRY_RESPONSE.as_bytes(), Protocol::Registry).unwrap();
        let all = RegistryResults::filtered(results, None);
        assert_eq!(all.len(), 3);
        assert_eq!(all.iter().count(), 3);
    }
}
