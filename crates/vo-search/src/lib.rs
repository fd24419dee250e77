//! Library backing the `vo-search` command line tool.

use serde::Serialize;
use serde_json::{json, Map, Value as JsonValue};
use thiserror::Error;

use vo_core::errors::AccessError;
use vo_core::votable::Value;
use vo_dal::record::Record;
use vo_dal::scs::ScsService;
use vo_registry::query::RegistryService;

pub mod cli;

/// Errors surfaced by the search operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Any failure raised by the client layers.
    #[error("{0}")]
    AccessError(#[from] AccessError),
    /// Output serialization failure.
    #[error("{0}")]
    JsonError(#[from] serde_json::Error),
}

/// Summary of one search, serialized to stdout as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct SearchSummary {
    /// URL the query was sent to, when known.
    pub query_url: Option<String>,
    /// Number of records returned.
    pub record_count: usize,
    /// The records, flattened to JSON objects.
    pub records: Vec<JsonValue>,
}

fn cell_to_json(value: Value<'_>) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(v) => json!(v),
        Value::Long(v) => json!(v),
        Value::Double(v) => {
            if v.is_finite() {
                json!(v)
            } else {
                json!(v.to_string())
            }
        }
        Value::Text(v) => json!(v),
    }
}

/// Flattens a record into a JSON object keyed by canonical field name.
pub fn record_to_json(record: &Record<'_>) -> JsonValue {
    let mut object = Map::new();
    for key in record.keys() {
        let cell = record.get(key).map_or(JsonValue::Null, cell_to_json);
        object.insert(key.clone(), cell);
    }
    JsonValue::Object(object)
}

/// Runs a cone search against an explicit service URL.
pub fn cone_search(
    url: &str,
    ra: f64,
    dec: f64,
    radius: f64,
) -> Result<SearchSummary, SearchError> {
    let results = ScsService::new(url).search(ra, dec, radius)?;
    Ok(SearchSummary {
        query_url: results.queryurl().map(str::to_string),
        record_count: results.len(),
        records: results.iter().map(|r| record_to_json(&r)).collect(),
    })
}

/// Discovers services in the registry by keyword.
pub fn registry_search(
    registry_url: Option<&str>,
    keywords: &[&str],
    servicetype: Option<&str>,
    waveband: Option<&str>,
    and_keywords: bool,
) -> Result<SearchSummary, SearchError> {
    let service = registry_url.map_or_else(RegistryService::default, RegistryService::new);
    let results = service.search(keywords, servicetype, waveband, !and_keywords)?;
    let records = results
        .iter()
        .map(|resource| {
            json!({
                "title": resource.title(),
                "short_name": resource.shortname(),
                "ivoid": resource.ivoid(),
                "capability_class": resource.capability_class(),
                "standard_id": resource.standard_id(),
                "access_url": resource.accessurl(),
                "waveband": resource.waveband(),
            })
        })
        .collect::<Vec<_>>();
    Ok(SearchSummary {
        query_url: results.results().queryurl().map(str::to_string),
        record_count: records.len(),
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vo_dal::protocol::Protocol;
    use vo_dal::results::DalResults;

    #[test]
    fn records_flatten_to_json_objects() {
        let response = r#"<VOTABLE><RESOURCE type="results"><TABLE>
            <FIELD name="name" datatype="char" arraysize="*"/>
            <FIELD name="ra" datatype="double"/>
            <FIELD name="flags" datatype="int"/>
            <DATA><TABLEDATA>
              <TR><TD>m51</TD><TD>202.48</TD><TD></TD></TR>
            </TABLEDATA></DATA>
        </TABLE></RESOURCE></VOTABLE>"#;
        let results = DalResults::from_bytes(response.as_bytes(), Protocol::Cone).unwrap();
        let record = results.getrecord(0).unwrap();
        let object = record_to_json(&record);
        assert_eq!(object["name"], "m51");
        assert_eq!(object["ra"], 202.48);
        assert!(object["flags"].is_null());
    }
}
