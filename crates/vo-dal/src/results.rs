//! Navigable, validated wrappers around one parsed query response.

use std::collections::HashMap;

use vo_core::errors::{DalResult, FormatError, QueryError};
use vo_core::session::Session;
use vo_core::votable::{parse_votable, Field, Info, Table, VoTable};

use crate::cursor::Cursor;
use crate::protocol::{FieldRole, Protocol, ResultsLocation};
use crate::record::Record;

/// Path to the results table inside a response document.
#[derive(Debug, Clone, Default)]
struct TablePath {
    resource_path: Vec<usize>,
    table_index: usize,
}

fn find_table_path(votable: &VoTable, location: ResultsLocation) -> Option<TablePath> {
    fn dfs(
        resources: &[vo_core::votable::Resource],
        path: &mut Vec<usize>,
        accept: &dyn Fn(&vo_core::votable::Resource) -> bool,
    ) -> Option<TablePath> {
        for (index, resource) in resources.iter().enumerate() {
            path.push(index);
            if accept(resource) && !resource.tables().is_empty() {
                return Some(TablePath {
                    resource_path: path.clone(),
                    table_index: 0,
                });
            }
            if let Some(found) = dfs(resource.resources(), path, accept) {
                return Some(found);
            }
            path.pop();
        }
        None
    }

    let mut path = Vec::new();
    match location {
        ResultsLocation::Root => dfs(votable.resources(), &mut path, &|_| true),
        ResultsLocation::TypedResults => {
            dfs(votable.resources(), &mut path, &|resource| {
                resource.type_attr() == Some("results")
            })
            .or_else(|| {
                let mut path = Vec::new();
                dfs(votable.resources(), &mut path, &|_| true)
            })
        }
    }
}

fn resolve_resource<'a>(
    votable: &'a VoTable,
    path: &TablePath,
) -> &'a vo_core::votable::Resource {
    let mut resources = votable.resources();
    let mut resource = &resources[path.resource_path[0]];
    for &index in &path.resource_path[1..] {
        resources = resource.resources();
        resource = &resources[index];
    }
    resource
}

fn utype_matches(declared: &str, wanted: &str) -> bool {
    if declared.eq_ignore_ascii_case(wanted) {
        return true;
    }
    let stripped = declared.rsplit(':').next().unwrap_or(declared);
    stripped.eq_ignore_ascii_case(wanted)
}

/// One parsed response presented as a navigable, validated table.
///
/// Construction fails when the response carries an error status or lacks
/// the metadata needed to build records; a `DalResults` handed to the
/// caller is never in an error state.
#[derive(Debug, Clone)]
pub struct DalResults {
    votable: VoTable,
    table_path: TablePath,
    status: (String, String),
    fieldnames: Vec<String>,
    field_index: HashMap<String, usize>,
    role_columns: HashMap<FieldRole, usize>,
    protocol: Protocol,
    version: String,
    url: Option<String>,
    session: Session,
}

impl DalResults {
    /// Wraps a parsed VOTable response, validating status and metadata.
    pub fn new(
        votable: VoTable,
        protocol: Protocol,
        version: &str,
        url: Option<String>,
        session: Session,
    ) -> DalResult<Self> {
        let format_err = |reason: &str| {
            let mut err = FormatError::new(reason);
            if let Some(url) = &url {
                err = err.with_url(url.clone());
            }
            err.with_protocol(protocol.as_str(), version)
        };

        let descriptor = protocol.descriptor();
        let table_path = find_table_path(&votable, descriptor.results_location)
            .ok_or_else(|| format_err("no results table in response"))?;
        let resource = resolve_resource(&votable, &table_path);
        let table = &resource.tables()[table_path.table_index];

        // Status search order: the results resource, then its table, then
        // the document root.
        let status_info = resource
            .infos()
            .iter()
            .chain(table.infos().iter())
            .chain(votable.infos().iter())
            .find(|info| info.name() == "QUERY_STATUS");
        let status = status_info.map_or_else(
            || ("OK".to_string(), String::new()),
            |info| (info.value().to_string(), info.content().to_string()),
        );
        if status.0 != "OK" && status.0 != "OVERFLOW" {
            let reason = if status.1.is_empty() {
                status.0.clone()
            } else {
                status.1.clone()
            };
            let mut err = QueryError::new(status.0, reason)
                .with_protocol(protocol.as_str(), version);
            if let Some(url) = &url {
                err = err.with_url(url.clone());
            }
            return Err(err.into());
        }

        if table.fields().is_empty() {
            return Err(format_err("results table has no column metadata").into());
        }

        let fieldnames: Vec<String> = table
            .fields()
            .iter()
            .map(|field| field.key().to_string())
            .collect();
        let field_index: HashMap<String, usize> = fieldnames
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index))
            .collect();

        let mut role_columns = HashMap::new();
        for keys in descriptor.roles {
            let by_ucd = keys.ucds.iter().find_map(|ucd| {
                table
                    .fields()
                    .iter()
                    .position(|field| field.ucd().is_some_and(|u| u.eq_ignore_ascii_case(ucd)))
            });
            let column = by_ucd.or_else(|| {
                keys.utypes.iter().find_map(|utype| {
                    table
                        .fields()
                        .iter()
                        .position(|field| field.utype().is_some_and(|u| utype_matches(u, utype)))
                })
            });
            if let Some(column) = column {
                role_columns.insert(keys.role, column);
            }
        }

        Ok(Self {
            votable,
            table_path,
            status,
            fieldnames,
            field_index,
            role_columns,
            protocol,
            version: version.to_string(),
            url,
            session,
        })
    }

    /// Parses raw response bytes and wraps them, using protocol defaults.
    pub fn from_bytes(bytes: &[u8], protocol: Protocol) -> DalResult<Self> {
        let votable = parse_votable(bytes)
            .map_err(|err| FormatError::from(err).with_protocol(protocol.as_str(), protocol.default_version()))?;
        Self::new(
            votable,
            protocol,
            protocol.default_version(),
            None,
            Session::new(),
        )
    }

    /// The full parsed response document.
    pub fn votable(&self) -> &VoTable {
        &self.votable
    }

    /// The results table.
    pub fn table(&self) -> &Table {
        &resolve_resource(&self.votable, &self.table_path).tables()[self.table_path.table_index]
    }

    /// The `QUERY_STATUS` code and message (`OK` with an empty message when
    /// the response carried no status INFO).
    pub fn status(&self) -> (&str, &str) {
        (&self.status.0, &self.status.1)
    }

    /// The protocol this response belongs to.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// The protocol version recorded for this response.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The URL the response was retrieved from, when known.
    pub fn queryurl(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Number of records in the result set.
    pub fn rowcount(&self) -> usize {
        self.table().n_rows()
    }

    /// Number of records in the result set.
    pub fn len(&self) -> usize {
        self.rowcount()
    }

    /// Whether the result set holds no records.
    pub fn is_empty(&self) -> bool {
        self.rowcount() == 0
    }

    /// Canonical column keys: each column's `ID` if present, else its `name`.
    pub fn fieldnames(&self) -> &[String] {
        &self.fieldnames
    }

    /// Column metadata, in declaration order.
    pub fn fields(&self) -> &[Field] {
        self.table().fields()
    }

    /// Metadata for the named column.
    pub fn fielddesc(&self, name: &str) -> Option<&Field> {
        self.field_index
            .get(name)
            .map(|&index| &self.table().fields()[index])
    }

    /// INFO elements attached to the results resource.
    pub fn resource_infos(&self) -> &[Info] {
        resolve_resource(&self.votable, &self.table_path).infos()
    }

    /// Canonical name of the first column carrying the given UCD.
    pub fn fieldname_with_ucd(&self, ucd: &str) -> Option<&str> {
        self.table()
            .fields()
            .iter()
            .find(|field| field.ucd().is_some_and(|u| u.eq_ignore_ascii_case(ucd)))
            .map(Field::key)
    }

    /// Canonical name of the first column carrying the given UType.
    ///
    /// Namespace prefixes on the declared UType are ignored.
    pub fn fieldname_with_utype(&self, utype: &str) -> Option<&str> {
        self.table()
            .fields()
            .iter()
            .find(|field| field.utype().is_some_and(|u| utype_matches(u, utype)))
            .map(Field::key)
    }

    /// Canonical column name resolved for a semantic role, when present.
    pub fn role_fieldname(&self, role: FieldRole) -> Option<&str> {
        self.role_columns
            .get(&role)
            .map(|&index| self.fieldnames[index].as_str())
    }

    pub(crate) fn role_column(&self, role: FieldRole) -> Option<usize> {
        self.role_columns.get(&role).copied()
    }

    pub(crate) fn column_index(&self, name: &str) -> Option<usize> {
        self.field_index.get(name).copied()
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the record at `index`, or `None` outside `[0, rowcount)`.
    pub fn getrecord(&self, index: usize) -> Option<Record<'_>> {
        (index < self.rowcount()).then(|| Record::new(self, index))
    }

    /// Iterates the records of the result set.
    pub fn iter(&self) -> RecordIter<'_> {
        RecordIter {
            results: self,
            next: 0,
        }
    }

    /// Returns a DB-API style cursor over the result set.
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::new(self)
    }
}

impl<'a> IntoIterator for &'a DalResults {
    type Item = Record<'a>;
    type IntoIter = RecordIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the records of a result set.
#[derive(Debug)]
pub struct RecordIter<'a> {
    results: &'a DalResults,
    next: usize,
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.results.getrecord(self.next)?;
        self.next += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.results.rowcount().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vo_core::errors::AccessError;

    const OK_RESPONSE: &str = r#"<VOTABLE>
      <RESOURCE type="results">
        <INFO name="QUERY_STATUS" value="OK"/>
        <TABLE>
          <FIELD ID="target" name="name" datatype="char" arraysize="*"/>
          <FIELD name="ra" datatype="double" ucd="POS_EQ_RA_MAIN"/>
          <FIELD name="dec" datatype="double" ucd="POS_EQ_DEC_MAIN"/>
          <DATA><TABLEDATA>
            <TR><TD>m51</TD><TD>202.48</TD><TD>47.23</TD></TR>
          </TABLEDATA></DATA>
        </TABLE>
      </RESOURCE>
    </VOTABLE>"#;

    #[test]
    fn single_row_response_roundtrips() {
        let results = DalResults::from_bytes(OK_RESPONSE.as_bytes(), Protocol::Cone).unwrap();
        assert_eq!(results.rowcount(), 1);
        assert_eq!(results.fieldnames(), &["target", "ra", "dec"]);
        assert_eq!(results.status(), ("OK", ""));
        let record = results.getrecord(0).unwrap();
        assert_eq!(record.keys(), results.fieldnames());
        assert!(results.getrecord(1).is_none());
    }

    #[test]
    fn error_status_raises_query_error() {
        let response = r#"<VOTABLE>
          <RESOURCE>
            <INFO name="QUERY_STATUS" value="ERROR">Forced Fail</INFO>
            <TABLE><FIELD name="x" datatype="int"/></TABLE>
          </RESOURCE>
        </VOTABLE>"#;
        let err = DalResults::from_bytes(response.as_bytes(), Protocol::Cone).unwrap_err();
        match err {
            AccessError::Query(query_err) => {
                assert_eq!(query_err.label(), "ERROR");
                assert_eq!(query_err.to_string(), "Forced Fail");
            }
            other => panic!("expected QueryError, got {other:?}"),
        }
    }

    #[test]
    fn overflow_status_is_accepted() {
        let response = r#"<VOTABLE>
          <RESOURCE type="results">
            <INFO name="QUERY_STATUS" value="OVERFLOW"/>
            <TABLE>
              <FIELD name="x" datatype="int"/>
              <DATA><TABLEDATA><TR><TD>1</TD></TR></TABLEDATA></DATA>
            </TABLE>
          </RESOURCE>
        </VOTABLE>"#;
        let results = DalResults::from_bytes(response.as_bytes(), Protocol::Sia).unwrap();
        assert_eq!(results.status().0, "OVERFLOW");
    }

    #[test]
    fn missing_resources_raise_format_error() {
        let err = DalResults::from_bytes(b"<VOTABLE></VOTABLE>", Protocol::Cone).unwrap_err();
        assert!(matches!(err, AccessError::Format(_)));
    }

    #[test]
    fn fieldless_table_raises_format_error() {
        let response = r#"<VOTABLE><RESOURCE><TABLE></TABLE></RESOURCE></VOTABLE>"#;
        let err = DalResults::from_bytes(response.as_bytes(), Protocol::Cone).unwrap_err();
        assert!(matches!(err, AccessError::Format(_)));
    }

    #[test]
    fn status_in_table_infos_is_found() {
        let response = r#"<VOTABLE>
          <RESOURCE type="results">
            <TABLE>
              <INFO name="QUERY_STATUS" value="ERROR">broken</INFO>
              <FIELD name="x" datatype="int"/>
            </TABLE>
          </RESOURCE>
        </VOTABLE>"#;
        assert!(matches!(
            DalResults::from_bytes(response.as_bytes(), Protocol::Sia).unwrap_err(),
            AccessError::Query(_)
        ));
    }

    #[test]
    fn status_at_document_root_is_found() {
        let response = r#"<VOTABLE>
          <INFO name="QUERY_STATUS" value="ERROR">root-level failure</INFO>
          <RESOURCE><TABLE><FIELD name="x" datatype="int"/></TABLE></RESOURCE>
        </VOTABLE>"#;
        assert!(matches!(
            DalResults::from_bytes(response.as_bytes(), Protocol::Cone).unwrap_err(),
            AccessError::Query(_)
        ));
    }

    #[test]
    fn typed_results_resource_is_preferred() {
        let response = r#"<VOTABLE>
          <RESOURCE type="meta">
            <TABLE><FIELD name="ignored" datatype="int"/></TABLE>
          </RESOURCE>
          <RESOURCE type="results">
            <TABLE>
              <FIELD name="wanted" datatype="int"/>
              <DATA><TABLEDATA><TR><TD>7</TD></TR></TABLEDATA></DATA>
            </TABLE>
          </RESOURCE>
        </VOTABLE>"#;
        let results = DalResults::from_bytes(response.as_bytes(), Protocol::Sia).unwrap();
        assert_eq!(results.fieldnames(), &["wanted"]);
    }

    #[test]
    fn ucd_and_utype_lookup() {
        let results = DalResults::from_bytes(OK_RESPONSE.as_bytes(), Protocol::Cone).unwrap();
        assert_eq!(results.fieldname_with_ucd("POS_EQ_RA_MAIN"), Some("ra"));
        assert_eq!(results.fieldname_with_ucd("pos_eq_ra_main"), Some("ra"));
        assert_eq!(results.fieldname_with_ucd("VOX:Image_Title"), None);
        assert_eq!(results.fieldname_with_utype("anything"), None);
        assert_eq!(results.role_fieldname(FieldRole::Ra), Some("ra"));
        assert_eq!(results.role_fieldname(FieldRole::AccessUrl), None);
    }

    #[test]
    fn iteration_visits_every_record() {
        let results = DalResults::from_bytes(OK_RESPONSE.as_bytes(), Protocol::Cone).unwrap();
        assert_eq!(results.iter().count(), 1);
        let record = results.iter().next().unwrap();
        assert_eq!(record.get("target").and_then(|v| v.as_str()), Some("m51"));
    }
}
