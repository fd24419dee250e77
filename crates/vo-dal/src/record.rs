//! A single result row viewed as a name→value mapping.

use std::fs;
use std::path::{Path, PathBuf};

use vo_core::errors::{DalResult, FormatError, ServiceError};
use vo_core::votable::Value;

use crate::protocol::FieldRole;
use crate::results::DalResults;

/// One row of a result set.
///
/// Domain accessors for standardized columns return `None` when the column
/// is absent; only [`Record::getdataurl`] treats absence as an error.
#[derive(Debug, Copy, Clone)]
pub struct Record<'a> {
    results: &'a DalResults,
    row: usize,
}

impl<'a> Record<'a> {
    pub(crate) fn new(results: &'a DalResults, row: usize) -> Self {
        Self { results, row }
    }

    /// The result set this record belongs to.
    pub fn results(&self) -> &'a DalResults {
        self.results
    }

    /// Zero-based row index of this record.
    pub fn index(&self) -> usize {
        self.row
    }

    /// The canonical column keys of this record.
    pub fn keys(&self) -> &'a [String] {
        self.results.fieldnames()
    }

    /// The value in the named column.
    pub fn get(&self, name: &str) -> Option<Value<'a>> {
        let column = self.results.column_index(name)?;
        self.results.table().get(self.row, column)
    }

    /// The value of the column resolved for a semantic role.
    pub fn by_role(&self, role: FieldRole) -> Option<Value<'a>> {
        let column = self.results.role_column(role)?;
        self.results.table().get(self.row, column)
    }

    /// Right ascension in degrees, when the response declares one.
    pub fn ra(&self) -> Option<f64> {
        self.by_role(FieldRole::Ra)?.to_f64()
    }

    /// Declination in degrees, when the response declares one.
    pub fn dec(&self) -> Option<f64> {
        self.by_role(FieldRole::Dec)?.to_f64()
    }

    /// Dataset title, when the response declares one.
    pub fn title(&self) -> Option<&'a str> {
        self.by_role(FieldRole::Title)?.as_str()
    }

    /// Record identifier, when the response declares one.
    pub fn id(&self) -> Option<&'a str> {
        self.by_role(FieldRole::Id)?.as_str()
    }

    /// Instrument identifier, when the response declares one.
    pub fn instrument(&self) -> Option<&'a str> {
        self.by_role(FieldRole::Instrument)?.as_str()
    }

    /// Observation date cell, when the response declares one.
    ///
    /// Depending on the service this is either an MJD number or an ISO
    /// string, so the raw cell is returned.
    pub fn dateobs(&self) -> Option<Value<'a>> {
        self.by_role(FieldRole::DateObs)
    }

    /// Dataset media type, when the response declares one.
    pub fn format(&self) -> Option<&'a str> {
        self.by_role(FieldRole::Format)?.as_str()
    }

    /// Spectral line wavelength, when the response declares one.
    pub fn wavelength(&self) -> Option<f64> {
        self.by_role(FieldRole::Wavelength)?.to_f64()
    }

    /// The dataset access URL carried by this record.
    ///
    /// Unlike the other accessors this raises when the response has no
    /// access-reference column, since follow-on retrieval is impossible.
    pub fn getdataurl(&self) -> Result<&'a str, FormatError> {
        let column = self
            .results
            .role_column(FieldRole::AccessUrl)
            .ok_or_else(|| FormatError::new("no access reference column in results"))?;
        self.results
            .table()
            .get(self.row, column)
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| FormatError::new("access reference cell is empty"))
    }

    /// Derives a collision-free filename for the record's dataset.
    ///
    /// The stem comes from `base`, else from the record title, else
    /// `"dataset"`; the extension from the record's media type. A `-N`
    /// suffix is appended while the name is already taken.
    pub fn make_dataset_filename(&self, dir: &Path, base: Option<&str>) -> PathBuf {
        let stem = base.map_or_else(
            || {
                let title = self.title().unwrap_or("dataset");
                let cleaned: String = title
                    .chars()
                    .map(|c| {
                        if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                            c
                        } else {
                            '_'
                        }
                    })
                    .collect();
                if cleaned.is_empty() {
                    "dataset".to_string()
                } else {
                    cleaned
                }
            },
            str::to_string,
        );
        let extension = extension_for(self.format());
        let mut candidate = dir.join(format!("{stem}.{extension}"));
        let mut suffix = 0;
        while candidate.exists() {
            suffix += 1;
            candidate = dir.join(format!("{stem}-{suffix}.{extension}"));
        }
        candidate
    }

    /// Downloads the record's dataset and writes it to disk.
    ///
    /// When `path` names a directory (or is omitted) the filename is derived
    /// with [`Record::make_dataset_filename`]. Returns the written path.
    pub fn cachedataset(&self, path: Option<&Path>) -> DalResult<PathBuf> {
        let url = self.getdataurl()?;
        let target = match path {
            Some(p) if !p.is_dir() => p.to_path_buf(),
            Some(dir) => self.make_dataset_filename(dir, None),
            None => self.make_dataset_filename(Path::new("."), None),
        };
        let response = self.results.session().get(url)?;
        let bytes = response
            .bytes()
            .map_err(|err| ServiceError::from_reqwest(&err, Some(url)))?;
        fs::write(&target, &bytes).map_err(|err| ServiceError::from_cause(&err).with_url(url))?;
        Ok(target)
    }
}

fn extension_for(format: Option<&str>) -> &'static str {
    let Some(format) = format else { return "dat" };
    let format = format.to_lowercase();
    if format.contains("fits") {
        "fits"
    } else if format.contains("jpeg") || format.contains("jpg") {
        "jpg"
    } else if format.contains("png") {
        "png"
    } else if format.contains("gif") {
        "gif"
    } else if format.contains("votable") || format.contains("xml") {
        "xml"
    } else if format.contains("text") || format.contains("ascii") {
        "txt"
    } else {
        "dat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;

    const SIA_RESPONSE: &str = r#"<VOTABLE>
      <RESOURCE type="results">
        <INFO name="QUERY_STATUS" value="OK"/>
        <TABLE>
          <FIELD name="title" datatype="char" arraysize="*" ucd="VOX:Image_Title"/>
          <FIELD name="ra" datatype="double" ucd="POS_EQ_RA_MAIN"/>
          <FIELD name="dec" datatype="double" ucd="POS_EQ_DEC_MAIN"/>
          <FIELD name="mime" datatype="char" arraysize="*" ucd="VOX:Image_Format"/>
          <FIELD name="url" datatype="char" arraysize="*" ucd="VOX:Image_AccessReference"/>
          <DATA><TABLEDATA>
            <TR><TD>neat m51</TD><TD>202.48</TD><TD>47.23</TD><TD>image/fits</TD><TD>http://example.org/img.fits</TD></TR>
          </TABLEDATA></DATA>
        </TABLE>
      </RESOURCE>
    </VOTABLE>"#;

    fn sia_results() -> DalResults {
        DalResults::from_bytes(SIA_RESPONSE.as_bytes(), Protocol::Sia).unwrap()
    }

    #[test]
    fn role_accessors_resolve_standard_columns() {
        let results = sia_results();
        let record = results.getrecord(0).unwrap();
        assert_eq!(record.title(), Some("neat m51"));
        assert_eq!(record.ra(), Some(202.48));
        assert_eq!(record.dec(), Some(47.23));
        assert_eq!(record.format(), Some("image/fits"));
        assert_eq!(record.getdataurl().unwrap(), "http://example.org/img.fits");
    }

    #[test]
    fn absent_columns_yield_none_not_errors() {
        let results = sia_results();
        let record = results.getrecord(0).unwrap();
        assert_eq!(record.instrument(), None);
        assert!(record.dateobs().is_none());
        assert_eq!(record.wavelength(), None);
    }

    #[test]
    fn getdataurl_errors_without_access_column() {
        let response = r#"<VOTABLE><RESOURCE type="results"><TABLE>
            <FIELD name="x" datatype="int"/>
            <DATA><TABLEDATA><TR><TD>1</TD></TR></TABLEDATA></DATA>
        </TABLE></RESOURCE></VOTABLE>"#;
        let results = DalResults::from_bytes(response.as_bytes(), Protocol::Sia).unwrap();
        let record = results.getrecord(0).unwrap();
        assert!(record.getdataurl().is_err());
    }

    #[test]
    fn dataset_filenames_avoid_collisions() {
        let results = sia_results();
        let record = results.getrecord(0).unwrap();
        let dir = std::env::temp_dir().join(format!("vo-dal-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let first = record.make_dataset_filename(&dir, None);
        assert_eq!(first.file_name().unwrap(), "neat_m51.fits");
        fs::write(&first, b"x").unwrap();
        let second = record.make_dataset_filename(&dir, None);
        assert_eq!(second.file_name().unwrap(), "neat_m51-1.fits");
        let named = record.make_dataset_filename(&dir, Some("override"));
        assert_eq!(named.file_name().unwrap(), "override.fits");
        fs::remove_dir_all(&dir).unwrap();
    }
}
