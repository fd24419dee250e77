//! A DB-API style cursor over a result set.

use vo_core::errors::ParamError;
use vo_core::votable::{Datatype, Field};

use crate::record::Record;
use crate::results::DalResults;

/// Coarse column classification reported in cursor descriptions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TypeCode {
    /// Integer or floating-point column.
    Number,
    /// Character column.
    String,
    /// Bit or byte column.
    Binary,
    /// Character column declared as a timestamp.
    Datetime,
}

impl TypeCode {
    /// Classifies a column from its VOTable metadata.
    pub fn classify(field: &Field) -> Self {
        match field.datatype() {
            Datatype::Bit | Datatype::UnsignedByte => Self::Binary,
            Datatype::Char | Datatype::UnicodeChar => {
                let is_timestamp = field
                    .xtype()
                    .is_some_and(|x| x.eq_ignore_ascii_case("timestamp")
                        || x.eq_ignore_ascii_case("adql:TIMESTAMP"));
                if is_timestamp {
                    Self::Datetime
                } else {
                    Self::String
                }
            }
            _ => Self::Number,
        }
    }
}

/// One entry of a cursor description.
#[derive(Debug, Clone)]
pub struct ColumnDescription {
    pub(crate) name: String,
    pub(crate) type_code: TypeCode,
    pub(crate) null_ok: bool,
}

impl ColumnDescription {
    /// Canonical column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Coarse column classification.
    pub fn type_code(&self) -> TypeCode {
        self.type_code
    }

    /// Whether the column may hold null cells.
    pub fn null_ok(&self) -> bool {
        self.null_ok
    }
}

/// Direction semantics for [`Cursor::scroll`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScrollMode {
    /// Offset from the current position.
    Relative,
    /// Absolute row position.
    Absolute,
}

/// Sequential access over a result set in the DB-API style.
#[derive(Debug)]
pub struct Cursor<'a> {
    results: &'a DalResults,
    position: usize,
    arraysize: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(results: &'a DalResults) -> Self {
        Self {
            results,
            position: 0,
            arraysize: 1,
        }
    }

    /// Number of rows in the result set.
    pub fn rowcount(&self) -> usize {
        self.results.rowcount()
    }

    /// Current row position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Default batch size used by [`Cursor::fetchmany`].
    pub fn arraysize(&self) -> usize {
        self.arraysize
    }

    /// Sets the default batch size used by [`Cursor::fetchmany`].
    pub fn set_arraysize(&mut self, arraysize: usize) {
        self.arraysize = arraysize.max(1);
    }

    /// Per-column metadata for the result set.
    pub fn description(&self) -> Vec<ColumnDescription> {
        self.results
            .fields()
            .iter()
            .map(|field| ColumnDescription {
                name: field.key().to_string(),
                type_code: TypeCode::classify(field),
                null_ok: true,
            })
            .collect()
    }

    /// Fetches the next record, advancing the cursor.
    pub fn fetchone(&mut self) -> Option<Record<'a>> {
        let record = self.results.getrecord(self.position)?;
        self.position += 1;
        Some(record)
    }

    /// Fetches up to `size` records (default: the cursor's arraysize).
    pub fn fetchmany(&mut self, size: Option<usize>) -> Vec<Record<'a>> {
        let size = size.unwrap_or(self.arraysize);
        let mut batch = Vec::with_capacity(size);
        while batch.len() < size {
            match self.fetchone() {
                Some(record) => batch.push(record),
                None => break,
            }
        }
        batch
    }

    /// Fetches every remaining record.
    pub fn fetchall(&mut self) -> Vec<Record<'a>> {
        let mut rest = Vec::new();
        while let Some(record) = self.fetchone() {
            rest.push(record);
        }
        rest
    }

    /// Moves the cursor to a new position.
    ///
    /// Positions outside `[0, rowcount]` are rejected without moving.
    pub fn scroll(&mut self, value: i64, mode: ScrollMode) -> Result<(), ParamError> {
        let target = match mode {
            ScrollMode::Relative => self.position as i64 + value,
            ScrollMode::Absolute => value,
        };
        if target < 0 || target > self.rowcount() as i64 {
            return Err(ParamError::ScrollOutOfRange {
                position: target,
                len: self.rowcount(),
            });
        }
        self.position = target as usize;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;

    const RESPONSE: &str = r#"<VOTABLE><RESOURCE type="results"><TABLE>
        <FIELD name="name" datatype="char" arraysize="*"/>
        <FIELD name="flux" datatype="float"/>
        <FIELD name="flags" datatype="unsignedByte"/>
        <FIELD name="obs_time" datatype="char" arraysize="*" xtype="timestamp"/>
        <DATA><TABLEDATA>
          <TR><TD>a</TD><TD>1.5</TD><TD>0</TD><TD>2024-01-01T00:00:00</TD></TR>
          <TR><TD>b</TD><TD>2.5</TD><TD>1</TD><TD>2024-01-02T00:00:00</TD></TR>
          <TR><TD>c</TD><TD>3.5</TD><TD>2</TD><TD>2024-01-03T00:00:00</TD></TR>
        </TABLEDATA></DATA>
    </TABLE></RESOURCE></VOTABLE>"#;

    fn results() -> DalResults {
        DalResults::from_bytes(RESPONSE.as_bytes(), Protocol::Tap).unwrap()
    }

    #[test]
    fn description_classifies_columns() {
        let results = results();
        let cursor = results.cursor();
        let description = cursor.description();
        assert_eq!(description[0].type_code(), TypeCode::String);
        assert_eq!(description[1].type_code(), TypeCode::Number);
        assert_eq!(description[2].type_code(), TypeCode::Binary);
        assert_eq!(description[3].type_code(), TypeCode::Datetime);
        assert_eq!(description[0].name(), "name");
    }

    #[test]
    fn fetch_advances_through_rows() {
        let results = results();
        let mut cursor = results.cursor();
        assert_eq!(
            cursor.fetchone().unwrap().get("name").unwrap().as_str(),
            Some("a")
        );
        let batch = cursor.fetchmany(Some(5));
        assert_eq!(batch.len(), 2);
        assert!(cursor.fetchone().is_none());
    }

    #[test]
    fn fetchall_returns_remaining_rows() {
        let results = results();
        let mut cursor = results.cursor();
        cursor.fetchone();
        assert_eq!(cursor.fetchall().len(), 2);
    }

    #[test]
    fn scroll_checks_bounds() {
        let results = results();
        let mut cursor = results.cursor();
        cursor.scroll(2, ScrollMode::Absolute).unwrap();
        assert_eq!(cursor.position(), 2);
        cursor.scroll(-1, ScrollMode::Relative).unwrap();
        assert_eq!(cursor.position(), 1);
        assert!(cursor.scroll(-5, ScrollMode::Relative).is_err());
        assert!(cursor.scroll(10, ScrollMode::Absolute).is_err());
        assert_eq!(cursor.position(), 1);
    }
}
