//! A thin, navigable model of parsed VOTable documents.
//!
//! XML parsing itself is delegated to `roxmltree`; this module only maps the
//! element tree onto typed tables. Cell data is stored columnar in one of
//! four storage classes so rows can be viewed without copying.

mod parse;

pub use parse::{parse_votable, parse_votable_str};

use thiserror::Error;

/// Errors raised while interpreting a byte stream as a VOTable.
#[derive(Error, Debug)]
pub enum VoTableError {
    /// The document was not well-formed XML.
    #[error("{0}")]
    Xml(#[from] roxmltree::Error),
    /// The document was not valid UTF-8.
    #[error("{0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// The root element was not `VOTABLE`.
    #[error("document root is not a VOTABLE element")]
    NotVoTable,
    /// The table used a serialization this reader does not handle.
    #[error("unsupported table serialization: {0}")]
    Unsupported(String),
    /// A cell could not be parsed as its column's declared datatype.
    #[error("row {row}, column {column}: cannot parse \"{text}\" as {datatype}")]
    CellParse {
        /// Zero-based row index of the offending cell.
        row: usize,
        /// Zero-based column index of the offending cell.
        column: usize,
        /// Declared datatype of the column.
        datatype: Datatype,
        /// Raw cell text.
        text: String,
    },
    /// A table row carried the wrong number of cells.
    #[error("row {row} has {found} cells, expected {expected}")]
    CellCountMismatch {
        /// Zero-based row index.
        row: usize,
        /// Number of declared fields.
        expected: usize,
        /// Number of cells found in the row.
        found: usize,
    },
}

/// Primitive datatypes a VOTable FIELD may declare.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Datatype {
    /// `boolean`
    Boolean,
    /// `bit`
    Bit,
    /// `unsignedByte`
    UnsignedByte,
    /// `short`
    Short,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `char`
    #[default]
    Char,
    /// `unicodeChar`
    UnicodeChar,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `floatComplex`
    FloatComplex,
    /// `doubleComplex`
    DoubleComplex,
}

impl Datatype {
    /// Parses the datatype identifier used in FIELD declarations.
    pub fn from_identifier(s: &str) -> Option<Self> {
        match s {
            "boolean" => Some(Self::Boolean),
            "bit" => Some(Self::Bit),
            "unsignedByte" => Some(Self::UnsignedByte),
            "short" => Some(Self::Short),
            "int" => Some(Self::Int),
            "long" => Some(Self::Long),
            "char" => Some(Self::Char),
            "unicodeChar" => Some(Self::UnicodeChar),
            "float" => Some(Self::Float),
            "double" => Some(Self::Double),
            "floatComplex" => Some(Self::FloatComplex),
            "doubleComplex" => Some(Self::DoubleComplex),

            _ => None,
        }
    }

    /// Returns the wire identifier for this datatype.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Bit => "bit",
            Self::UnsignedByte => "unsignedByte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Char => "char",
            Self::UnicodeChar => "unicodeChar",
            Self::Float => "float",
            Self::Double => "double",
            Self::FloatComplex => "floatComplex",
            Self::DoubleComplex => "doubleComplex",
        }
    }

    pub(crate) fn storage(self) -> Storage {
        match self {
            Self::Boolean => Storage::Bool,
            Self::Bit | Self::UnsignedByte | Self::Short | Self::Int | Self::Long => Storage::Long,
            Self::Float | Self::Double => Storage::Double,
            Self::Char | Self::UnicodeChar | Self::FloatComplex | Self::DoubleComplex => {
                Storage::Text
            }
        }
    }
}

impl std::fmt::Display for Datatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Storage {
    Bool,
    Long,
    Double,
    Text,
}

/// Metadata describing one table column.
#[derive(Debug, Clone, Default)]
pub struct Field {
    pub(crate) id: Option<String>,
    pub(crate) name: String,
    pub(crate) datatype: Datatype,
    pub(crate) arraysize: Option<String>,
    pub(crate) xtype: Option<String>,
    pub(crate) ucd: Option<String>,
    pub(crate) utype: Option<String>,
    pub(crate) unit: Option<String>,
    pub(crate) description: Option<String>,
}

impl Field {
    /// `ID` attribute, when declared.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// `name` attribute.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The canonical lookup key for this column: `ID` if present, else `name`.
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }

    /// Declared primitive datatype.
    pub fn datatype(&self) -> Datatype {
        self.datatype
    }

    /// Raw `arraysize` attribute, when declared.
    pub fn arraysize(&self) -> Option<&str> {
        self.arraysize.as_deref()
    }

    /// Extended type hint (e.g. `timestamp`), when declared.
    pub fn xtype(&self) -> Option<&str> {
        self.xtype.as_deref()
    }

    /// Unified Content Descriptor tag, when declared.
    pub fn ucd(&self) -> Option<&str> {
        self.ucd.as_deref()
    }

    /// UType tag, when declared.
    pub fn utype(&self) -> Option<&str> {
        self.utype.as_deref()
    }

    /// Physical unit, when declared.
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Human-readable column description, when present.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// An INFO element: a named value with optional text content.
#[derive(Debug, Clone, Default)]
pub struct Info {
    pub(crate) name: String,
    pub(crate) value: String,
    pub(crate) content: String,
}

impl Info {
    /// `name` attribute.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `value` attribute.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Text content of the element, trimmed.
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A PARAM element: field metadata plus a fixed value.
#[derive(Debug, Clone, Default)]
pub struct Param {
    pub(crate) field: Field,
    pub(crate) value: String,
}

impl Param {
    /// Field metadata attached to the parameter.
    pub fn field(&self) -> &Field {
        &self.field
    }

    /// `name` attribute.
    pub fn name(&self) -> &str {
        &self.field.name
    }

    /// `value` attribute.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A GROUP element holding related PARAMs.
#[derive(Debug, Clone, Default)]
pub struct Group {
    pub(crate) name: Option<String>,
    pub(crate) params: Vec<Param>,
}

impl Group {
    /// `name` attribute, when declared.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// PARAMs declared inside the group.
    pub fn params(&self) -> &[Param] {
        &self.params
    }
}

/// Columnar cell storage, one vector per column.
#[derive(Debug, Clone)]
pub enum Column {
    /// Boolean cells.
    Bool(Vec<Option<bool>>),
    /// Integer cells of any declared width.
    Long(Vec<Option<i64>>),
    /// Floating-point cells of either declared width.
    Double(Vec<Option<f64>>),
    /// Character cells.
    Text(Vec<Option<String>>),
}

impl Column {
    /// Number of rows stored in the column.
    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Long(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    /// Whether the column holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrows the cell at `row`.
    ///
    /// Panics if `row` is out of bounds; use [`Table::get`] for a checked
    /// lookup.
    pub fn value(&self, row: usize) -> Value<'_> {
        match self {
            Self::Bool(v) => v[row].map_or(Value::Null, Value::Bool),
            Self::Long(v) => v[row].map_or(Value::Null, Value::Long),
            Self::Double(v) => v[row].map_or(Value::Null, Value::Double),
            Self::Text(v) => v[row].as_deref().map_or(Value::Null, Value::Text),
        }
    }
}

/// A borrowed view of one table cell.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Value<'a> {
    /// Empty or null cell.
    Null,
    /// Boolean cell.
    Bool(bool),
    /// Integer cell.
    Long(i64),
    /// Floating-point cell.
    Double(f64),
    /// Character cell.
    Text(&'a str),
}

impl<'a> Value<'a> {
    /// Whether the cell is empty.
    pub fn is_null(self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the cell as a boolean, when it is one.
    pub fn as_bool(self) -> Option<bool> {
        if let Value::Bool(v) = self {
            Some(v)
        } else {
            None
        }
    }

    /// Returns the cell as an integer, when it is one.
    pub fn as_long(self) -> Option<i64> {
        if let Value::Long(v) = self {
            Some(v)
        } else {
            None
        }
    }

    /// Returns the cell as a float, when it is one.
    pub fn as_double(self) -> Option<f64> {
        if let Value::Double(v) = self {
            Some(v)
        } else {
            None
        }
    }

    /// Returns the cell as a string slice, when it is text.
    pub fn as_str(self) -> Option<&'a str> {
        if let Value::Text(v) = self {
            Some(v)
        } else {
            None
        }
    }

    /// Coerces any numeric cell to `f64`.
    pub fn to_f64(self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(v),
            Value::Long(v) => Some(v as f64),
            _ => None,
        }
    }
}

/// One parsed TABLE: field metadata plus columnar data.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub(crate) fields: Vec<Field>,
    pub(crate) params: Vec<Param>,
    pub(crate) infos: Vec<Info>,
    pub(crate) columns: Vec<Column>,
    pub(crate) n_rows: usize,
}

impl Table {
    /// Column metadata, in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// PARAMs declared on the table.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// INFOs declared on the table.
    pub fn infos(&self) -> &[Info] {
        &self.infos
    }

    /// Number of data rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    pub fn n_columns(&self) -> usize {
        self.fields.len()
    }

    /// Borrows the cell at (`row`, `column`); panics when out of bounds.
    pub fn value(&self, row: usize, column: usize) -> Value<'_> {
        self.columns[column].value(row)
    }

    /// Checked variant of [`Table::value`].
    pub fn get(&self, row: usize, column: usize) -> Option<Value<'_>> {
        if row < self.n_rows && column < self.columns.len() {
            Some(self.columns[column].value(row))
        } else {
            None
        }
    }

    /// Zero-based index of the column whose key (`ID` else `name`) matches.
    pub fn column_index(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.key() == key)
    }
}

/// One RESOURCE element with its nested content.
#[derive(Debug, Clone, Default)]
pub struct Resource {
    pub(crate) type_attr: Option<String>,
    pub(crate) utype: Option<String>,
    pub(crate) infos: Vec<Info>,
    pub(crate) params: Vec<Param>,
    pub(crate) groups: Vec<Group>,
    pub(crate) tables: Vec<Table>,
    pub(crate) resources: Vec<Resource>,
}

impl Resource {
    /// `type` attribute, when declared (e.g. `"results"` or `"meta"`).
    pub fn type_attr(&self) -> Option<&str> {
        self.type_attr.as_deref()
    }

    /// `utype` attribute, when declared.
    pub fn utype(&self) -> Option<&str> {
        self.utype.as_deref()
    }

    /// INFOs declared directly on the resource.
    pub fn infos(&self) -> &[Info] {
        &self.infos
    }

    /// PARAMs declared directly on the resource.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// GROUPs declared directly on the resource.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Tables declared directly on the resource.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Nested resources.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// First PARAM with the given name, searching this resource only.
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name() == name)
    }

    /// First GROUP with the given name.
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name() == Some(name))
    }
}

/// A parsed VOTable document.
#[derive(Debug, Clone, Default)]
pub struct VoTable {
    pub(crate) infos: Vec<Info>,
    pub(crate) params: Vec<Param>,
    pub(crate) resources: Vec<Resource>,
}

impl VoTable {
    /// INFOs declared at the document root.
    pub fn infos(&self) -> &[Info] {
        &self.infos
    }

    /// PARAMs declared at the document root.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Top-level resources, in document order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// First resource whose `type` attribute matches, searching depth-first.
    pub fn resource_by_type(&self, type_attr: &str) -> Option<&Resource> {
        fn walk<'a>(resources: &'a [Resource], wanted: &str) -> Option<&'a Resource> {
            for resource in resources {
                if resource.type_attr() == Some(wanted) {
                    return Some(resource);
                }
                if let Some(found) = walk(&resource.resources, wanted) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.resources, type_attr)
    }

    /// First table in the document, searching resources depth-first.
    pub fn first_table(&self) -> Option<&Table> {
        fn walk(resources: &[Resource]) -> Option<&Table> {
            for resource in resources {
                if let Some(table) = resource.tables.first() {
                    return Some(table);
                }
                if let Some(table) = walk(&resource.resources) {
                    return Some(table);
                }
            }
            None
        }
        walk(&self.resources)
    }
}
