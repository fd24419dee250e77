//! Parsers for the VO Support Interface endpoint documents.
//!
//! These are plain-XML (not VOTable) descriptions of a service's operational
//! state (`availability`), its declared standards and endpoints
//! (`capabilities`), and its queryable schema (`tables`).

use chrono::{DateTime, Utc};
use roxmltree::{Document, Node};
use thiserror::Error;

/// Errors raised while interpreting a VOSI document.
#[derive(Error, Debug)]
pub enum VosiError {
    /// The document was not well-formed XML.
    #[error("{0}")]
    Xml(#[from] roxmltree::Error),
    /// A required element was missing from the document.
    #[error("missing element: {0}")]
    MissingElement(&'static str),
}

fn is_named(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name().eq_ignore_ascii_case(name)
}

fn find_named<'a, 'd>(node: Node<'a, 'd>, name: &str) -> Option<Node<'a, 'd>> {
    node.children().find(|child| is_named(*child, name))
}

fn text_of(node: Node<'_, '_>, name: &str) -> Option<String> {
    find_named(node, name)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
}

// xsi:type and friends arrive namespaced; match on the local name only.
fn attr_any<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|attr| attr.name() == name)
        .map(|attr| attr.value())
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Operational state reported by a service's `availability` endpoint.
#[derive(Debug, Clone, Default)]
pub struct Availability {
    pub(crate) available: bool,
    pub(crate) up_since: Option<DateTime<Utc>>,
    pub(crate) down_at: Option<DateTime<Utc>>,
    pub(crate) back_at: Option<DateTime<Utc>>,
    pub(crate) notes: Vec<String>,
}

impl Availability {
    /// Whether the service reports itself as accepting requests.
    pub fn available(&self) -> bool {
        self.available
    }

    /// Instant the service last came up, when reported.
    pub fn up_since(&self) -> Option<DateTime<Utc>> {
        self.up_since
    }

    /// Instant of the next scheduled downtime, when reported.
    pub fn down_at(&self) -> Option<DateTime<Utc>> {
        self.down_at
    }

    /// Instant the service expects to return, when reported.
    pub fn back_at(&self) -> Option<DateTime<Utc>> {
        self.back_at
    }

    /// Free-text operator notes.
    pub fn notes(&self) -> &[String] {
        &self.notes
    }
}

/// Parses an `availability` document.
pub fn parse_availability(text: &str) -> Result<Availability, VosiError> {
    let doc = Document::parse(text)?;
    let root = doc.root_element();
    let available = text_of(root, "available")
        .ok_or(VosiError::MissingElement("available"))?
        .eq_ignore_ascii_case("true");
    Ok(Availability {
        available,
        up_since: text_of(root, "upSince").as_deref().and_then(parse_instant),
        down_at: text_of(root, "downAt").as_deref().and_then(parse_instant),
        back_at: text_of(root, "backAt").as_deref().and_then(parse_instant),
        notes: root
            .children()
            .filter(|child| is_named(*child, "note"))
            .filter_map(|n| n.text())
            .map(|t| t.trim().to_string())
            .collect(),
    })
}

/// One interface of a declared capability.
#[derive(Debug, Clone, Default)]
pub struct Interface {
    pub(crate) type_attr: Option<String>,
    pub(crate) role: Option<String>,
    pub(crate) access_urls: Vec<String>,
    pub(crate) security_methods: Vec<String>,
}

impl Interface {
    /// `xsi:type` of the interface, when declared.
    pub fn type_attr(&self) -> Option<&str> {
        self.type_attr.as_deref()
    }

    /// `role` attribute, when declared.
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Access URLs declared on the interface.
    pub fn access_urls(&self) -> &[String] {
        &self.access_urls
    }

    /// Security method standard IDs declared on the interface.
    ///
    /// An empty list means the interface is reachable anonymously.
    pub fn security_methods(&self) -> &[String] {
        &self.security_methods
    }
}

/// One capability declared by a service.
#[derive(Debug, Clone, Default)]
pub struct Capability {
    pub(crate) standard_id: Option<String>,
    pub(crate) interfaces: Vec<Interface>,
}

impl Capability {
    /// `standardID` of the capability, when declared.
    pub fn standard_id(&self) -> Option<&str> {
        self.standard_id.as_deref()
    }

    /// Interfaces declared for the capability.
    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }
}

/// Parses a `capabilities` document into its capability list.
pub fn parse_capabilities(text: &str) -> Result<Vec<Capability>, VosiError> {
    let doc = Document::parse(text)?;
    let root = doc.root_element();
    Ok(root
        .children()
        .filter(|child| is_named(*child, "capability"))
        .map(|cap| Capability {
            standard_id: cap.attribute("standardID").map(str::to_string),
            interfaces: cap
                .children()
                .filter(|child| is_named(*child, "interface"))
                .map(|iface| Interface {
                    type_attr: attr_any(iface, "type").map(str::to_string),
                    role: iface.attribute("role").map(str::to_string),
                    access_urls: iface
                        .children()
                        .filter(|child| is_named(*child, "accessURL"))
                        .filter_map(|n| n.text())
                        .map(|t| t.trim().to_string())
                        .collect(),
                    security_methods: iface
                        .children()
                        .filter(|child| is_named(*child, "securityMethod"))
                        .filter_map(|n| n.attribute("standardID"))
                        .map(str::to_string)
                        .collect(),
                })
                .collect(),
        })
        .collect())
}

/// Column description within a VOSI table document.
#[derive(Debug, Clone, Default)]
pub struct ColumnDesc {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) unit: Option<String>,
    pub(crate) ucd: Option<String>,
    pub(crate) utype: Option<String>,
    pub(crate) datatype: Option<String>,
}

impl ColumnDesc {
    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description, when present.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Physical unit, when declared.
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Unified Content Descriptor tag, when declared.
    pub fn ucd(&self) -> Option<&str> {
        self.ucd.as_deref()
    }

    /// UType tag, when declared.
    pub fn utype(&self) -> Option<&str> {
        self.utype.as_deref()
    }

    /// Declared datatype name, when present.
    pub fn datatype(&self) -> Option<&str> {
        self.datatype.as_deref()
    }
}

/// Table description within a VOSI schema.
#[derive(Debug, Clone, Default)]
pub struct TableDesc {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) columns: Vec<ColumnDesc>,
}

impl TableDesc {
    /// Fully qualified table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description, when present.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Column descriptions.
    pub fn columns(&self) -> &[ColumnDesc] {
        &self.columns
    }
}

/// Schema grouping within a VOSI `tables` document.
#[derive(Debug, Clone, Default)]
pub struct SchemaDesc {
    pub(crate) name: String,
    pub(crate) tables: Vec<TableDesc>,
}

impl SchemaDesc {
    /// Schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tables declared in the schema.
    pub fn tables(&self) -> &[TableDesc] {
        &self.tables
    }
}

/// A service's queryable table hierarchy.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    pub(crate) schemas: Vec<SchemaDesc>,
}

impl TableSet {
    /// Schemas declared by the service.
    pub fn schemas(&self) -> &[SchemaDesc] {
        &self.schemas
    }

    /// Iterates all table descriptions across every schema.
    pub fn iter_tables(&self) -> impl Iterator<Item = &TableDesc> {
        self.schemas.iter().flat_map(|schema| schema.tables.iter())
    }
}

/// Parses a `tables` document into the schema hierarchy.
pub fn parse_tableset(text: &str) -> Result<TableSet, VosiError> {
    let doc = Document::parse(text)?;
    let root = doc.root_element();
    Ok(TableSet {
        schemas: root
            .children()
            .filter(|child| is_named(*child, "schema"))
            .map(|schema| SchemaDesc {
                name: text_of(schema, "name").unwrap_or_default(),
                tables: schema
                    .children()
                    .filter(|child| is_named(*child, "table"))
                    .map(|table| TableDesc {
                        name: text_of(table, "name").unwrap_or_default(),
                        description: text_of(table, "description"),
                        columns: table
                            .children()
                            .filter(|child| is_named(*child, "column"))
                            .map(|column| ColumnDesc {
                                name: text_of(column, "name").unwrap_or_default(),
                                description: text_of(column, "description"),
                                unit: text_of(column, "unit"),
                                ucd: text_of(column, "ucd"),
                                utype: text_of(column, "utype"),
                                datatype: text_of(column, "dataType"),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_availability() {
        let text = r#"<avl:availability xmlns:avl="http://www.ivoa.net/xml/VOSIAvailability/v1.0">
            <avl:available>true</avl:available>
            <avl:upSince>2024-03-01T00:00:00Z</avl:upSince>
            <avl:note>nominal</avl:note>
        </avl:availability>"#;
        let availability = parse_availability(text).unwrap();
        assert!(availability.available());
        assert!(availability.up_since().is_some());
        assert_eq!(availability.notes(), &["nominal".to_string()]);
    }

    #[test]
    fn availability_requires_available_element() {
        assert!(matches!(
            parse_availability("<availability/>").unwrap_err(),
            VosiError::MissingElement("available")
        ));
    }

    #[test]
    fn parses_capabilities_with_security_methods() {
        let text = r#"<cap:capabilities xmlns:cap="http://www.ivoa.net/xml/VOSICapabilities/v1.0"
                xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
            <capability standardID="ivo://ivoa.net/std/TAP">
                <interface xsi:type="vod:ParamHTTP" role="std">
                    <accessURL>http://example.org/tap</accessURL>
                    <securityMethod standardID="ivo://ivoa.net/sso#Cookie"/>
                </interface>
                <interface xsi:type="vod:ParamHTTP">
                    <accessURL>http://example.org/tap-anon</accessURL>
                </interface>
            </capability>
        </cap:capabilities>"#;
        let capabilities = parse_capabilities(text).unwrap();
        assert_eq!(capabilities.len(), 1);
        let cap = &capabilities[0];
        assert_eq!(cap.standard_id(), Some("ivo://ivoa.net/std/TAP"));
        assert_eq!(cap.interfaces()[0].security_methods(), &[
            "ivo://ivoa.net/sso#Cookie".to_string()
        ]);
        assert!(cap.interfaces()[1].security_methods().is_empty());
        assert_eq!(cap.interfaces()[0].type_attr(), Some("vod:ParamHTTP"));
    }

    #[test]
    fn parses_tableset() {
        let text = r#"<vosi:tableset xmlns:vosi="http://www.ivoa.net/xml/VOSITables/v1.0">
            <schema>
                <name>ivoa</name>
                <table>
                    <name>ivoa.obscore</name>
                    <column><name>obs_id</name><dataType>char</dataType></column>
                    <column><name>s_ra</name><unit>deg</unit></column>
                </table>
            </schema>
        </vosi:tableset>"#;
        let tableset = parse_tableset(text).unwrap();
        assert_eq!(tableset.schemas().len(), 1);
        let table = tableset.iter_tables().next().unwrap();
        assert_eq!(table.name(), "ivoa.obscore");
        assert_eq!(table.columns()[1].unit(), Some("deg"));
    }
}
