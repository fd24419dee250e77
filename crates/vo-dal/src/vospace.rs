//! A small VOSpace client for reading remote node trees.

use std::collections::HashMap;

use roxmltree::{Document, Node as XmlNode};

use vo_core::errors::{DalResult, FormatError};
use vo_core::session::Session;

/// The structural kind of a VOSpace node.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NodeType {
    /// A node holding child nodes.
    Container,
    /// A node holding data.
    Data,
    /// A node linking to another node.
    Link,
    /// A kind this client does not recognize.
    Unknown,
}

impl NodeType {
    fn from_xsi_type(xsi_type: Option<&str>) -> Self {
        let Some(xsi_type) = xsi_type else {
            return Self::Unknown;
        };
        if xsi_type.ends_with("ContainerNode") {
            Self::Container
        } else if xsi_type.ends_with("DataNode") || xsi_type.ends_with("UnstructuredDataNode") {
            Self::Data
        } else if xsi_type.ends_with("LinkNode") {
            Self::Link
        } else {
            Self::Unknown
        }
    }
}

/// One node of a VOSpace tree.
#[derive(Debug, Clone)]
pub struct VospaceNode {
    pub(crate) uri: String,
    pub(crate) node_type: NodeType,
    pub(crate) busy: bool,
    pub(crate) properties: HashMap<String, String>,
    pub(crate) children: Vec<VospaceNode>,
}

impl VospaceNode {
    /// The node's VOSpace URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The node's structural kind.
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Whether the service reports the node as busy.
    pub fn busy(&self) -> bool {
        self.busy
    }

    /// Node properties keyed by property URI.
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    /// The value of a property, when set.
    pub fn property(&self, uri: &str) -> Option<&str> {
        self.properties.get(uri).map(String::as_str)
    }

    /// Child nodes, for container nodes.
    pub fn children(&self) -> &[VospaceNode] {
        &self.children
    }

    /// The last path segment of the node URI.
    pub fn name(&self) -> &str {
        self.uri.rsplit('/').next().unwrap_or(&self.uri)
    }
}

fn is_named(node: XmlNode<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name().eq_ignore_ascii_case(name)
}

fn attr_any<'a>(node: XmlNode<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|attr| attr.name() == name)
        .map(|attr| attr.value())
}

fn parse_node_element(element: XmlNode<'_, '_>) -> VospaceNode {
    let properties = element
        .children()
        .find(|child| is_named(*child, "properties"))
        .map(|props| {
            props
                .children()
                .filter(|child| is_named(*child, "property"))
                .filter_map(|prop| {
                    let uri = prop.attribute("uri")?;
                    let value = prop.text().map(str::trim).unwrap_or_default();
                    Some((uri.to_string(), value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();
    let children = element
        .children()
        .find(|child| is_named(*child, "nodes"))
        .map(|nodes| {
            nodes
                .children()
                .filter(|child| is_named(*child, "node"))
                .map(parse_node_element)
                .collect()
        })
        .unwrap_or_default();
    VospaceNode {
        uri: element.attribute("uri").unwrap_or_default().to_string(),
        node_type: NodeType::from_xsi_type(attr_any(element, "type")),
        busy: attr_any(element, "busy").is_some_and(|b| b.eq_ignore_ascii_case("true")),
        properties,
        children,
    }
}

/// Parses a VOSpace node document.
pub fn parse_node(text: &str) -> Result<VospaceNode, FormatError> {
    let doc = Document::parse(text).map_err(|err| FormatError::new(err.to_string()))?;
    let root = doc.root_element();
    if !is_named(root, "node") {
        return Err(FormatError::new("document root is not a VOSpace node"));
    }
    Ok(parse_node_element(root))
}

/// A VOSpace service endpoint.
#[derive(Debug, Clone)]
pub struct VospaceService {
    base_url: String,
    session: Session,
}

impl VospaceService {
    /// Creates a service client for a VOSpace endpoint.
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

    /// Reads the node at `path`, including one level of container children.
    pub fn get_node(&self, path: &str) -> DalResult<VospaceNode> {
        let url = format!(
            "{}/nodes/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let text = self.session.get_text(&url)?;
        Ok(parse_node(&text).map_err(|err| err.with_url(url))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE: &str = r#"<vos:node xmlns:vos="http://www.ivoa.net/xml/VOSpace/v2.0"
            xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
            xsi:type="vos:ContainerNode" uri="vos://example.org!vospace/mydata">
        <vos:properties>
            <vos:property uri="ivo://ivoa.net/vospace/core#description">working area</vos:property>
        </vos:properties>
        <vos:nodes>
            <vos:node xsi:type="vos:DataNode" uri="vos://example.org!vospace/mydata/image.fits" busy="true"/>
            <vos:node xsi:type="vos:LinkNode" uri="vos://example.org!vospace/mydata/alias"/>
        </vos:nodes>
    </vos:node>"#;

    #[test]
    fn parses_a_container_tree() {
        let node = parse_node(NODE).unwrap();
        assert_eq!(node.node_type(), NodeType::Container);
        assert_eq!(node.name(), "mydata");
        assert_eq!(
            node.property("ivo://ivoa.net/vospace/core#description"),
            Some("working area")
        );
        assert_eq!(node.children().len(), 2);
        assert_eq!(node.children()[0].node_type(), NodeType::Data);
        assert!(node.children()[0].busy());
        assert_eq!(node.children()[1].node_type(), NodeType::Link);
    }

    #[test]
    fn rejects_non_node_documents() {
        assert!(parse_node("<something/>").is_err());
    }
}
