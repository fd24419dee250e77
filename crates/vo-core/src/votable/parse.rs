use roxmltree::{Document, Node};

use super::{
    Column, Datatype, Field, Group, Info, Param, Resource, Storage, Table, VoTable, VoTableError,
};

fn is_named(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name().eq_ignore_ascii_case(name)
}

fn elements<'a, 'd: 'a>(
    node: Node<'a, 'd>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'd>> + 'a {
    node.children().filter(move |child| is_named(*child, name))
}

fn description_of(node: Node<'_, '_>) -> Option<String> {
    elements(node, "DESCRIPTION")
        .next()
        .and_then(|d| d.text())
        .map(|t| t.trim().to_string())
}

/// Parses a byte stream as a VOTable document.
pub fn parse_votable(bytes: &[u8]) -> Result<VoTable, VoTableError> {
    parse_votable_str(std::str::from_utf8(bytes)?)
}

/// Parses VOTable XML text into the document model.
pub fn parse_votable_str(text: &str) -> Result<VoTable, VoTableError> {
    let doc = Document::parse(text)?;
    let root = doc.root_element();
    if !root.tag_name().name().eq_ignore_ascii_case("VOTABLE") {
        return Err(VoTableError::NotVoTable);
    }
    Ok(VoTable {
        infos: elements(root, "INFO").map(parse_info).collect(),
        params: elements(root, "PARAM").map(parse_param).collect(),
        resources: elements(root, "RESOURCE")
            .map(parse_resource)
            .collect::<Result<_, _>>()?,
    })
}

fn parse_resource(node: Node<'_, '_>) -> Result<Resource, VoTableError> {
    Ok(Resource {
        type_attr: node.attribute("type").map(str::to_string),
        utype: node.attribute("utype").map(str::to_string),
        infos: elements(node, "INFO").map(parse_info).collect(),
        params: elements(node, "PARAM").map(parse_param).collect(),
        groups: elements(node, "GROUP").map(parse_group).collect(),
        tables: elements(node, "TABLE")
            .map(parse_table)
            .collect::<Result<_, _>>()?,
        resources: elements(node, "RESOURCE")
            .map(parse_resource)
            .collect::<Result<_, _>>()?,
    })
}

fn parse_info(node: Node<'_, '_>) -> Info {
    Info {
        name: node.attribute("name").unwrap_or_default().to_string(),
        value: node.attribute("value").unwrap_or_default().to_string(),
        content: node.text().map(str::trim).unwrap_or_default().to_string(),
    }
}

fn parse_field(node: Node<'_, '_>) -> Field {
    Field {
        id: node.attribute("ID").map(str::to_string),
        name: node.attribute("name").unwrap_or_default().to_string(),
        datatype: node
            .attribute("datatype")
            .and_then(Datatype::from_identifier)
            .unwrap_or_default(),
        arraysize: node.attribute("arraysize").map(str::to_string),
        xtype: node.attribute("xtype").map(str::to_string),
        ucd: node.attribute("ucd").map(str::to_string),
        utype: node.attribute("utype").map(str::to_string),
        unit: node.attribute("unit").map(str::to_string),
        description: description_of(node),
    }
}

fn parse_param(node: Node<'_, '_>) -> Param {
    Param {
        field: parse_field(node),
        value: node.attribute("value").unwrap_or_default().to_string(),
    }
}

fn parse_group(node: Node<'_, '_>) -> Group {
    Group {
        name: node.attribute("name").map(str::to_string),
        params: elements(node, "PARAM").map(parse_param).collect(),
    }
}

fn parse_table(node: Node<'_, '_>) -> Result<Table, VoTableError> {
    let fields: Vec<Field> = elements(node, "FIELD").map(parse_field).collect();
    let params: Vec<Param> = elements(node, "PARAM").map(parse_param).collect();
    let infos: Vec<Info> = elements(node, "INFO").map(parse_info).collect();

    let mut columns: Vec<Column> = fields
        .iter()
        .map(|field| match field.datatype.storage() {
            Storage::Bool => Column::Bool(Vec::new()),
            Storage::Long => Column::Long(Vec::new()),
            Storage::Double => Column::Double(Vec::new()),
            Storage::Text => Column::Text(Vec::new()),
        })
        .collect();

    let mut n_rows = 0;
    if let Some(data) = elements(node, "DATA").next() {
        let tabledata = match data.children().find(|child| child.is_element()) {
            Some(child) if is_named(child, "TABLEDATA") => child,
            Some(child) => {
                return Err(VoTableError::Unsupported(
                    child.tag_name().name().to_string(),
                ))
            }
            None => return Ok(table_from(fields, params, infos, columns, 0)),
        };
        for tr in elements(tabledata, "TR") {
            let cells: Vec<Node<'_, '_>> = elements(tr, "TD").collect();
            if cells.len() != fields.len() {
                return Err(VoTableError::CellCountMismatch {
                    row: n_rows,
                    expected: fields.len(),
                    found: cells.len(),
                });
            }
            for (column_index, cell) in cells.iter().enumerate() {
                let text = cell.text().map(str::trim).unwrap_or_default();
                push_cell(
                    &mut columns[column_index],
                    text,
                    n_rows,
                    column_index,
                    fields[column_index].datatype,
                )?;
            }
            n_rows += 1;
        }
    }
    Ok(table_from(fields, params, infos, columns, n_rows))
}

fn table_from(
    fields: Vec<Field>,
    params: Vec<Param>,
    infos: Vec<Info>,
    columns: Vec<Column>,
    n_rows: usize,
) -> Table {
    Table {
        fields,
        params,
        infos,
        columns,
        n_rows,
    }
}

fn push_cell(
    column: &mut Column,
    text: &str,
    row: usize,
    column_index: usize,
    datatype: Datatype,
) -> Result<(), VoTableError> {
    let cell_error = || VoTableError::CellParse {
        row,
        column: column_index,
        datatype,
        text: text.to_string(),
    };
    match column {
        Column::Bool(values) => {
            let parsed = if text.is_empty() || text == "?" {
                None
            } else {
                match text {
                    "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
                    "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
                    _ => return Err(cell_error()),
                }
            };
            values.push(parsed);
        }
        Column::Long(values) => {
            let parsed = if text.is_empty() {
                None
            } else {
                Some(text.parse::<i64>().map_err(|_| cell_error())?)
            };
            values.push(parsed);
        }
        Column::Double(values) => {
            let parsed = if text.is_empty() {
                None
            } else {
                Some(text.parse::<f64>().map_err(|_| cell_error())?)
            };
            values.push(parsed);
        }
        Column::Text(values) => values.push(Some(text.to_string())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::votable::Value;

    const SIMPLE: &str = r#"<?xml version="1.0"?>
<VOTABLE version="1.3" xmlns="http://www.ivoa.net/xml/VOTable/v1.3">
  <INFO name="QUERY_STATUS" value="OK"/>
  <RESOURCE type="results">
    <INFO name="standardID" value="ivo://ivoa.net/std/SIA"/>
    <TABLE>
      <FIELD ID="obs_id" name="id" datatype="char" arraysize="*"/>
      <FIELD name="ra" datatype="double" ucd="POS_EQ_RA_MAIN"/>
      <FIELD name="flags" datatype="int"/>
      <DATA>
        <TABLEDATA>
          <TR><TD>m51-a</TD><TD>202.48</TD><TD>3</TD></TR>
          <TR><TD>m51-b</TD><TD>202.50</TD><TD></TD></TR>
        </TABLEDATA>
      </DATA>
    </TABLE>
  </RESOURCE>
</VOTABLE>"#;

    #[test]
    fn parses_fields_and_rows() {
        let vot = parse_votable_str(SIMPLE).unwrap();
        assert_eq!(vot.infos().len(), 1);
        let table = vot.first_table().unwrap();
        assert_eq!(table.n_columns(), 3);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.fields()[0].key(), "obs_id");
        assert_eq!(table.fields()[1].key(), "ra");
        assert_eq!(table.fields()[1].ucd(), Some("POS_EQ_RA_MAIN"));
    }

    #[test]
    fn empty_numeric_cell_is_null() {
        let vot = parse_votable_str(SIMPLE).unwrap();
        let table = vot.first_table().unwrap();
        assert_eq!(table.value(0, 2), Value::Long(3));
        assert!(table.value(1, 2).is_null());
        assert_eq!(table.value(1, 1).to_f64(), Some(202.50));
    }

    #[test]
    fn resource_lookup_by_type() {
        let vot = parse_votable_str(SIMPLE).unwrap();
        let resource = vot.resource_by_type("results").unwrap();
        assert_eq!(resource.infos()[0].value(), "ivo://ivoa.net/std/SIA");
    }

    #[test]
    fn rejects_non_votable_roots() {
        let err = parse_votable_str("<HTML></HTML>").unwrap_err();
        assert!(matches!(err, VoTableError::NotVoTable));
    }

    #[test]
    fn rejects_malformed_xml() {
        assert!(parse_votable(b"<VOTABLE><RESOURCE>").is_err());
    }

    #[test]
    fn rejects_binary_serialization() {
        let text = r#"<VOTABLE><RESOURCE><TABLE>
          <FIELD name="x" datatype="int"/>
          <DATA><BINARY><STREAM/></BINARY></DATA>
        </TABLE></RESOURCE></VOTABLE>"#;
        let err = parse_votable_str(text).unwrap_err();
        assert!(matches!(err, VoTableError::Unsupported(ref name) if name == "BINARY"));
    }

    #[test]
    fn rejects_ragged_rows() {
        let text = r#"<VOTABLE><RESOURCE><TABLE>
          <FIELD name="x" datatype="int"/>
          <FIELD name="y" datatype="int"/>
          <DATA><TABLEDATA><TR><TD>1</TD></TR></TABLEDATA></DATA>
        </TABLE></RESOURCE></VOTABLE>"#;
        let err = parse_votable_str(text).unwrap_err();
        assert!(matches!(
            err,
            VoTableError::CellCountMismatch {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn rejects_unparseable_cells() {
        let text = r#"<VOTABLE><RESOURCE><TABLE>
          <FIELD name="x" datatype="int"/>
          <DATA><TABLEDATA><TR><TD>abc</TD></TR></TABLEDATA></DATA>
        </TABLE></RESOURCE></VOTABLE>"#;
        assert!(matches!(
            parse_votable_str(text).unwrap_err(),
            VoTableError::CellParse { .. }
        ));
    }

    #[test]
    fn nan_parses_as_double() {
        let text = r#"<VOTABLE><RESOURCE><TABLE>
          <FIELD name="x" datatype="double"/>
          <DATA><TABLEDATA><TR><TD>NaN</TD></TR></TABLEDATA></DATA>
        </TABLE></RESOURCE></VOTABLE>"#;
        let vot = parse_votable_str(text).unwrap();
        let value = vot.first_table().unwrap().value(0, 0);
        assert!(value.as_double().unwrap().is_nan());
    }

    #[test]
    fn datalink_service_descriptor_groups() {
        let text = r#"<VOTABLE>
          <RESOURCE type="meta" utype="adhoc:service">
            <PARAM name="accessURL" datatype="char" arraysize="*" value="http://example.org/soda"/>
            <GROUP name="inputParams">
              <PARAM name="ID" datatype="char" arraysize="*" value=""/>
              <PARAM name="CIRCLE" datatype="double" arraysize="3" value=""/>
            </GROUP>
          </RESOURCE>
        </VOTABLE>"#;
        let vot = parse_votable_str(text).unwrap();
        let resource = vot.resources().first().unwrap();
        assert_eq!(resource.param("accessURL").unwrap().value(), "http://example.org/soda");
        let group = resource.group("inputParams").unwrap();
        assert_eq!(group.params().len(), 2);
        assert_eq!(group.params()[1].name(), "CIRCLE");
    }
}
