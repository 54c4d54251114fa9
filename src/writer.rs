//! XML serialization of element trees
//!
//! Names are written with the prefixes registered in the document's
//! [`NamespaceTable`]; all registered namespaces are declared on the root
//! element. An empty prefix stands for the default namespace.

use crate::error::{Error, Result};
use crate::qname::{NamespaceTable, QName};
use crate::tree::Element;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write as IoWrite;

/// Write a complete document: XML declaration followed by `root`
///
/// Output is UTF-8; elements without text and children are self-closed.
pub fn write_document<W: IoWrite>(
    root: &Element,
    namespaces: &NamespaceTable,
    writer: W,
) -> Result<()> {
    let mut xml_writer = Writer::new_with_indent(writer, b' ', 2);

    xml_writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| Error::xml_write(format!("Failed to write XML declaration: {}", e)))?;

    write_element(&mut xml_writer, root, namespaces, true)?;

    xml_writer
        .get_mut()
        .write_all(b"\n")
        .map_err(Error::Io)?;
    Ok(())
}

fn write_element<W: IoWrite>(
    writer: &mut Writer<W>,
    element: &Element,
    namespaces: &NamespaceTable,
    is_root: bool,
) -> Result<()> {
    let tag = element_tag(&element.name, namespaces)?;
    let mut start = BytesStart::new(tag.as_str());

    if is_root {
        for (prefix, uri) in namespaces.iter() {
            let key = if prefix.is_empty() {
                "xmlns".to_string()
            } else {
                format!("xmlns:{}", prefix)
            };
            start.push_attribute((key.as_str(), uri));
        }
    }

    for (name, value) in &element.attributes {
        let key = attribute_key(name, namespaces)?;
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| Error::xml_write(format!("Failed to write element '{}': {}", tag, e)));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| Error::xml_write(format!("Failed to write element '{}': {}", tag, e)))?;

    if let Some(ref text) = element.text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| Error::xml_write(format!("Failed to write text of '{}': {}", tag, e)))?;
    }

    for child in &element.children {
        write_element(writer, child, namespaces, false)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(tag.as_str())))
        .map_err(|e| Error::xml_write(format!("Failed to close element '{}': {}", tag, e)))?;

    Ok(())
}

fn element_tag(name: &QName, namespaces: &NamespaceTable) -> Result<String> {
    match name.namespace {
        None => Ok(name.local.clone()),
        Some(ref uri) => match namespaces.prefix_for(uri) {
            Some("") => Ok(name.local.clone()),
            Some(prefix) => Ok(format!("{}:{}", prefix, name.local)),
            None => Err(Error::xml_write(format!(
                "No prefix registered for namespace of '{}'",
                name
            ))),
        },
    }
}

fn attribute_key(name: &QName, namespaces: &NamespaceTable) -> Result<String> {
    match name.namespace {
        None => Ok(name.local.clone()),
        Some(ref uri) => match namespaces.prefix_for(uri) {
            Some(prefix) if !prefix.is_empty() => Ok(format!("{}:{}", prefix, name.local)),
            _ => Err(Error::xml_write(format!(
                "No prefix registered for namespace of attribute '{}'",
                name
            ))),
        },
    }
}
