//! Owned XML element tree
//!
//! The source document is read into this tree once, and the target documents
//! are assembled in it before serialization. Names are kept in expanded form
//! so lookups never depend on the prefixes a producer happened to choose.

use crate::error::{Error, Result};
use crate::qname::QName;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

/// Default buffer capacity for XML parsing (4KB)
const XML_BUFFER_CAPACITY: usize = 4096;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// An XML element with its attributes, text and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Expanded element name
    pub name: QName,
    /// Attributes in document order, namespace declarations excluded
    pub attributes: Vec<(QName, String)>,
    /// Character content; leaf text is kept verbatim
    pub text: Option<String>,
    /// Child elements in document order
    pub children: Vec<Element>,
}

impl Element {
    /// Create an empty element
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, name: QName, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder-style text setter
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder-style child append
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Set an attribute, replacing an existing one of the same name
    pub fn set_attribute(&mut self, name: QName, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Append a child and return a mutable reference to it
    pub fn push(&mut self, child: Element) -> &mut Element {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Look up an attribute value
    pub fn attribute(&self, name: &QName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over the direct children with the given name
    pub fn children_named<'a, 'b>(
        &'a self,
        name: &'b QName,
    ) -> impl Iterator<Item = &'a Element> + use<'a, 'b> {
        self.children.iter().filter(move |c| c.name == *name)
    }

    /// Find the first descendant reached by following `path`
    ///
    /// Every step matches direct children by name. As with ElementPath, all
    /// branches are explored, so `a/b` finds a `b` below the second `a` when
    /// the first `a` has none.
    pub fn find(&self, path: &[QName]) -> Option<&Element> {
        let Some((step, rest)) = path.split_first() else {
            return Some(self);
        };
        self.children_named(step).find_map(|child| child.find(rest))
    }

    /// Text content, or `None` when missing or blank
    pub fn value(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Check whether the element has neither text nor children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.text.as_deref().is_none_or(str::is_empty)
    }
}

/// Parse a complete document and return its root element
///
/// Namespace prefixes are resolved while reading, so the returned tree only
/// contains expanded names. DTD declarations are rejected.
pub fn parse_document(bytes: &[u8]) -> Result<Element> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::with_capacity(XML_BUFFER_CAPACITY);

    let mut scopes = NamespaceScopes::default();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                if root.is_some() {
                    return Err(Error::MalformedSource(
                        "Content after the root element".to_string(),
                    ));
                }
                let element = open_element(e, &mut scopes)?;
                stack.push(element);
            }
            Event::Empty(ref e) => {
                if root.is_some() {
                    return Err(Error::MalformedSource(
                        "Content after the root element".to_string(),
                    ));
                }
                let element = open_element(e, &mut scopes)?;
                scopes.pop();
                close_element(element, &mut stack, &mut root);
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    Error::MalformedSource("Unexpected closing tag".to_string())
                })?;
                scopes.pop();
                close_element(element, &mut stack, &mut root);
            }
            Event::Text(ref t) => {
                if let Some(current) = stack.last_mut() {
                    // Entity references arrive as separate events
                    let text = t
                        .decode()
                        .map_err(|e| Error::MalformedSource(e.to_string()))?;
                    append_text(current, &text);
                }
            }
            Event::CData(ref c) => {
                if let Some(current) = stack.last_mut() {
                    let text = std::str::from_utf8(c)
                        .map_err(|e| Error::MalformedSource(e.to_string()))?;
                    append_text(current, text);
                }
            }
            Event::GeneralRef(ref r) => {
                if let Some(current) = stack.last_mut() {
                    let resolved = match r
                        .resolve_char_ref()
                        .map_err(|e| Error::MalformedSource(e.to_string()))?
                    {
                        Some(ch) => ch.to_string(),
                        None => {
                            let name = r
                                .decode()
                                .map_err(|e| Error::MalformedSource(e.to_string()))?;
                            quick_xml::escape::resolve_predefined_entity(&name)
                                .ok_or_else(|| {
                                    Error::MalformedSource(format!(
                                        "Unknown entity reference '&{};'",
                                        name
                                    ))
                                })?
                                .to_string()
                        }
                    };
                    append_text(current, &resolved);
                }
            }
            Event::DocType(_) => {
                return Err(Error::MalformedSource(
                    "DTD declarations are not allowed".to_string(),
                ));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(Error::MalformedSource(
            "Unexpected end of document inside an element".to_string(),
        ));
    }
    root.ok_or_else(|| Error::MalformedSource("Document has no root element".to_string()))
}

/// Namespace bindings of the currently open elements, innermost last
#[derive(Default)]
struct NamespaceScopes {
    frames: Vec<HashMap<String, String>>,
}

impl NamespaceScopes {
    fn push(&mut self, frame: HashMap<String, String>) {
        self.frames.push(frame);
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn lookup(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(prefix))
            .map(String::as_str)
            .filter(|uri| !uri.is_empty())
    }
}

fn open_element(e: &BytesStart, scopes: &mut NamespaceScopes) -> Result<Element> {
    let mut declarations = HashMap::new();
    let mut raw_attributes = Vec::new();

    for attr in e.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::MalformedSource(e.to_string()))?;
        let raw = std::str::from_utf8(&attr.value)
            .map_err(|e| Error::MalformedSource(e.to_string()))?;
        let value = quick_xml::escape::unescape(raw)
            .map_err(|e| Error::MalformedSource(e.to_string()))?
            .into_owned();

        if key == "xmlns" {
            declarations.insert(String::new(), value);
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            declarations.insert(prefix.to_string(), value);
        } else {
            raw_attributes.push((key.to_string(), value));
        }
    }
    scopes.push(declarations);

    let tag = std::str::from_utf8(e.name().as_ref())
        .map_err(|e| Error::MalformedSource(e.to_string()))?
        .to_string();
    let name = match tag.split_once(':') {
        Some((prefix, local)) => QName::new(bound_namespace(scopes, prefix, &tag)?, local),
        None => match scopes.lookup("") {
            Some(uri) => QName::new(uri, tag.as_str()),
            None => QName::local(tag.as_str()),
        },
    };

    let mut element = Element::new(name);
    for (key, value) in raw_attributes {
        // Unprefixed attributes are in no namespace, default declarations do not apply
        let attr_name = match key.split_once(':') {
            Some((prefix, local)) => QName::new(bound_namespace(scopes, prefix, &key)?, local),
            None => QName::local(key),
        };
        element.attributes.push((attr_name, value));
    }
    Ok(element)
}

fn bound_namespace(scopes: &NamespaceScopes, prefix: &str, name: &str) -> Result<String> {
    scopes.lookup(prefix).map(str::to_string).ok_or_else(|| {
        Error::MalformedSource(format!("Unbound namespace prefix '{}' in '{}'", prefix, name))
    })
}

fn append_text(element: &mut Element, text: &str) {
    match element.text {
        Some(ref mut existing) => existing.push_str(text),
        None => element.text = Some(text.to_string()),
    }
}

fn close_element(mut element: Element, stack: &mut [Element], root: &mut Option<Element>) {
    // Indentation between child elements is not content
    if !element.children.is_empty() && element.value().is_none() {
        element.text = None;
    }
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}
