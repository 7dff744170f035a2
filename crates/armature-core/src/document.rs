//! Arena-backed XML document
//!
//! Robot descriptions are edited as a tree of nodes stored in a flat arena
//! and addressed by [`NodeId`]. Every node keeps an explicit parent index so
//! ancestor queries never need back-pointers.
//!
//! Markup that is never touched by an edit is written back verbatim: start
//! tags keep their original attribute quoting and spacing, and text,
//! comments, CDATA sections and declarations are stored in their raw
//! (still escaped) form. Only elements whose attributes were changed, or
//! elements created by an edit, are re-rendered.

use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("XML syntax error: {0}")]
    Syntax(String),
    #[error("Invalid UTF-8 in {0}")]
    Encoding(&'static str),
    #[error("Unclosed element <{0}>")]
    Unclosed(String),
    #[error("Unexpected closing tag </{0}>")]
    UnexpectedClose(String),
    #[error("Document has no root element")]
    NoRootElement,
}

/// Index of a node inside an [`XmlDocument`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A single attribute on an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// Unescaped attribute value
    pub value: String,
    /// Value exactly as it appeared in the source, if unchanged
    raw: Option<String>,
}

/// Element payload of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<Attribute>,
    /// Source text between `<` and `>` (or `/>`), cleared once edited
    raw_tag: Option<String>,
    self_closing: bool,
}

impl Element {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
            raw_tag: None,
            self_closing: true,
        }
    }

    fn from_start(start: &BytesStart<'_>, self_closing: bool) -> Result<Self, DocumentError> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|_| DocumentError::Encoding("element name"))?
            .to_string();
        let raw_tag = std::str::from_utf8(start)
            .map_err(|_| DocumentError::Encoding("start tag"))?
            .to_string();

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| DocumentError::Syntax(e.to_string()))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|_| DocumentError::Encoding("attribute name"))?
                .to_string();
            let raw = std::str::from_utf8(&attr.value)
                .map_err(|_| DocumentError::Encoding("attribute value"))?
                .to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| DocumentError::Syntax(e.to_string()))?
                .into_owned();
            attributes.push(Attribute {
                name: key,
                value,
                raw: Some(raw),
            });
        }

        Ok(Self {
            name,
            attributes,
            raw_tag: Some(raw_tag),
            self_closing,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        if let Some(attr) = self.attributes.iter_mut().find(|a| a.name == name) {
            if attr.value == value {
                return;
            }
            attr.value = value.to_string();
            attr.raw = None;
        } else {
            self.attributes.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
                raw: None,
            });
        }
        self.raw_tag = None;
    }

    fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|a| a.name == name)?;
        self.raw_tag = None;
        Some(self.attributes.remove(pos).value)
    }
}

/// Content of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    /// Character data in escaped form
    Text(String),
    Comment(String),
    CData(String),
    /// Body of the `<?xml ...?>` declaration
    Declaration(String),
    /// Body of a `<?target ...?>` processing instruction
    ProcessingInstruction(String),
    DocType(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// XML document stored as an arena of nodes
#[derive(Debug, Clone, Default)]
pub struct XmlDocument {
    nodes: Vec<Node>,
    /// Top-level nodes in document order
    top: Vec<NodeId>,
}

impl XmlDocument {
    /// Parse a document from text
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let mut doc = Self::default();
        let mut reader = Reader::from_str(text);
        let mut stack: Vec<NodeId> = Vec::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|e| DocumentError::Syntax(e.to_string()))?;
            let parent = stack.last().copied();

            match event {
                Event::Start(e) => {
                    let element = Element::from_start(&e, false)?;
                    let id = doc.push(NodeKind::Element(element), parent);
                    stack.push(id);
                }
                Event::Empty(e) => {
                    let element = Element::from_start(&e, true)?;
                    doc.push(NodeKind::Element(element), parent);
                }
                Event::End(e) => {
                    if stack.pop().is_none() {
                        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        return Err(DocumentError::UnexpectedClose(name));
                    }
                }
                Event::Text(e) => {
                    let raw = raw_str(&e, "text")?;
                    doc.push(NodeKind::Text(raw), parent);
                }
                Event::CData(e) => {
                    let raw = raw_str(&e, "CDATA section")?;
                    doc.push(NodeKind::CData(raw), parent);
                }
                Event::Comment(e) => {
                    let raw = raw_str(&e, "comment")?;
                    doc.push(NodeKind::Comment(raw), parent);
                }
                Event::Decl(e) => {
                    let raw = raw_str(&e, "declaration")?;
                    doc.push(NodeKind::Declaration(raw), parent);
                }
                Event::PI(e) => {
                    let raw = raw_str(&e, "processing instruction")?;
                    doc.push(NodeKind::ProcessingInstruction(raw), parent);
                }
                Event::DocType(e) => {
                    let raw = raw_str(&e, "doctype")?;
                    doc.push(NodeKind::DocType(raw), parent);
                }
                Event::Eof => break,
            }
        }

        if let Some(open) = stack.last() {
            let name = doc.name(*open).unwrap_or_default().to_string();
            return Err(DocumentError::Unclosed(name));
        }
        if doc.root_element().is_none() {
            return Err(DocumentError::NoRootElement);
        }

        Ok(doc)
    }

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = self.alloc(kind);
        match parent {
            Some(p) => {
                self.nodes[id.0].parent = Some(p);
                self.nodes[p.0].children.push(id);
            }
            None => self.top.push(id),
        }
        id
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// First top-level element
    pub fn root_element(&self) -> Option<NodeId> {
        self.top.iter().copied().find(|id| self.is_element(*id))
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id)? {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind)? {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// Element name, `None` for non-element nodes
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.name())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attribute(name)
    }

    /// Set (or add) an attribute. Returns false if `id` is not an element.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> bool {
        match self.element_mut(id) {
            Some(el) => {
                el.set_attribute(name, value);
                true
            }
            None => false,
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id)?.remove_attribute(name)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    /// Element children of `id` in document order
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.is_element(*c))
    }

    /// First direct child element with the given name
    pub fn first_child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.child_elements(id)
            .find(|c| self.name(*c) == Some(name))
    }

    /// All attached elements in document (pre-)order
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.top.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if self.is_element(id) {
                out.push(id);
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// First element with the given name in document order
    pub fn find_element(&self, name: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|id| self.name(*id) == Some(name))
    }

    /// All elements with the given name in document order
    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.elements()
            .into_iter()
            .filter(move |id| self.name(*id) == Some(name))
    }

    /// Raw text of a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(t) => Some(t),
            _ => None,
        }
    }

    /// True for text nodes made only of whitespace
    pub fn is_whitespace(&self, id: NodeId) -> bool {
        self.text(id)
            .map(|t| t.chars().all(char::is_whitespace))
            .unwrap_or(false)
    }

    /// Create a detached element. Attach it with [`append_child`](Self::append_child)
    /// or [`insert_before`](Self::insert_before).
    pub fn create_element(&mut self, name: &str, attributes: &[(&str, &str)]) -> NodeId {
        let mut element = Element::new(name);
        for (key, value) in attributes {
            element.set_attribute(key, value);
        }
        self.alloc(NodeKind::Element(element))
    }

    /// Create a detached text node from unescaped text
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(partial_escape(text).into_owned()))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.open_element(parent);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `child` into `parent` right before `reference`. Falls back to
    /// appending if `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.detach(child);
        let Some(pos) = self.nodes[parent.0].children.iter().position(|c| *c == reference) else {
            self.append_child(parent, child);
            return;
        };
        self.open_element(parent);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(pos, child);
    }

    /// Detach a node from its parent. The node stays in the arena but is no
    /// longer part of the serialized document.
    pub fn detach(&mut self, id: NodeId) {
        match self.nodes[id.0].parent.take() {
            Some(p) => self.nodes[p.0].children.retain(|c| *c != id),
            None => self.top.retain(|c| *c != id),
        }
    }

    /// A self-closing element gains an explicit end tag once it has children
    fn open_element(&mut self, id: NodeId) {
        if let Some(el) = self.element_mut(id) {
            if el.self_closing {
                el.self_closing = false;
                if let Some(raw) = el.raw_tag.as_mut() {
                    let trimmed = raw.trim_end().len();
                    raw.truncate(trimmed);
                }
            }
        }
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = match self.parent(id) {
            Some(p) => self.children(p),
            None => self.top.as_slice(),
        };
        let pos = siblings.iter().position(|c| *c == id)?;
        pos.checked_sub(1).map(|i| siblings[i])
    }

    /// Indentation of the line an element starts on, taken from the
    /// whitespace text node right before it. `None` if the element does not
    /// start its own line.
    pub fn indentation_of(&self, id: NodeId) -> Option<String> {
        let prev = self.previous_sibling(id)?;
        if !self.is_whitespace(prev) {
            return None;
        }
        let text = self.text(prev)?;
        let idx = text.rfind('\n')?;
        Some(text[idx + 1..].to_string())
    }

    /// Trailing whitespace-only text child that holds the closing tag's
    /// indentation
    pub fn closing_whitespace(&self, id: NodeId) -> Option<NodeId> {
        let last = *self.children(id).last()?;
        (self.is_whitespace(last) && self.text(last)?.contains('\n')).then_some(last)
    }

    /// Serialize back to text
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        for id in &self.top {
            self.write_node(*id, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::Element(el) => {
                out.push('<');
                match &el.raw_tag {
                    Some(raw) => out.push_str(raw),
                    None => write_tag(el, out),
                }
                if el.self_closing && node.children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for child in &node.children {
                    self.write_node(*child, out);
                }
                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            }
            NodeKind::Text(raw) => out.push_str(raw),
            NodeKind::Comment(raw) => {
                out.push_str("<!--");
                out.push_str(raw);
                out.push_str("-->");
            }
            NodeKind::CData(raw) => {
                out.push_str("<![CDATA[");
                out.push_str(raw);
                out.push_str("]]>");
            }
            NodeKind::Declaration(raw) | NodeKind::ProcessingInstruction(raw) => {
                out.push_str("<?");
                out.push_str(raw);
                out.push_str("?>");
            }
            NodeKind::DocType(raw) => {
                out.push_str("<!DOCTYPE");
                if !raw.starts_with(char::is_whitespace) {
                    out.push(' ');
                }
                out.push_str(raw);
                out.push('>');
            }
        }
    }
}

fn write_tag(el: &Element, out: &mut String) {
    out.push_str(&el.name);
    for attr in &el.attributes {
        out.push(' ');
        out.push_str(&attr.name);
        out.push('=');
        match &attr.raw {
            Some(raw) if raw.contains('"') => {
                out.push('\'');
                out.push_str(raw);
                out.push('\'');
            }
            Some(raw) => {
                out.push('"');
                out.push_str(raw);
                out.push('"');
            }
            None => {
                out.push('"');
                out.push_str(&escape(attr.value.as_str()));
                out.push('"');
            }
        }
    }
}

fn raw_str(bytes: &[u8], what: &'static str) -> Result<String, DocumentError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| DocumentError::Encoding(what))
}
