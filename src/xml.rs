//! Owned, mutable XML tree used for every document part and service reply.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Removing a node only
//! unlinks it from its parent; unlinked nodes are never visited again and are not
//! serialized.

use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{ConvertError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XmlNode {
    Document,
    Decl {
        version: String,
        encoding: Option<String>,
        standalone: Option<String>,
    },
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    CData(String),
    Comment(String),
    PI(String),
    DocType(String),
}

#[derive(Clone, Debug)]
struct Slot {
    node: XmlNode,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct XmlTree {
    part_name: String,
    slots: Vec<Slot>,
    root: NodeId,
}

impl XmlTree {
    pub fn parse(part_name: &str, xml_bytes: &[u8]) -> Result<Self> {
        let malformed = |message: String| ConvertError::MalformedXml {
            part: part_name.to_string(),
            message,
        };

        let mut reader = Reader::from_reader(xml_bytes);
        reader.config_mut().trim_text(false);

        let mut slots = vec![Slot {
            node: XmlNode::Document,
            parent: None,
            children: Vec::new(),
        }];
        let mut stack: Vec<NodeId> = vec![NodeId(0)];
        let mut root: Option<NodeId> = None;

        let mut buf = Vec::new();
        loop {
            buf.clear();
            let ev = reader
                .read_event_into(&mut buf)
                .map_err(|e| malformed(format!("at byte {}: {e}", reader.buffer_position())))?;
            let parent = stack.last().copied().unwrap_or(NodeId(0));
            let at_top = stack.len() == 1;
            match ev {
                Event::Eof => break,
                Event::Decl(d) => {
                    let version = bytes_to_string(
                        d.version().map_err(|e| malformed(format!("decl version: {e}")))?,
                    );
                    let encoding = d
                        .encoding()
                        .map(|r| r.map(bytes_to_string))
                        .transpose()
                        .unwrap_or(None);
                    let standalone = d
                        .standalone()
                        .map(|r| r.map(bytes_to_string))
                        .transpose()
                        .unwrap_or(None);
                    push_node(
                        &mut slots,
                        parent,
                        XmlNode::Decl {
                            version,
                            encoding,
                            standalone,
                        },
                    );
                }
                Event::Start(s) => {
                    if at_top && root.is_some() {
                        return Err(malformed("more than one root element".to_string()));
                    }
                    let node = XmlNode::Element {
                        name: bytes_to_string(s.name().as_ref()),
                        attrs: collect_attrs(&s).map_err(malformed)?,
                    };
                    let id = push_node(&mut slots, parent, node);
                    if at_top {
                        root = Some(id);
                    }
                    stack.push(id);
                }
                Event::End(e) => {
                    if at_top {
                        return Err(malformed(format!(
                            "unexpected end tag </{}>",
                            bytes_to_string(e.name().as_ref())
                        )));
                    }
                    stack.pop();
                }
                Event::Empty(s) => {
                    if at_top && root.is_some() {
                        return Err(malformed("more than one root element".to_string()));
                    }
                    let node = XmlNode::Element {
                        name: bytes_to_string(s.name().as_ref()),
                        attrs: collect_attrs(&s).map_err(malformed)?,
                    };
                    let id = push_node(&mut slots, parent, node);
                    if at_top {
                        root = Some(id);
                    }
                }
                Event::Text(t) => {
                    let text = t
                        .unescape()
                        .map_err(|e| malformed(format!("unescape text: {e}")))?
                        .into_owned();
                    if at_top && !text.trim().is_empty() {
                        return Err(malformed("text outside the root element".to_string()));
                    }
                    push_node(&mut slots, parent, XmlNode::Text(text));
                }
                Event::CData(t) => {
                    push_node(&mut slots, parent, XmlNode::CData(bytes_to_string(t.into_inner())));
                }
                Event::Comment(t) => {
                    push_node(&mut slots, parent, XmlNode::Comment(bytes_to_string(t.into_inner())));
                }
                Event::PI(t) => {
                    let content = format!(
                        "{}{}",
                        bytes_to_string(t.target()),
                        bytes_to_string(t.content())
                    );
                    push_node(&mut slots, parent, XmlNode::PI(content));
                }
                Event::DocType(t) => {
                    push_node(&mut slots, parent, XmlNode::DocType(bytes_to_string(t.into_inner())));
                }
            }
        }

        if stack.len() > 1 {
            let open = stack
                .last()
                .and_then(|id| match &slots[id.0].node {
                    XmlNode::Element { name, .. } => Some(name.clone()),
                    _ => None,
                })
                .unwrap_or_default();
            return Err(malformed(format!("unclosed element <{open}>")));
        }
        let root = root.ok_or_else(|| malformed("no root element".to_string()))?;

        Ok(Self {
            part_name: part_name.to_string(),
            slots,
            root,
        })
    }

    pub fn part_name(&self) -> &str {
        &self.part_name
    }

    pub fn document(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &XmlNode {
        &self.slots[id.0].node
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slots[id.0].children
    }

    /// Qualified element name (`prefix:local`), `None` for non-element nodes.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.slots[id.0].node {
            XmlNode::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId, name: &str) -> bool {
        self.name(id) == Some(name)
    }

    /// Unescaped attribute value.
    pub fn attr(&self, id: NodeId, key: &str) -> Option<String> {
        let XmlNode::Element { attrs, .. } = &self.slots[id.0].node else {
            return None;
        };
        attrs.iter().find(|(k, _)| k == key).map(|(_, raw)| {
            unescape(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.clone())
        })
    }

    pub fn has_attr_value(&self, id: NodeId, key: &str, value: &str) -> bool {
        self.attr(id, key).as_deref() == Some(value)
    }

    /// Sets (or appends) an attribute; `value` is escaped on the way in.
    pub fn set_attr(&mut self, id: NodeId, key: &str, value: &str) {
        let XmlNode::Element { attrs, .. } = &mut self.slots[id.0].node else {
            return;
        };
        let raw = escape(value).into_owned();
        for (k, v) in attrs.iter_mut() {
            if k == key {
                *v = raw;
                return;
            }
        }
        attrs.push((key.to_string(), raw));
    }

    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.slots[id.0]
            .children
            .iter()
            .copied()
            .filter(|c| self.name(*c).is_some())
    }

    pub fn first_child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.child_elements(id).find(|c| self.is_element(*c, name))
    }

    pub fn children_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.child_elements(id)
            .filter(|c| self.is_element(*c, name))
            .collect()
    }

    /// Every node below `id` in document order, `id` itself excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(cur) = pending.pop() {
            out.push(cur);
            pending.extend(self.children(cur).iter().rev().copied());
        }
        out
    }

    /// Elements anywhere in the document with the given name and attribute value.
    pub fn find_elements(&self, name: &str, key: &str, value: &str) -> Vec<NodeId> {
        self.descendants(self.document())
            .into_iter()
            .filter(|id| self.is_element(*id, name) && self.has_attr_value(*id, key, value))
            .collect()
    }

    /// All elements reached by an absolute child path starting at the root element,
    /// e.g. `["office:document-meta", "office:meta", "dc:title"]`.
    pub fn elements_at_path(&self, path: &[&str]) -> Vec<NodeId> {
        let Some((first, rest)) = path.split_first() else {
            return Vec::new();
        };
        if !self.is_element(self.root, first) {
            return Vec::new();
        }
        let mut current = vec![self.root];
        for step in rest {
            current = current
                .into_iter()
                .flat_map(|id| self.children_named(id, step))
                .collect();
        }
        current
    }

    /// Concatenated text of all descendant text and CDATA nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for d in self.descendants(id) {
            match &self.slots[d.0].node {
                XmlNode::Text(t) | XmlNode::CData(t) => out.push_str(t),
                _ => {}
            }
        }
        out
    }

    pub fn remove_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.slots[id.0].children);
        for c in children {
            self.slots[c.0].parent = None;
        }
    }

    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.slots[id.0].parent.take() {
            self.slots[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Appends a new element; attribute values are escaped on the way in.
    pub fn append_element(&mut self, parent: NodeId, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), escape(*v).into_owned()))
            .collect();
        push_node(
            &mut self.slots,
            parent,
            XmlNode::Element {
                name: name.to_string(),
                attrs,
            },
        )
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        push_node(&mut self.slots, parent, XmlNode::Text(text.to_string()))
    }

    /// Declares `xmlns:prefix` on the root element unless it is already declared there.
    pub fn ensure_namespace(&mut self, prefix: &str, uri: &str) {
        let key = format!("xmlns:{prefix}");
        if self.attr(self.root, &key).is_none() {
            self.set_attr(self.root, &key, uri);
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        self.write_node(&mut out, self.document());
        out
    }

    fn write_node(&self, out: &mut Vec<u8>, id: NodeId) {
        let slot = &self.slots[id.0];
        match &slot.node {
            XmlNode::Document => {
                for c in &slot.children {
                    self.write_node(out, *c);
                }
            }
            XmlNode::Decl {
                version,
                encoding,
                standalone,
            } => {
                out.extend_from_slice(b"<?xml version=\"");
                out.extend_from_slice(version.as_bytes());
                out.extend_from_slice(b"\"");
                if let Some(e) = encoding {
                    out.extend_from_slice(b" encoding=\"");
                    out.extend_from_slice(e.as_bytes());
                    out.extend_from_slice(b"\"");
                }
                if let Some(s) = standalone {
                    out.extend_from_slice(b" standalone=\"");
                    out.extend_from_slice(s.as_bytes());
                    out.extend_from_slice(b"\"");
                }
                out.extend_from_slice(b"?>");
            }
            XmlNode::Element { name, attrs } => {
                let empty = slot.children.is_empty();
                write_start_like(out, name, attrs, empty);
                if !empty {
                    for c in &slot.children {
                        self.write_node(out, *c);
                    }
                    out.extend_from_slice(b"</");
                    out.extend_from_slice(name.as_bytes());
                    out.extend_from_slice(b">");
                }
            }
            XmlNode::Text(text) => escape_text_into(out, text),
            XmlNode::CData(text) => {
                out.extend_from_slice(b"<![CDATA[");
                out.extend_from_slice(text.as_bytes());
                out.extend_from_slice(b"]]>");
            }
            XmlNode::Comment(text) => {
                out.extend_from_slice(b"<!--");
                out.extend_from_slice(text.as_bytes());
                out.extend_from_slice(b"-->");
            }
            XmlNode::PI(content) => {
                out.extend_from_slice(b"<?");
                out.extend_from_slice(content.as_bytes());
                out.extend_from_slice(b"?>");
            }
            XmlNode::DocType(text) => {
                out.extend_from_slice(b"<!DOCTYPE ");
                out.extend_from_slice(text.trim_start().as_bytes());
                out.extend_from_slice(b">");
            }
        }
    }
}

fn push_node(slots: &mut Vec<Slot>, parent: NodeId, node: XmlNode) -> NodeId {
    let id = NodeId(slots.len());
    slots.push(Slot {
        node,
        parent: Some(parent),
        children: Vec::new(),
    });
    slots[parent.0].children.push(id);
    id
}

fn collect_attrs(s: &BytesStart<'_>) -> std::result::Result<Vec<(String, String)>, String> {
    let mut attrs: Vec<(String, String)> = Vec::new();
    for a in s.attributes() {
        let a = a.map_err(|e| format!("attribute: {e}"))?;
        // Raw (still escaped) bytes, so character references survive a rewrite unchanged.
        attrs.push((bytes_to_string(a.key.as_ref()), bytes_to_string(a.value.as_ref())));
    }
    Ok(attrs)
}

fn bytes_to_string(bytes: impl AsRef<[u8]>) -> String {
    String::from_utf8_lossy(bytes.as_ref()).into_owned()
}

fn escape_text_into(out: &mut Vec<u8>, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.extend_from_slice(b"&amp;"),
            '<' => out.extend_from_slice(b"&lt;"),
            '>' => out.extend_from_slice(b"&gt;"),
            _ => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
}

fn write_start_like(out: &mut Vec<u8>, name: &str, attrs: &[(String, String)], empty: bool) {
    out.extend_from_slice(b"<");
    out.extend_from_slice(name.as_bytes());
    for (k, v) in attrs {
        out.extend_from_slice(b" ");
        out.extend_from_slice(k.as_bytes());
        out.extend_from_slice(b"=\"");
        // Raw values from single-quoted attributes may hold a bare `"`.
        out.extend_from_slice(v.replace('"', "&quot;").as_bytes());
        out.extend_from_slice(b"\"");
    }
    if empty {
        out.extend_from_slice(b"/>");
    } else {
        out.extend_from_slice(b">");
    }
}
