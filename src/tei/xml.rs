use std::path::Path;

use anyhow::{anyhow, Context};
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;

use crate::error::PipelineError;

/// Index into [`Document::nodes`]. Parent/child links are expressed as
/// indices so the tree stays mutation-friendly without reference cycles.
pub type NodeId = usize;

#[derive(Clone, Debug)]
pub struct Node {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    /// Text immediately inside the element, before any child.
    pub text: Option<String>,
    /// Text immediately after the element's end tag, before the next sibling.
    pub tail: Option<String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct XmlDecl {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

/// An in-memory TEI document: an arena of nodes rooted at `root`.
/// Detached nodes stay in the arena but are unreachable from the root.
#[derive(Clone, Debug)]
pub struct Document {
    pub decl: Option<XmlDecl>,
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    /// First direct child of `id` with the given tag.
    pub fn find_child(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].tag == tag)
    }

    /// All descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id].children.iter().rev().copied().collect();
        while let Some(cur) = stack.pop() {
            out.push(cur);
            for &c in self.nodes[cur].children.iter().rev() {
                stack.push(c);
            }
        }
        out
    }

    /// Descendants of `id` with the given tag, document order.
    pub fn descendants_with_tag(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.nodes[n].tag == tag)
            .collect()
    }

    /// The sibling immediately before `id` under its parent, if any.
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes[id].parent?;
        let siblings = &self.nodes[parent].children;
        let pos = siblings.iter().position(|&c| c == id)?;
        if pos == 0 {
            None
        } else {
            Some(siblings[pos - 1])
        }
    }

    /// Unlink `id` (and thereby its subtree) from its parent. The node
    /// remains in the arena as an unreachable tombstone.
    pub fn detach(&mut self, id: NodeId) -> Result<(), PipelineError> {
        let parent = self.nodes[id].parent.ok_or_else(|| {
            PipelineError::OrphanNode(format!("<{}> has no parent", self.nodes[id].tag))
        })?;
        self.nodes[parent].children.retain(|&c| c != id);
        self.nodes[id].parent = None;
        Ok(())
    }

    /// Flatten `id` to plain text: its leading text, then each child's
    /// flattened form followed by the child's trailing text. The flattened
    /// node's own tail is not included.
    pub fn flatten(&self, id: NodeId) -> String {
        let mut buf = String::new();
        self.flatten_into(id, &mut buf);
        buf
    }

    fn flatten_into(&self, id: NodeId, buf: &mut String) {
        if let Some(t) = self.nodes[id].text.as_deref() {
            buf.push_str(t);
        }
        for &child in &self.nodes[id].children {
            self.flatten_into(child, buf);
            if let Some(t) = self.nodes[child].tail.as_deref() {
                buf.push_str(t);
            }
        }
    }
}

pub fn load_file(path: &Path) -> anyhow::Result<Document> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read source file: {}", path.display()))?;
    parse_document(&bytes).with_context(|| format!("parse xml: {}", path.display()))
}

pub fn parse_document(xml_bytes: &[u8]) -> anyhow::Result<Document> {
    let mut reader = Reader::from_reader(xml_bytes);
    reader.config_mut().trim_text(false);

    let mut nodes: Vec<Node> = Vec::new();
    let mut stack: Vec<NodeId> = Vec::new();
    let mut decl: Option<XmlDecl> = None;
    let mut root: Option<NodeId> = None;

    let mut buf = Vec::new();
    loop {
        buf.clear();
        let ev = reader.read_event_into(&mut buf).map_err(|e| {
            anyhow!(PipelineError::MalformedInput(format!("xml parse error: {e}")))
        })?;
        match ev {
            Event::Eof => break,
            Event::Decl(d) => {
                let version = bytes_to_string(d.version().context("decl version")?);
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
                decl = Some(XmlDecl {
                    version,
                    encoding,
                    standalone,
                });
            }
            Event::Start(s) => {
                let id = push_node(&mut nodes, &stack, &mut root, &s)?;
                stack.push(id);
            }
            Event::Empty(s) => {
                push_node(&mut nodes, &stack, &mut root, &s)?;
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(t) => {
                let txt = t.unescape().context("unescape text")?.into_owned();
                append_text(&mut nodes, &stack, &txt);
            }
            Event::CData(t) => {
                let txt = bytes_to_string(t.into_inner());
                append_text(&mut nodes, &stack, &txt);
            }
            // Comments, PIs, doctypes are not part of the document model.
            _ => {}
        }
    }

    let root = root.ok_or_else(|| {
        anyhow!(PipelineError::MalformedInput(
            "document has no root element".to_string()
        ))
    })?;
    Ok(Document { decl, nodes, root })
}

fn push_node(
    nodes: &mut Vec<Node>,
    stack: &[NodeId],
    root: &mut Option<NodeId>,
    s: &BytesStart<'_>,
) -> anyhow::Result<NodeId> {
    let id = nodes.len();
    let parent = stack.last().copied();
    nodes.push(Node {
        tag: bytes_to_string(s.name().as_ref()),
        attrs: collect_attrs(s)?,
        text: None,
        tail: None,
        parent,
        children: Vec::new(),
    });
    match parent {
        Some(p) => nodes[p].children.push(id),
        None => {
            if root.is_some() {
                return Err(anyhow!(PipelineError::MalformedInput(
                    "multiple root elements".to_string()
                )));
            }
            *root = Some(id);
        }
    }
    Ok(id)
}

/// Character data attaches to the leading-text slot of the innermost open
/// element when it has no children yet, otherwise to the trailing-text slot
/// of its last child. Text outside the root element is dropped.
fn append_text(nodes: &mut [Node], stack: &[NodeId], txt: &str) {
    let Some(&top) = stack.last() else {
        return;
    };
    let slot = match nodes[top].children.last().copied() {
        Some(last) => &mut nodes[last].tail,
        None => &mut nodes[top].text,
    };
    match slot {
        Some(existing) => existing.push_str(txt),
        None => *slot = Some(txt.to_string()),
    }
}

fn collect_attrs(s: &BytesStart<'_>) -> anyhow::Result<Vec<(String, String)>> {
    let mut attrs: Vec<(String, String)> = Vec::new();
    for a in s.attributes() {
        let a = a.context("attr")?;
        let key = bytes_to_string(a.key.as_ref());
        // Keep raw (already-escaped) attribute bytes so re-serialization
        // writes them back unchanged.
        let val = bytes_to_string(a.value.as_ref());
        attrs.push((key, val));
    }
    Ok(attrs)
}

fn bytes_to_string(bytes: impl AsRef<[u8]>) -> String {
    String::from_utf8_lossy(bytes.as_ref()).into_owned()
}

pub fn serialize_document(doc: &Document) -> anyhow::Result<Vec<u8>> {
    let mut out: Vec<u8> = Vec::new();

    if let Some(decl) = doc.decl.as_ref() {
        let d = BytesDecl::new(
            decl.version.as_str(),
            decl.encoding.as_deref(),
            decl.standalone.as_deref(),
        );
        let mut writer = quick_xml::Writer::new(Vec::new());
        writer.write_event(Event::Decl(d)).context("write decl")?;
        out.extend_from_slice(&writer.into_inner());
        out.push(b'\n');
    }

    write_node(doc, doc.root(), &mut out);
    Ok(out)
}

fn write_node(doc: &Document, id: NodeId, out: &mut Vec<u8>) {
    let node = doc.node(id);
    out.push(b'<');
    out.extend_from_slice(node.tag.as_bytes());
    // Attribute values are stored as raw (already-escaped) XML bytes.
    // Do NOT escape again.
    for (k, v) in &node.attrs {
        out.push(b' ');
        out.extend_from_slice(k.as_bytes());
        out.extend_from_slice(b"=\"");
        out.extend_from_slice(v.as_bytes());
        out.push(b'"');
    }
    if node.text.is_none() && node.children.is_empty() {
        out.extend_from_slice(b"/>");
        return;
    }
    out.push(b'>');

    if let Some(t) = node.text.as_deref() {
        escape_text_into(out, t);
    }
    for &child in &node.children {
        write_node(doc, child, out);
        if let Some(t) = doc.node(child).tail.as_deref() {
            escape_text_into(out, t);
        }
    }

    out.extend_from_slice(b"</");
    out.extend_from_slice(node.tag.as_bytes());
    out.push(b'>');
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

#[cfg(test)]
mod tests {
    use super::{parse_document, serialize_document};

    const SAMPLE: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<TEI><teiHeader/><text><p>Der Hund<lb/>bellt.</p></text></TEI>"#;

    #[test]
    fn parse_builds_text_and_tail_slots() {
        let doc = parse_document(SAMPLE).expect("parse");
        let root = doc.root();
        assert_eq!(doc.node(root).tag, "TEI");

        let text = doc.find_child(root, "text").expect("text container");
        let p = doc.find_child(text, "p").expect("paragraph");
        assert_eq!(doc.node(p).text.as_deref(), Some("Der Hund"));

        let lb = doc.find_child(p, "lb").expect("lb");
        assert_eq!(doc.node(lb).text, None);
        assert_eq!(doc.node(lb).tail.as_deref(), Some("bellt."));
    }

    #[test]
    fn flatten_concatenates_in_document_order() {
        let doc = parse_document(SAMPLE).expect("parse");
        let text = doc.find_child(doc.root(), "text").expect("text");
        let p = doc.find_child(text, "p").expect("p");
        assert_eq!(doc.flatten(p), "Der Hundbellt.");
    }

    #[test]
    fn serialize_round_trips_structure() {
        let doc = parse_document(SAMPLE).expect("parse");
        let bytes = serialize_document(&doc).expect("serialize");
        let s = String::from_utf8(bytes).expect("utf8");
        assert!(s.contains("<teiHeader/>"));
        assert!(s.contains("<p>Der Hund<lb/>bellt.</p>"));
    }

    #[test]
    fn text_entities_are_unescaped_and_reescaped() {
        let doc = parse_document(b"<TEI><text><p>a &amp; b</p></text></TEI>").expect("parse");
        let text = doc.find_child(doc.root(), "text").expect("text");
        let p = doc.find_child(text, "p").expect("p");
        assert_eq!(doc.node(p).text.as_deref(), Some("a & b"));

        let bytes = serialize_document(&doc).expect("serialize");
        assert!(String::from_utf8(bytes).expect("utf8").contains("a &amp; b"));
    }

    #[test]
    fn missing_root_is_malformed() {
        assert!(parse_document(b"  ").is_err());
    }

    #[test]
    fn detach_removes_subtree_from_iteration() {
        let mut doc =
            parse_document(b"<TEI><text><p>a<note>n</note>b</p></text></TEI>").expect("parse");
        let text = doc.find_child(doc.root(), "text").expect("text");
        let note = doc.descendants_with_tag(text, "note")[0];
        doc.detach(note).expect("detach");
        assert!(doc.descendants_with_tag(text, "note").is_empty());
    }
}
