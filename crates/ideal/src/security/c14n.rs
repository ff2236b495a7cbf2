//! Exclusive XML Canonicalization 1.0, without comments.
//!
//! Only element subtrees are canonicalized; that is all the signature profile
//! ever needs (`SignedInfo`). A namespace declaration is rendered on an element
//! when its prefix is visibly utilized there (element name or attribute name)
//! and the nearest rendered ancestor did not already bind it to the same URI.

use std::collections::{BTreeMap, BTreeSet};

use roxmltree::{Document, Node, NodeType};

use crate::error::{IdealError, Result};

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Parse `xml` and canonicalize its root element.
pub fn canonicalize_str(xml: &str) -> Result<Vec<u8>> {
    let doc = Document::parse(xml)?;
    canonicalize(doc.root_element())
}

/// Canonicalize the subtree rooted at `node`, which must be an element.
pub fn canonicalize(node: Node<'_, '_>) -> Result<Vec<u8>> {
    if !node.is_element() {
        return Err(IdealError::Parse("canonicalization requires an element node".into()));
    }
    let input = node.document().input_text();
    let mut output = Vec::new();
    write_element(node, input, &mut output, &BTreeMap::new());
    Ok(output)
}

fn write_node(node: Node<'_, '_>, input: &str, output: &mut Vec<u8>, rendered: &BTreeMap<String, String>) {
    match node.node_type() {
        NodeType::Element => write_element(node, input, output, rendered),
        NodeType::Text => {
            if let Some(text) = node.text() {
                output.extend_from_slice(escape_text(text).as_bytes());
            }
        }
        NodeType::PI => {
            if let Some(pi) = node.pi() {
                output.extend_from_slice(b"<?");
                output.extend_from_slice(pi.target.as_bytes());
                if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
                    output.push(b' ');
                    output.extend_from_slice(value.replace('\r', "&#xD;").as_bytes());
                }
                output.extend_from_slice(b"?>");
            }
        }
        NodeType::Comment | NodeType::Root => {}
    }
}

fn write_element(node: Node<'_, '_>, input: &str, output: &mut Vec<u8>, rendered: &BTreeMap<String, String>) {
    let in_scope: BTreeMap<String, String> = node
        .namespaces()
        .map(|ns| (ns.name().unwrap_or("").to_owned(), ns.uri().to_owned()))
        .collect();

    let name = element_qname(node, input);
    let element_prefix = name.split_once(':').map_or("", |(prefix, _)| prefix);

    let mut attrs = Vec::new();
    let mut utilized = BTreeSet::from([element_prefix.to_owned()]);
    for attr in node.attributes() {
        let ns_uri = attr.namespace().unwrap_or("");
        let qname = match attr.namespace() {
            Some(XML_NS) => format!("xml:{}", attr.name()),
            Some(_) => match attribute_prefix(&input[attr.range_qname()]) {
                Some(prefix) => {
                    let qname = format!("{prefix}:{}", attr.name());
                    utilized.insert(prefix);
                    qname
                }
                None => attr.name().to_owned(),
            },
            None => attr.name().to_owned(),
        };
        attrs.push((ns_uri, attr.name(), qname, attr.value()));
    }
    attrs.sort_by(|a, b| (!a.0.is_empty(), a.0, a.1).cmp(&(!b.0.is_empty(), b.0, b.1)));

    // BTreeSet order puts the default namespace ("") first, then prefixes lexicographically.
    let mut declarations = Vec::new();
    for prefix in utilized.iter().filter(|prefix| *prefix != "xml") {
        match in_scope.get(prefix) {
            Some(uri) if rendered.get(prefix) != Some(uri) => {
                declarations.push((prefix.clone(), uri.clone()));
            }
            None if prefix.is_empty() && rendered.get("").is_some_and(|uri| !uri.is_empty()) => {
                declarations.push((String::new(), String::new()));
            }
            _ => {}
        }
    }

    output.push(b'<');
    output.extend_from_slice(name.as_bytes());
    for (prefix, uri) in &declarations {
        if prefix.is_empty() {
            output.extend_from_slice(format!(" xmlns=\"{}\"", escape_attr(uri)).as_bytes());
        } else {
            output.extend_from_slice(format!(" xmlns:{prefix}=\"{}\"", escape_attr(uri)).as_bytes());
        }
    }
    for (_, _, qname, value) in &attrs {
        output.extend_from_slice(format!(" {qname}=\"{}\"", escape_attr(value)).as_bytes());
    }
    output.push(b'>');

    let mut child_rendered = rendered.clone();
    child_rendered.extend(declarations);
    for child in node.children() {
        write_node(child, input, output, &child_rendered);
    }

    output.extend_from_slice(b"</");
    output.extend_from_slice(name.as_bytes());
    output.push(b'>');
}

/// The element name exactly as written in the source, prefix included.
fn element_qname(node: Node<'_, '_>, input: &str) -> String {
    let start = node.range().start + 1;
    input[start..]
        .split(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(node.tag_name().name())
        .to_owned()
}

/// The prefix of an attribute name as written in the source.
fn attribute_prefix(qname: &str) -> Option<String> {
    qname.split_once(':').map(|(prefix, _)| prefix.to_owned())
}

/// Escape text node content.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape an attribute value.
pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}
