//! Canonical chapter serialization.
//!
//! Emits one element or text unit per line, indented one space per depth
//! level, attributes in source order. The output is deterministic down to
//! the byte so chapter content can be compared exactly, and re-parsing a
//! serialized fragment and serializing it again yields the identical string.

use std::fmt::Write;

use super::{Document, NodeData, NodeId};

/// Serialize the subtree rooted at `root` (normally a chapter's `<body>`).
///
/// No trailing newline: the closing tag of `root` is the last line.
pub fn serialize_fragment(doc: &Document, root: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, root, 0, &mut out);
    // Drop the newline after the final closing tag.
    if out.ends_with('\n') {
        out.pop();
    }
    out
}

fn write_node(doc: &Document, id: NodeId, depth: usize, out: &mut String) {
    let Some(node) = doc.get(id) else {
        return;
    };

    match &node.data {
        NodeData::Root => {
            for child in doc.children(id) {
                write_node(doc, child, depth, out);
            }
        }
        NodeData::Text(text) => {
            indent(depth, out);
            out.push_str(&escape_text(text));
            out.push('\n');
        }
        NodeData::Element { tag, attrs, void } => {
            indent(depth, out);
            out.push('<');
            out.push_str(tag);
            for attr in attrs {
                write!(out, " {}=\"{}\"", attr.name, escape_attr(&attr.value))
                    .expect("writing to String cannot fail");
            }

            if *void {
                out.push_str("/>\n");
                return;
            }

            out.push_str(">\n");
            for child in doc.children(id) {
                write_node(doc, child, depth + 1, out);
            }
            indent(depth, out);
            write!(out, "</{tag}>\n").expect("writing to String cannot fail");
        }
    }
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push(' ');
    }
}

/// Escape special characters in text content.
pub fn escape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape special characters in a double-quoted attribute value.
pub fn escape_attr(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Attr;

    #[test]
    fn test_serialize_nested() {
        let mut doc = Document::fragment("chapter");
        let div = doc.create_element("div", vec![], false);
        doc.append(doc.body(), div);
        let span = doc.create_element("span", vec![], false);
        doc.append(div, span);
        let text = doc.create_text("1.1");
        doc.append(span, text);

        assert_eq!(
            serialize_fragment(&doc, doc.body()),
            "<body>\n <div>\n  <span>\n   1.1\n  </span>\n </div>\n</body>"
        );
    }

    #[test]
    fn test_serialize_empty_element_keeps_both_tags() {
        let mut doc = Document::fragment("chapter");
        let div = doc.create_element("div", vec![], false);
        doc.append(doc.body(), div);

        assert_eq!(
            serialize_fragment(&doc, doc.body()),
            "<body>\n <div>\n </div>\n</body>"
        );
    }

    #[test]
    fn test_serialize_void_element_single_line() {
        let mut doc = Document::fragment("chapter");
        let img = doc.create_element("img", vec![Attr::new("src", "image-0.jpg")], true);
        doc.append(doc.body(), img);

        assert_eq!(
            serialize_fragment(&doc, doc.body()),
            "<body>\n <img src=\"image-0.jpg\"/>\n</body>"
        );
    }

    #[test]
    fn test_attributes_in_source_order() {
        let mut doc = Document::fragment("chapter");
        let a = doc.create_element(
            "a",
            vec![Attr::new("href", "#x"), Attr::new("class", "link")],
            false,
        );
        doc.append(doc.body(), a);

        let out = serialize_fragment(&doc, doc.body());
        assert!(out.contains("<a href=\"#x\" class=\"link\">"));
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_text("a & b < c"), "a &amp; b &lt; c");
        assert_eq!(escape_attr(r#"say "hi""#), "say &quot;hi&quot;");
        // Quotes stay literal in text content.
        assert_eq!(escape_text(r#"say "hi""#), r#"say "hi""#);
    }

    #[test]
    fn test_serialize_is_stable() {
        let doc =
            Document::parse("a.xhtml", "<body><div><p>one</p><p>two</p></div></body>").unwrap();
        let first = serialize_fragment(&doc, doc.body());
        let second = serialize_fragment(&doc, doc.body());
        assert_eq!(first, second);
    }
}
