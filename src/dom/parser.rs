//! XHTML content-file parsing.
//!
//! Builds a [`Document`] arena from one spine file. Only structure the
//! segmenter cares about survives: elements with their attributes in source
//! order, and non-whitespace text. Comments, doctypes, and processing
//! instructions are dropped.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{Attr, Document, NodeId};
use crate::error::{Error, Result};

pub fn parse_document(name: String, source: &str) -> Result<Document> {
    let mut reader = Reader::from_str(source);
    let mut doc = Document::new(name);

    // Open-element stack; index 0 is the synthetic root.
    let mut stack: Vec<NodeId> = vec![doc.root()];
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                flush_text(&mut doc, &mut text, &stack);
                let id = create_element(&mut doc, &e, false)?;
                doc.append(*stack.last().unwrap_or(&doc.root()), id);
                stack.push(id);
            }
            Ok(Event::Empty(e)) => {
                flush_text(&mut doc, &mut text, &stack);
                let id = create_element(&mut doc, &e, true)?;
                doc.append(*stack.last().unwrap_or(&doc.root()), id);
            }
            Ok(Event::End(e)) => {
                flush_text(&mut doc, &mut text, &stack);
                if stack.len() <= 1 {
                    return Err(malformed(
                        &doc,
                        format!(
                            "closing tag </{}> without matching open",
                            String::from_utf8_lossy(e.name().as_ref())
                        ),
                    ));
                }
                stack.pop();
            }
            Ok(Event::Text(e)) => {
                text.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::CData(e)) => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::GeneralRef(e)) => {
                let entity = String::from_utf8_lossy(e.as_ref());
                if let Some(resolved) = resolve_entity(&entity) {
                    text.push_str(&resolved);
                }
            }
            Ok(Event::Eof) => {
                if stack.len() > 1 {
                    let open = stack
                        .last()
                        .and_then(|&id| doc.tag(id))
                        .unwrap_or("?")
                        .to_string();
                    return Err(malformed(&doc, format!("unterminated <{open}>")));
                }
                break;
            }
            // Declarations, doctypes, comments, PIs carry no content.
            Ok(_) => {}
            Err(e) => return Err(malformed(&doc, e.to_string())),
        }
    }

    let body = doc
        .find_by_tag("body")
        .ok_or_else(|| malformed(&doc, "no <body> element".to_string()))?;
    doc.set_body(body);

    Ok(doc)
}

fn create_element(doc: &mut Document, e: &BytesStart, void: bool) -> Result<NodeId> {
    let tag = local_name(&String::from_utf8_lossy(e.name().as_ref())).to_string();

    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| malformed(doc, err.to_string()))?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| malformed(doc, err.to_string()))?
            .into_owned();
        attrs.push(Attr { name, value });
    }

    Ok(doc.create_element(tag, attrs, void))
}

/// Attach pending text to the innermost open element. Whitespace-only runs
/// are dropped; everything else is trimmed.
fn flush_text(doc: &mut Document, text: &mut String, stack: &[NodeId]) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        let node = doc.create_text(trimmed);
        let parent = *stack.last().unwrap_or(&doc.root());
        doc.append(parent, node);
    }
    text.clear();
}

fn malformed(doc: &Document, reason: String) -> Error {
    Error::MalformedDocument {
        file: doc.name().to_string(),
        reason,
    }
}

/// Extract local name from a namespaced XML name (e.g., "xhtml:div" -> "div").
fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        "nbsp" => return Some("\u{a0}".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#')
        && let Ok(code) = dec.parse::<u32>()
        && let Some(c) = char::from_u32(code)
    {
        return Some(c.to_string());
    }

    None
}
