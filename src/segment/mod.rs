//! TOC-driven content segmentation.
//!
//! [`segment`] walks every content file in reading order and cuts the
//! concatenated body stream at each navigation anchor, producing one chapter
//! per entry. Splitting a unit clones the path from its top-level container
//! down to the anchor into both the closing and the opening chapter, as
//! emptied "shells", so each side stays structurally valid without sharing
//! nodes with the other.

use std::collections::{HashMap, HashSet};

mod assets;

pub use assets::AssetRenamer;

use crate::dom::{Attr, Document, NodeData, NodeId, serialize_fragment};
use crate::error::{Error, Result};
use crate::nav::NavEntry;

/// One emitted chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    /// Canonical serialization of a `<body>`-rooted fragment.
    pub content: String,
}

/// The full result of segmenting one book.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Chapters in navigation order, one per entry.
    pub chapters: Vec<Chapter>,
    /// Original image name -> canonical `image-{n}.{ext}` name, covering
    /// every image referenced by an emitted chapter.
    pub rename_map: HashMap<String, String>,
}

/// Segment a book's content files into chapters.
///
/// * `file_order` — filenames in logical reading order.
/// * `documents` — parsed content file per filename.
/// * `images` — raw image bytes by original reference name.
/// * `navigation` — TOC entries grouped by owning file, in document order
///   within each file.
///
/// Pure and deterministic: identical inputs produce identical chapters and
/// an identical rename map. Fails without partial output on a missing or
/// duplicated anchor, malformed navigation, or an image reference with no
/// backing asset.
pub fn segment(
    file_order: &[String],
    documents: &HashMap<String, Document>,
    images: &HashMap<String, Vec<u8>>,
    navigation: &HashMap<String, Vec<NavEntry>>,
) -> Result<Segmentation> {
    let mut state = SegmentState::new();
    static NO_ENTRIES: Vec<NavEntry> = Vec::new();

    for file in file_order {
        let doc = documents
            .get(file)
            .ok_or_else(|| Error::MissingDocument(file.clone()))?;
        let entries = navigation.get(file).unwrap_or(&NO_ENTRIES);

        // A null-anchor entry claims the whole file as one chapter.
        if let Some(whole_file) = entries.iter().find(|e| e.anchor.is_none()) {
            if entries.len() > 1 {
                return Err(Error::InvalidNavigation {
                    file: file.clone(),
                    reason: "a whole-file entry must be its file's only entry".to_string(),
                });
            }
            state.start_chapter(whole_file.title.clone());
            let mut unit = doc.first_child(doc.body());
            while unit.is_some() {
                state.append_wholesale(doc, unit);
                unit = doc.next_sibling(unit);
            }
            continue;
        }

        let resolved = resolve_entries(doc, file, entries)?;
        let mut walker = Walker {
            src: doc,
            entries: &resolved,
            next: 0,
            state: &mut state,
        };
        walker.walk_children(doc.body());

        if walker.next < resolved.len() {
            // Possible only when an anchor sits inside an earlier entry's
            // (excluded) anchor element.
            let missed = &resolved[walker.next];
            return Err(Error::InvalidNavigation {
                file: file.clone(),
                reason: format!(
                    "anchor `{}` for entry \"{}\" was never reached",
                    missed.anchor_id, missed.title
                ),
            });
        }
    }

    let built = state.finish();

    let mut renamer = AssetRenamer::new(images);
    let mut chapters = Vec::with_capacity(built.len());
    for (title, mut doc) in built {
        renamer.rename(&mut doc, &title)?;
        let content = serialize_fragment(&doc, doc.body());
        chapters.push(Chapter { title, content });
    }

    Ok(Segmentation {
        chapters,
        rename_map: renamer.into_map(),
    })
}

/// A navigation entry with its anchor located in the source tree.
struct ResolvedEntry {
    title: String,
    anchor_id: String,
    /// The anchor element itself.
    anchor: NodeId,
    /// Ancestors-or-self of the anchor, from the top-level body child down.
    /// The walk descends exactly along this set.
    path: HashSet<NodeId>,
}

fn resolve_entries(doc: &Document, file: &str, entries: &[NavEntry]) -> Result<Vec<ResolvedEntry>> {
    let mut resolved = Vec::with_capacity(entries.len());

    for entry in entries {
        let anchor_id = entry.anchor.as_deref().unwrap_or_default();
        let anchor = doc
            .get_by_id(anchor_id)
            .ok_or_else(|| Error::AnchorNotFound {
                file: file.to_string(),
                title: entry.title.clone(),
                anchor: anchor_id.to_string(),
            })?;
        if doc.is_duplicate_id(anchor_id) {
            return Err(Error::DuplicateAnchor {
                file: file.to_string(),
                anchor: anchor_id.to_string(),
            });
        }

        let mut path = HashSet::new();
        let mut cursor = anchor;
        while cursor.is_some() && cursor != doc.body() {
            path.insert(cursor);
            cursor = doc.parent(cursor);
        }
        if cursor != doc.body() {
            // Anchor exists but not inside <body>; boundaries are undefined.
            return Err(Error::AnchorNotFound {
                file: file.to_string(),
                title: entry.title.clone(),
                anchor: anchor_id.to_string(),
            });
        }

        resolved.push(ResolvedEntry {
            title: entry.title.clone(),
            anchor_id: anchor_id.to_string(),
            anchor,
            path,
        });
    }

    // Node ids are allocated in document order, so a non-monotonic anchor
    // sequence means the TOC disagrees with the document. Reject rather than
    // guess a resolution.
    let in_order = resolved.windows(2).all(|w| w[0].anchor < w[1].anchor);
    if !in_order {
        return Err(Error::AnchorOrder {
            file: file.to_string(),
        });
    }

    Ok(resolved)
}

/// Tag and attributes of an open ancestor container at a split boundary,
/// recreated on both sides of the cut.
struct ShellFrame {
    tag: String,
    attrs: Vec<Attr>,
}

/// The chapter currently accumulating content.
struct ChapterAcc {
    title: String,
    doc: Document,
    /// Open shell elements, innermost last; content lands under the last
    /// one (or the body when no shells are open).
    cursor: Vec<NodeId>,
}

impl ChapterAcc {
    fn new(title: String) -> Self {
        let doc = Document::fragment(title.clone());
        Self {
            title,
            doc,
            cursor: Vec::new(),
        }
    }

    fn insertion_point(&self) -> NodeId {
        self.cursor.last().copied().unwrap_or(self.doc.body())
    }
}

/// Accumulator threaded through the walk.
///
/// `shells` outlives individual chapters: it describes where in the source
/// structure the walk currently is, and is replayed into each newly opened
/// chapter so content after a split keeps its structural position.
struct SegmentState {
    finished: Vec<(String, Document)>,
    current: Option<ChapterAcc>,
    shells: Vec<ShellFrame>,
}

impl SegmentState {
    fn new() -> Self {
        Self {
            finished: Vec::new(),
            current: None,
            shells: Vec::new(),
        }
    }

    /// Enter a container that holds an upcoming anchor. The closing chapter
    /// (if any) receives a shell immediately; the opening chapter receives
    /// its own when the boundary fires.
    fn open_shell(&mut self, tag: String, attrs: Vec<Attr>) {
        if let Some(acc) = &mut self.current {
            let shell = acc.doc.create_element(tag.clone(), attrs.clone(), false);
            acc.doc.append(acc.insertion_point(), shell);
            acc.cursor.push(shell);
        }
        self.shells.push(ShellFrame { tag, attrs });
    }

    fn close_shell(&mut self) {
        self.shells.pop();
        if let Some(acc) = &mut self.current {
            acc.cursor.pop();
        }
    }

    /// Close the current chapter (if any) and open a new one, replaying the
    /// open shell chain into it.
    fn start_chapter(&mut self, title: String) {
        if let Some(acc) = self.current.take() {
            self.finished.push((acc.title, acc.doc));
        }

        let mut acc = ChapterAcc::new(title);
        for frame in &self.shells {
            let shell = acc
                .doc
                .create_element(frame.tag.clone(), frame.attrs.clone(), false);
            acc.doc.append(acc.insertion_point(), shell);
            acc.cursor.push(shell);
        }
        self.current = Some(acc);
    }

    /// Append a whole subtree to the active chapter. Content seen before the
    /// first chapter opens has nowhere to go and is dropped.
    fn append_wholesale(&mut self, src: &Document, node: NodeId) {
        if let Some(acc) = &mut self.current {
            let parent = acc.insertion_point();
            acc.doc.append_subtree_from(src, node, parent);
        }
    }

    fn finish(mut self) -> Vec<(String, Document)> {
        if let Some(acc) = self.current.take() {
            self.finished.push((acc.title, acc.doc));
        }
        self.finished
    }
}

struct Walker<'a, 'b> {
    src: &'a Document,
    entries: &'a [ResolvedEntry],
    /// Index of the next pending entry.
    next: usize,
    state: &'b mut SegmentState,
}

impl Walker<'_, '_> {
    fn walk_children(&mut self, parent: NodeId) {
        let mut cur = self.src.first_child(parent);
        while cur.is_some() {
            let following = self.src.next_sibling(cur);

            let (on_path, is_anchor) = match self.entries.get(self.next) {
                Some(entry) => (entry.path.contains(&cur), entry.anchor == cur),
                None => (false, false),
            };

            if is_anchor {
                // The anchor element itself belongs to neither side.
                let title = self.entries[self.next].title.clone();
                self.state.start_chapter(title);
                self.next += 1;
            } else if on_path {
                let (tag, attrs) = shell_parts(self.src, cur);
                self.state.open_shell(tag, attrs);
                self.walk_children(cur);
                self.state.close_shell();
            } else {
                self.state.append_wholesale(self.src, cur);
            }

            cur = following;
        }
    }
}

fn shell_parts(doc: &Document, id: NodeId) -> (String, Vec<Attr>) {
    match doc.get(id).map(|n| &n.data) {
        Some(NodeData::Element { tag, attrs, .. }) => (tag.clone(), attrs.clone()),
        // Anchor paths contain only elements.
        _ => (String::from("div"), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, body: &str) -> Document {
        let source = format!("<html><head><title>t</title></head><body>{body}</body></html>");
        Document::parse(name, &source).unwrap()
    }

    fn no_images() -> HashMap<String, Vec<u8>> {
        HashMap::new()
    }

    #[test]
    fn test_anchor_not_found_is_fatal() {
        let documents = HashMap::from([("a.xhtml".to_string(), doc("a.xhtml", "<p>x</p>"))]);
        let navigation = HashMap::from([(
            "a.xhtml".to_string(),
            vec![NavEntry::new("One", Some("missing"))],
        )]);

        let err = segment(
            &["a.xhtml".to_string()],
            &documents,
            &no_images(),
            &navigation,
        )
        .unwrap_err();

        match err {
            Error::AnchorNotFound {
                file,
                title,
                anchor,
            } => {
                assert_eq!(file, "a.xhtml");
                assert_eq!(title, "One");
                assert_eq!(anchor, "missing");
            }
            other => panic!("expected AnchorNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_anchor_rejected() {
        let documents = HashMap::from([(
            "a.xhtml".to_string(),
            doc("a.xhtml", r#"<h1 id="t1">A</h1><h1 id="t1">B</h1>"#),
        )]);
        let navigation = HashMap::from([(
            "a.xhtml".to_string(),
            vec![NavEntry::new("One", Some("t1"))],
        )]);

        let err = segment(
            &["a.xhtml".to_string()],
            &documents,
            &no_images(),
            &navigation,
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateAnchor { .. }));
    }

    #[test]
    fn test_out_of_order_anchors_rejected() {
        let documents = HashMap::from([(
            "a.xhtml".to_string(),
            doc("a.xhtml", r#"<h1 id="t1">A</h1><h1 id="t2">B</h1>"#),
        )]);
        let navigation = HashMap::from([(
            "a.xhtml".to_string(),
            vec![
                NavEntry::new("Two", Some("t2")),
                NavEntry::new("One", Some("t1")),
            ],
        )]);

        let err = segment(
            &["a.xhtml".to_string()],
            &documents,
            &no_images(),
            &navigation,
        )
        .unwrap_err();
        assert!(matches!(err, Error::AnchorOrder { .. }));
    }

    #[test]
    fn test_whole_file_entry_must_be_alone() {
        let documents = HashMap::from([(
            "a.xhtml".to_string(),
            doc("a.xhtml", r#"<h1 id="t1">A</h1>"#),
        )]);
        let navigation = HashMap::from([(
            "a.xhtml".to_string(),
            vec![
                NavEntry::new("Whole", None),
                NavEntry::new("One", Some("t1")),
            ],
        )]);

        let err = segment(
            &["a.xhtml".to_string()],
            &documents,
            &no_images(),
            &navigation,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidNavigation { .. }));
    }

    #[test]
    fn test_missing_document_rejected() {
        let err = segment(
            &["ghost.xhtml".to_string()],
            &HashMap::new(),
            &no_images(),
            &HashMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingDocument(f) if f == "ghost.xhtml"));
    }

    #[test]
    fn test_chapter_count_matches_entry_count() {
        let documents = HashMap::from([(
            "a.xhtml".to_string(),
            doc(
                "a.xhtml",
                r#"<p>front</p><h1 id="t1">A</h1><p>1</p><h1 id="t2">B</h1><p>2</p>"#,
            ),
        )]);
        let navigation = HashMap::from([(
            "a.xhtml".to_string(),
            vec![
                NavEntry::new("One", Some("t1")),
                NavEntry::new("Two", Some("t2")),
            ],
        )]);

        let result = segment(
            &["a.xhtml".to_string()],
            &documents,
            &no_images(),
            &navigation,
        )
        .unwrap();

        assert_eq!(result.chapters.len(), 2);
        assert_eq!(result.chapters[0].title, "One");
        assert_eq!(result.chapters[1].title, "Two");
        // Front matter before the first anchor is dropped.
        assert!(!result.chapters[0].content.contains("front"));
    }

    #[test]
    fn test_anchor_at_top_level_is_excluded() {
        let documents = HashMap::from([(
            "a.xhtml".to_string(),
            doc("a.xhtml", r#"<h1 id="t1">Heading</h1><p>body</p>"#),
        )]);
        let navigation = HashMap::from([(
            "a.xhtml".to_string(),
            vec![NavEntry::new("One", Some("t1"))],
        )]);

        let result = segment(
            &["a.xhtml".to_string()],
            &documents,
            &no_images(),
            &navigation,
        )
        .unwrap();

        assert_eq!(
            result.chapters[0].content,
            "<body>\n <p>\n  body\n </p>\n</body>"
        );
    }

    #[test]
    fn test_empty_chapter_is_valid() {
        // Anchor at the very end of the last file: the chapter opens and
        // accumulates nothing.
        let documents = HashMap::from([(
            "a.xhtml".to_string(),
            doc("a.xhtml", r#"<h1 id="t1">A</h1><h1 id="t2">B</h1>"#),
        )]);
        let navigation = HashMap::from([(
            "a.xhtml".to_string(),
            vec![
                NavEntry::new("One", Some("t1")),
                NavEntry::new("Two", Some("t2")),
            ],
        )]);

        let result = segment(
            &["a.xhtml".to_string()],
            &documents,
            &no_images(),
            &navigation,
        )
        .unwrap();

        assert_eq!(result.chapters[1].content, "<body>\n</body>");
    }

    #[test]
    fn test_determinism() {
        let make_inputs = || {
            let documents = HashMap::from([(
                "a.xhtml".to_string(),
                doc(
                    "a.xhtml",
                    r#"<div><h1 id="t1">A</h1><img src="x.png"/><img src="y.png"/></div>"#,
                ),
            )]);
            let images = HashMap::from([
                ("x.png".to_string(), vec![1u8]),
                ("y.png".to_string(), vec![2u8]),
            ]);
            let navigation = HashMap::from([(
                "a.xhtml".to_string(),
                vec![NavEntry::new("One", Some("t1"))],
            )]);
            (documents, images, navigation)
        };

        let (d1, i1, n1) = make_inputs();
        let (d2, i2, n2) = make_inputs();
        let order = vec!["a.xhtml".to_string()];

        let first = segment(&order, &d1, &i1, &n1).unwrap();
        let second = segment(&order, &d2, &i2, &n2).unwrap();

        assert_eq!(first.chapters, second.chapters);
        assert_eq!(first.rename_map, second.rename_map);
    }
}
