//! Arena-indexed document trees.
//!
//! A [`Document`] stores every node of one parsed content file in a
//! contiguous vector; parent/child/sibling links are indices into that
//! vector. Splitting a document never mutates it: the segmenter clones the
//! pieces it needs into fresh per-chapter arenas, so the "before" and
//! "after" sides of a chapter boundary share no nodes.

use std::collections::{HashMap, HashSet};

mod parser;
mod serializer;

pub use serializer::serialize_fragment;

use crate::error::Result;

/// Unique identifier for a node within one [`Document`].
///
/// Allocation order is document order (preorder), so comparing the raw
/// indices of two nodes from the same parse compares their positions in the
/// source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value for no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// An attribute on an element, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

impl Attr {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Node payload.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Synthetic document root; never serialized.
    Root,
    /// Element with tag name and ordered attributes. `void` elements were
    /// written `<tag/>` in the source and may not have children.
    Element {
        tag: String,
        attrs: Vec<Attr>,
        void: bool,
    },
    /// Text content, trimmed; never whitespace-only.
    Text(String),
}

/// A node in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// One parsed content file as an arena tree.
#[derive(Debug)]
pub struct Document {
    name: String,
    nodes: Vec<Node>,
    root: NodeId,
    body: NodeId,
    /// Map from `id` attribute to node, across the whole tree.
    id_map: HashMap<String, NodeId>,
    /// Ids that appeared on more than one element.
    duplicate_ids: HashSet<String>,
}

impl Document {
    /// Create an empty document with only a synthetic root.
    pub fn new(name: impl Into<String>) -> Self {
        let mut doc = Self {
            name: name.into(),
            nodes: Vec::new(),
            root: NodeId::NONE,
            body: NodeId::NONE,
            id_map: HashMap::new(),
            duplicate_ids: HashSet::new(),
        };
        doc.root = doc.alloc(Node::new(NodeData::Root));
        doc
    }

    /// Create a document holding an empty `<body>` fragment.
    ///
    /// This is the shape the segmenter builds chapters into.
    pub fn fragment(name: impl Into<String>) -> Self {
        let mut doc = Self::new(name);
        let body = doc.create_element("body", Vec::new(), false);
        doc.append(doc.root, body);
        doc.body = body;
        doc
    }

    /// Parse an XHTML content file into a document.
    ///
    /// Fails with [`crate::Error::MalformedDocument`] on syntax errors,
    /// unterminated elements, or a missing `<body>`.
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self> {
        parser::parse_document(name.into(), source)
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Source file name this document was parsed from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Synthetic root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `<body>` element.
    pub fn body(&self) -> NodeId {
        self.body
    }

    pub(crate) fn set_body(&mut self, body: NodeId) {
        self.body = body;
    }

    /// Get a node by id.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    /// Create a new element node (not yet attached).
    pub fn create_element(
        &mut self,
        tag: impl Into<String>,
        attrs: Vec<Attr>,
        void: bool,
    ) -> NodeId {
        let elem_id = attrs
            .iter()
            .find(|a| a.name == "id")
            .map(|a| a.value.clone());

        let node_id = self.alloc(Node::new(NodeData::Element {
            tag: tag.into(),
            attrs,
            void,
        }));

        if let Some(id_str) = elem_id {
            if self.id_map.insert(id_str.clone(), node_id).is_some() {
                self.duplicate_ids.insert(id_str);
            }
        }

        node_id
    }

    /// Create a new text node (not yet attached).
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Node::new(NodeData::Text(text.into())))
    }

    /// Append a child to a parent node.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(NodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
        }

        if last_child.is_some() {
            if let Some(last_node) = self.get_mut(last_child) {
                last_node.next_sibling = child;
            }
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Deep-copy a subtree of `src` under `parent` in this document.
    ///
    /// Returns the id of the copied root. Source ids are re-registered in
    /// this document's id map so image references and anchors survive the
    /// copy.
    pub fn append_subtree_from(&mut self, src: &Document, src_node: NodeId, parent: NodeId) -> NodeId {
        let Some(node) = src.get(src_node) else {
            return NodeId::NONE;
        };

        let copy = match &node.data {
            NodeData::Element { tag, attrs, void } => {
                self.create_element(tag.clone(), attrs.clone(), *void)
            }
            NodeData::Text(text) => self.create_text(text.clone()),
            NodeData::Root => return NodeId::NONE,
        };
        self.append(parent, copy);

        for child in src.children(src_node) {
            self.append_subtree_from(src, child, copy);
        }
        copy
    }

    /// Look up an element by its `id` attribute.
    pub fn get_by_id(&self, id: &str) -> Option<NodeId> {
        self.id_map.get(id).copied()
    }

    /// Whether an `id` attribute value appeared on more than one element.
    pub fn is_duplicate_id(&self, id: &str) -> bool {
        self.duplicate_ids.contains(id)
    }

    pub fn first_child(&self, id: NodeId) -> NodeId {
        self.get(id).map(|n| n.first_child).unwrap_or(NodeId::NONE)
    }

    pub fn next_sibling(&self, id: NodeId) -> NodeId {
        self.get(id).map(|n| n.next_sibling).unwrap_or(NodeId::NONE)
    }

    pub fn parent(&self, id: NodeId) -> NodeId {
        self.get(id).map(|n| n.parent).unwrap_or(NodeId::NONE)
    }

    /// Iterate over the children of a node.
    pub fn children(&self, parent: NodeId) -> Children<'_> {
        Children {
            doc: self,
            current: self.first_child(parent),
        }
    }

    /// Iterate over a subtree in preorder, excluding `root` itself.
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(root).collect();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Element tag name, if `id` is an element.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        })
    }

    /// Get an attribute value on an element.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.value.as_str()),
            _ => None,
        })
    }

    /// Replace an attribute value in place. No-op if the element has no such
    /// attribute.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(node) = self.get_mut(id)
            && let NodeData::Element { attrs, .. } = &mut node.data
            && let Some(attr) = attrs.iter_mut().find(|a| a.name == name)
        {
            attr.value = value.into();
        }
    }

    /// Text content of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Find the first element with the given tag name (preorder).
    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .find(|&id| self.tag(id) == Some(tag))
    }
}

/// Iterator over the children of a node.
pub struct Children<'a> {
    doc: &'a Document,
    current: NodeId,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self.doc.next_sibling(id);
        Some(id)
    }
}

/// Preorder iterator over a subtree.
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let mut children: Vec<_> = self.doc.children(id).collect();
        children.reverse();
        self.stack.extend(children);
        Some(id)
    }
}
