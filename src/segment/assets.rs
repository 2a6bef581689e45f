//! Deterministic image renaming.
//!
//! Emitted chapters are scanned in chapter order, preorder within each
//! chapter; the first sighting of an original image name assigns the next
//! sequential canonical name and every reference is rewritten in place.

use std::collections::HashMap;

use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};

/// Assigns `image-{n}.{ext}` names to referenced images across one book.
pub struct AssetRenamer<'a> {
    assets: &'a HashMap<String, Vec<u8>>,
    map: HashMap<String, String>,
    next: usize,
}

impl<'a> AssetRenamer<'a> {
    pub fn new(assets: &'a HashMap<String, Vec<u8>>) -> Self {
        Self {
            assets,
            map: HashMap::new(),
            next: 0,
        }
    }

    /// Rewrite every `<img src>` in one chapter.
    ///
    /// Fails with [`Error::UnknownAsset`] when a reference has no backing
    /// asset; a dangling reference is a broken book, not something to paper
    /// over.
    pub fn rename(&mut self, doc: &mut Document, chapter: &str) -> Result<()> {
        let images: Vec<NodeId> = doc
            .descendants(doc.body())
            .filter(|&id| doc.tag(id) == Some("img") && doc.attr(id, "src").is_some())
            .collect();

        for id in images {
            let src = doc
                .attr(id, "src")
                .unwrap_or_default()
                .to_string();

            let canonical = match self.map.get(&src) {
                Some(existing) => existing.clone(),
                None => {
                    if !self.assets.contains_key(&src) {
                        return Err(Error::UnknownAsset {
                            src,
                            chapter: chapter.to_string(),
                        });
                    }
                    let name = canonical_name(self.next, &src);
                    self.next += 1;
                    self.map.insert(src, name.clone());
                    name
                }
            };
            doc.set_attr(id, "src", canonical);
        }

        Ok(())
    }

    /// The accumulated original -> canonical mapping.
    pub fn into_map(self) -> HashMap<String, String> {
        self.map
    }
}

/// `image-{n}` with the original extension, when it has one.
fn canonical_name(n: usize, original: &str) -> String {
    match original.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => format!("image-{n}.{ext}"),
        _ => format!("image-{n}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Attr;

    fn chapter_with_images(srcs: &[&str]) -> Document {
        let mut doc = Document::fragment("chapter");
        for src in srcs {
            let img = doc.create_element("img", vec![Attr::new("src", *src)], true);
            doc.append(doc.body(), img);
        }
        doc
    }

    fn assets(names: &[&str]) -> HashMap<String, Vec<u8>> {
        names
            .iter()
            .map(|n| (n.to_string(), vec![0u8]))
            .collect()
    }

    #[test]
    fn test_first_seen_order() {
        let assets = assets(&["b.png", "a.jpg"]);
        let mut renamer = AssetRenamer::new(&assets);

        let mut doc = chapter_with_images(&["b.png", "a.jpg", "b.png"]);
        renamer.rename(&mut doc, "One").unwrap();

        let srcs: Vec<_> = doc
            .descendants(doc.body())
            .filter_map(|id| doc.attr(id, "src").map(str::to_string))
            .collect();
        assert_eq!(srcs, vec!["image-0.png", "image-1.jpg", "image-0.png"]);

        let map = renamer.into_map();
        assert_eq!(map["b.png"], "image-0.png");
        assert_eq!(map["a.jpg"], "image-1.jpg");
    }

    #[test]
    fn test_numbering_continues_across_chapters() {
        let assets = assets(&["a.jpg", "b.jpg"]);
        let mut renamer = AssetRenamer::new(&assets);

        let mut first = chapter_with_images(&["a.jpg"]);
        let mut second = chapter_with_images(&["b.jpg", "a.jpg"]);
        renamer.rename(&mut first, "One").unwrap();
        renamer.rename(&mut second, "Two").unwrap();

        let map = renamer.into_map();
        assert_eq!(map["a.jpg"], "image-0.jpg");
        assert_eq!(map["b.jpg"], "image-1.jpg");
    }

    #[test]
    fn test_unknown_asset_is_surfaced() {
        let assets = assets(&[]);
        let mut renamer = AssetRenamer::new(&assets);

        let mut doc = chapter_with_images(&["ghost.png"]);
        let err = renamer.rename(&mut doc, "One").unwrap_err();

        match err {
            Error::UnknownAsset { src, chapter } => {
                assert_eq!(src, "ghost.png");
                assert_eq!(chapter, "One");
            }
            other => panic!("expected UnknownAsset, got {other:?}"),
        }
    }

    #[test]
    fn test_extension_handling() {
        assert_eq!(canonical_name(0, "photo.jpeg"), "image-0.jpeg");
        assert_eq!(canonical_name(3, "cover"), "image-3");
        assert_eq!(canonical_name(1, "archive.tar.gz"), "image-1.gz");
    }

    #[test]
    fn test_unreferenced_assets_not_in_map() {
        let assets = assets(&["used.png", "unused.png"]);
        let mut renamer = AssetRenamer::new(&assets);

        let mut doc = chapter_with_images(&["used.png"]);
        renamer.rename(&mut doc, "One").unwrap();

        let map = renamer.into_map();
        assert_eq!(map.len(), 1);
        assert!(!map.contains_key("unused.png"));
    }
}
