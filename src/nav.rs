//! Navigation entries (the table of contents), grouped by content file.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;

/// One table-of-contents entry within its owning file.
///
/// `anchor` names an element id to look up anywhere in the file's tree. When
/// `None`, the entry claims the entire file as one chapter, unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    pub title: String,
    pub anchor: Option<String>,
}

impl NavEntry {
    pub fn new(title: impl Into<String>, anchor: Option<&str>) -> Self {
        Self {
            title: title.into(),
            anchor: anchor.map(str::to_string),
        }
    }
}

/// Split a TOC href like `text/ch%201.xhtml#section-2` into its
/// percent-decoded file path and optional fragment.
pub fn split_href(href: &str) -> (String, Option<String>) {
    let (file, fragment) = match href.split_once('#') {
        Some((file, fragment)) if !fragment.is_empty() => (file, Some(fragment)),
        Some((file, _)) => (file, None),
        None => (href, None),
    };

    let decode = |s: &str| percent_decode_str(s).decode_utf8_lossy().into_owned();
    (decode(file), fragment.map(decode))
}

/// Group `(title, href)` pairs by owning file, preserving the per-file order
/// in which they were supplied.
pub fn group_by_file(
    entries: impl IntoIterator<Item = (String, String)>,
) -> HashMap<String, Vec<NavEntry>> {
    let mut grouped: HashMap<String, Vec<NavEntry>> = HashMap::new();
    for (title, href) in entries {
        let (file, anchor) = split_href(&href);
        grouped.entry(file).or_default().push(NavEntry {
            title,
            anchor,
        });
    }
    grouped
}
