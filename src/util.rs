//! Small pure helpers.

/// Build a filesystem- and URL-safe slug from a title.
///
/// Alphanumeric runs are lowercased and joined by single hyphens; everything
/// else collapses into the separators. Empty input (or input with no
/// alphanumerics) yields `"untitled"`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;

    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            for lower in c.to_lowercase() {
                slug.push(lower);
            }
        } else {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        slug.push_str("untitled");
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Chapter One"), "chapter-one");
        assert_eq!(slugify("The Iliad"), "the-iliad");
    }

    #[test]
    fn test_slugify_punctuation_collapses() {
        assert_eq!(slugify("What's in This Book?"), "what-s-in-this-book");
        assert_eq!(slugify("  --  spaced  --  "), "spaced");
    }

    #[test]
    fn test_slugify_unicode_lowercase() {
        assert_eq!(slugify("ÉPÎTRE"), "épître");
    }

    #[test]
    fn test_slugify_empty() {
        assert_eq!(slugify(""), "untitled");
        assert_eq!(slugify("!!!"), "untitled");
    }
}
