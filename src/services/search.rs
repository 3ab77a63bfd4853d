//! Client-side filtered view over the bookmark collection.

use crate::types::bookmark::Bookmark;

/// Returns true if the title or any tag contains `needle_lower`.
/// `needle_lower` must already be lowercased.
fn matches(bookmark: &Bookmark, needle_lower: &str) -> bool {
    bookmark.title.to_lowercase().contains(needle_lower)
        || bookmark
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle_lower))
}

/// Projects `bookmarks` onto those matching `term`, case-insensitively, by
/// title or tag. An empty term keeps everything. Order is preserved.
pub fn filter_bookmarks(bookmarks: &[Bookmark], term: &str) -> Vec<Bookmark> {
    if term.is_empty() {
        return bookmarks.to_vec();
    }
    let needle = term.to_lowercase();
    bookmarks
        .iter()
        .filter(|b| matches(b, &needle))
        .cloned()
        .collect()
}
