//! Search / media-type filter / sort over a scanned file list.

use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::media::{ext_of, IMAGE_EXTS, VIDEO_EXTS};
use crate::model::{FileEntry, MediaFilter, SortMode};

/// Derive the displayed list from `all`. Never touches `all`; always
/// returns a fresh Vec.
pub fn apply_filters(
    all: &[FileEntry],
    query: &str,
    media: MediaFilter,
    sort: SortMode,
) -> Vec<FileEntry> {
    let q = query.trim().to_lowercase();

    let mut list: Vec<FileEntry> = all
        .iter()
        .filter(|f| q.is_empty() || f.name.to_lowercase().contains(&q))
        .filter(|f| matches_media(&f.name, media))
        .cloned()
        .collect();

    match sort {
        SortMode::Alpha => list.sort_by(|a, b| collate(&a.name, &b.name)),
        SortMode::Date => list.sort_by(|a, b| b.date.cmp(&a.date)),
    }
    list
}

fn matches_media(name: &str, media: MediaFilter) -> bool {
    let ext = ext_of(name);
    match media {
        MediaFilter::All => true,
        MediaFilter::Photos => IMAGE_EXTS.contains(&ext.as_str()),
        MediaFilter::Videos => VIDEO_EXTS.contains(&ext.as_str()),
    }
}

/// Locale-style name ordering. Letters compare with accents and case
/// folded away first, then unaccented sorts before accented, then
/// lowercase before uppercase, then raw bytes decide.
pub fn collate(a: &str, b: &str) -> Ordering {
    let primary = base_letters(a).cmp(base_letters(b));
    if primary != Ordering::Equal {
        return primary;
    }
    let secondary = folded(a).cmp(folded(b));
    if secondary != Ordering::Equal {
        return secondary;
    }
    let tertiary = a
        .chars()
        .map(|c| c.is_uppercase())
        .cmp(b.chars().map(|c| c.is_uppercase()));
    tertiary.then_with(|| a.cmp(b))
}

/// Lowercased, decomposed, combining marks dropped: "Été" → "ete".
fn base_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

/// Lowercased and decomposed, marks kept, so accents order after their
/// base letter.
fn folded(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd().flat_map(char::to_lowercase)
}
