use chrono::{DateTime, Utc};

/// Longest slug kept, leaving room for the extension under common
/// 255-byte file name limits.
pub const MAX_SLUG_LEN: usize = 200;

/// Lowercase `[a-z0-9-]` identifier: runs of anything else become one hyphen,
/// with no hyphen at either end. Capped at `MAX_SLUG_LEN` bytes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
            if slug.len() >= MAX_SLUG_LEN {
                break;
            }
        } else {
            pending_hyphen = true;
        }
    }

    // Only ASCII is pushed, so any byte offset is a char boundary
    slug.truncate(MAX_SLUG_LEN);
    slug.truncate(slug.trim_end_matches('-').len());
    slug
}

/// True when ASCII letters and digits outnumber other alphanumerics, so the
/// slug keeps most of what identifies the title.
fn mostly_ascii(text: &str) -> bool {
    let (ascii, other) = text
        .chars()
        .filter(|c| c.is_alphanumeric())
        .fold((0usize, 0usize), |(ascii, other), c| {
            if c.is_ascii() {
                (ascii + 1, other)
            } else {
                (ascii, other + 1)
            }
        });
    ascii > other
}

/// Slug for an entry: from its title, else its link, else `now` to the second.
///
/// A title made mostly of non-ASCII letters would lose them in the slug
/// (`"Київ: 2024"` and `"Харків: 2024"` would both become `2024`), so such
/// titles defer to the link.
pub fn derive_slug(title: &str, link: &str, now: DateTime<Utc>) -> String {
    let title_slug = if mostly_ascii(title) {
        slugify(title)
    } else {
        String::new()
    };

    Some(title_slug)
        .filter(|slug| !slug.is_empty())
        .or_else(|| Some(slugify(link)).filter(|slug| !slug.is_empty()))
        .or_else(|| Some(slugify(title)).filter(|slug| !slug.is_empty()))
        .unwrap_or_else(|| slugify(&now.format("%Y-%m-%dT%H:%M:%S").to_string()))
}
