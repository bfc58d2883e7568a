//! Slug normalisation and sibling-unique slug resolution.
//!
//! A slug is the filesystem-safe path segment of a page: lowercase ASCII
//! letters and digits separated by single hyphens.

use crate::{LeafTreeError, Result};
use std::collections::HashSet;

/// Segments that cannot be used as a page slug.
///
/// `index` would shadow a container's own index document; the others are
/// route prefixes claimed by presentation layers.
pub const RESERVED_SLUGS: &[&str] = &["e", "edit", "api", "assets", "index"];

/// Used when a title normalises to nothing (e.g. `"!!!"`).
const FALLBACK_SLUG: &str = "page";

/// Turns free text into a slug.
///
/// Letters are lowercased, `&` becomes `and`, `@` becomes `at`, and other
/// non-ASCII characters are transliterated (`ä` to `a`, `п` to `p`, ...).
/// Any run of remaining characters collapses into a single hyphen. Leading
/// and trailing hyphens are trimmed. May return an empty string.
///
/// # Examples
///
/// ```rust
/// use leaftree_core::normalize_slug;
///
/// assert_eq!(normalize_slug("My Page"), "my-page");
/// assert_eq!(normalize_slug("Äpfel & Bäume!"), "apfel-and-baume");
/// assert_eq!(normalize_slug("Привет мир"), "privet-mir");
/// ```
pub fn normalize_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for c in title.chars().flat_map(char::to_lowercase) {
        let spelled = match c {
            '&' => Some(" and "),
            '@' => Some(" at "),
            c if c.is_ascii() => None,
            c => deunicode::deunicode_char(c),
        };
        let mut push = |b: char| {
            if b.is_ascii_alphanumeric() {
                if pending_hyphen && !slug.is_empty() {
                    slug.push('-');
                }
                pending_hyphen = false;
                slug.push(b.to_ascii_lowercase());
            } else {
                pending_hyphen = true;
            }
        };
        match spelled {
            Some(s) => s.chars().for_each(&mut push),
            None if c.is_ascii() => push(c),
            None => push(' '),
        }
    }
    slug
}

/// Checks that `slug` can be used as a page path segment.
///
/// # Errors
///
/// Returns [`LeafTreeError::InvalidSlug`] if the slug is empty, reserved,
/// or not of the form `[a-z0-9]+(-[a-z0-9]+)*`.
pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() {
        return Err(LeafTreeError::InvalidSlug("slug must not be empty".to_string()));
    }
    if RESERVED_SLUGS.contains(&slug) {
        return Err(LeafTreeError::InvalidSlug(format!("slug '{slug}' is reserved")));
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(LeafTreeError::InvalidSlug(
            "slug must not start or end with a hyphen".to_string(),
        ));
    }
    let well_formed = slug
        .split('-')
        .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    if !well_formed {
        return Err(LeafTreeError::InvalidSlug(
            "slug must contain only lowercase letters, numbers and single hyphens".to_string(),
        ));
    }
    Ok(())
}

/// Returns a slug for `desired` that none of `siblings` already uses.
///
/// The normalised title is tried first, then `-1`, `-2`, … are appended until
/// a free, valid candidate is found. Deterministic for an unchanged sibling set.
///
/// # Examples
///
/// ```rust
/// use leaftree_core::unique_slug;
///
/// assert_eq!(unique_slug(["my-page", "my-page-1"], "My Page"), "my-page-2");
/// ```
pub fn unique_slug<'a, I>(siblings: I, desired: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: HashSet<&str> = siblings.into_iter().collect();
    let mut base = normalize_slug(desired);
    if base.is_empty() {
        base = FALLBACK_SLUG.to_string();
    }

    let mut candidate = base.clone();
    let mut suffix = 1u64;
    while taken.contains(candidate.as_str()) || validate_slug(&candidate).is_err() {
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }
    candidate
}
