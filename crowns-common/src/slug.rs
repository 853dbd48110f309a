//! Slug derivation for monster artwork lookups
//!
//! Slugs are never persisted; they only map a display name to a static
//! asset path.

use unicode_normalization::UnicodeNormalization;

/// Image served when a monster (or user avatar) has no artwork
pub const PLACEHOLDER_IMAGE: &str = "/monster-placeholder.png";

/// URL prefix of per-monster artwork
pub const MONSTER_IMAGE_PREFIX: &str = "/monsters";

/// Lowercase ASCII slug: accents stripped, `&` spelled out, every other run
/// of non-alphanumerics collapsed to a single hyphen.
pub fn slugify(name: &str) -> String {
    let folded: String = name
        .to_lowercase()
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect::<String>()
        .replace('&', "and");

    let mut slug = String::with_capacity(folded.len());
    let mut pending_hyphen = false;
    for c in folded.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Conventional artwork path for a monster name
pub fn monster_image_path(name: &str) -> String {
    format!("{}/{}.png", MONSTER_IMAGE_PREFIX, slugify(name))
}
