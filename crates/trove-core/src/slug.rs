//! URL-safe slug derivation for manufacturers and asset models

/// Derive a slug from a display name.
///
/// Lower-cases the name and collapses every run of non-alphanumeric
/// characters into a single hyphen, trimming hyphens at both ends.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}
