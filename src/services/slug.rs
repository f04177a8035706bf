//! URL slug generation

/// Lowercase ASCII slug: alphanumerics are kept, every run of anything else
/// becomes a single `-`, and no `-` leads or trails.
pub fn generate_slug(title: &str) -> String {
    let mut result = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !result.is_empty() {
                result.push('-');
            }
            pending_hyphen = false;
            result.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    result
}

/// Whether `slug` is already in canonical form
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && generate_slug(slug) == slug
}
