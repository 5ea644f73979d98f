/// URL slug generation
///
/// Slugs are derived from article titles: lowercase ASCII letters, digits and
/// single hyphens, never starting or ending with a hyphen.
///
/// ```
/// use folio_shared::services::slug::slugify;
///
/// assert_eq!(slugify("Hello World!"), "hello-world");
/// assert_eq!(slugify("  Rust --  and  C++ "), "rust-and-c");
/// ```

/// Converts a title into a URL slug
///
/// The result may be empty when the title has no ASCII letters or digits.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for ch in title.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() || ch == '-' {
            pending_hyphen = true;
        } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        }
    }

    slug
}
