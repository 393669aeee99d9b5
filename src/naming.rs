//! Filename sanitizing for saved captures.
//!
//! Shot lists are authored by hand in spreadsheets, so the `filename` column
//! can hold anything: spaces, slashes, accented characters, a leading dot.
//! Every save path runs the requested name through [`sanitize_filename`]
//! before touching storage, so the same rules apply whether the image lands
//! in the granted directory or in the downloads fallback.
//!
//! ## Rules
//!
//! - Empty input → [`DEFAULT_FILENAME`]
//! - Any character outside `A-Z a-z 0-9 . _ -` → `_`
//! - A leading `.` gets a `_` prefix (`.hidden` → `_.hidden`)
//! - Result is cut to [`MAX_FILENAME_LEN`] characters
//!
//! ```text
//! "SKU 1042/front.jpg"  → "SKU_1042_front.jpg"
//! "crème-back.jpg"      → "cr_me-back.jpg"
//! ".hidden"             → "_.hidden"
//! ""                    → "downloaded_image.jpg"
//! ```

/// Name used when the requested filename is empty.
pub const DEFAULT_FILENAME: &str = "downloaded_image.jpg";

/// Longest filename most filesystems accept.
pub const MAX_FILENAME_LEN: usize = 255;

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Normalize arbitrary text into a filesystem-safe file name.
///
/// The output contains only ASCII, so the length cap is applied on bytes
/// without risk of splitting a character.
pub fn sanitize_filename(name: &str) -> String {
    if name.is_empty() {
        return DEFAULT_FILENAME.to_string();
    }
    let mut sanitized: String = name
        .chars()
        .map(|c| if is_allowed(c) { c } else { '_' })
        .collect();
    if sanitized.starts_with('.') {
        sanitized.insert(0, '_');
    }
    sanitized.truncate(MAX_FILENAME_LEN);
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_uses_default() {
        assert_eq!(sanitize_filename(""), DEFAULT_FILENAME);
    }

    #[test]
    fn plain_name_unchanged() {
        assert_eq!(sanitize_filename("A1042_red-front.jpg"), "A1042_red-front.jpg");
    }

    #[test]
    fn spaces_and_slashes_replaced() {
        assert_eq!(sanitize_filename("SKU 1042/front.jpg"), "SKU_1042_front.jpg");
    }

    #[test]
    fn path_traversal_neutralized() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "_.._.._etc_passwd");
    }

    #[test]
    fn non_ascii_replaced_per_character() {
        assert_eq!(sanitize_filename("crème-back.jpg"), "cr_me-back.jpg");
    }

    #[test]
    fn leading_dot_prefixed() {
        let s = sanitize_filename(".hidden");
        assert_eq!(s, "_.hidden");
        assert!(s.starts_with('_'));
    }

    #[test]
    fn whitespace_only_is_not_default() {
        assert_eq!(sanitize_filename("  "), "__");
    }

    #[test]
    fn long_name_truncated() {
        let long = "a".repeat(400);
        assert_eq!(sanitize_filename(&long).len(), MAX_FILENAME_LEN);
    }

    #[test]
    fn long_dotted_name_truncated_after_prefix() {
        let long = format!(".{}", "b".repeat(300));
        let s = sanitize_filename(&long);
        assert_eq!(s.len(), MAX_FILENAME_LEN);
        assert!(s.starts_with("_."));
    }
}
