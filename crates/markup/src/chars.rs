//! Character classes and small byte-scanning helpers shared by the parsers.

use memchr::memmem;

/// HTML whitespace: space, tab, line feed, form feed, carriage return.
#[inline]
pub(crate) fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\u{000C}' | '\r')
}

/// Generic XML name-start test (letters, `_` and `:`).
#[inline]
pub(crate) fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':'
}

/// Generic XML name-character test.
#[inline]
pub(crate) fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.' | '\u{00B7}')
}

#[inline]
pub(crate) fn char_at(source: &str, pos: usize) -> Option<char> {
    source.get(pos..).and_then(|rest| rest.chars().next())
}

/// End of the XML name starting at `pos`, or `None` if no name starts there.
pub(crate) fn name_end(source: &str, pos: usize) -> Option<usize> {
    let rest = source.get(pos..)?;
    let mut chars = rest.char_indices();
    match chars.next() {
        Some((_, c)) if is_name_start(c) => {}
        _ => return None,
    }
    for (offset, c) in chars {
        if !is_name_char(c) {
            return Some(pos + offset);
        }
    }
    Some(source.len())
}

/// Case-insensitive ASCII prefix test at `start`.
#[inline]
pub(crate) fn starts_with_ignore_ascii_case_at(haystack: &[u8], start: usize, needle: &[u8]) -> bool {
    haystack.len() >= start + needle.len()
        && haystack[start..start + needle.len()].eq_ignore_ascii_case(needle)
}

/// First occurrence of `needle` in `haystack` at or after `from`.
#[inline]
pub(crate) fn find_from(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    memmem::find(&haystack[from..], needle).map(|rel| from + rel)
}

/// Every start position of `needle` in `haystack`, ascending. Overlapping
/// occurrences are included.
pub(crate) fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }
    let finder = memmem::Finder::new(needle);
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(rel) = finder.find(&haystack[from..]) {
        found.push(from + rel);
        from += rel + 1;
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_end_requires_a_name_start_character() {
        assert_eq!(name_end("<div class>", 1), Some(4));
        assert_eq!(name_end("<1div>", 1), None);
        assert_eq!(name_end("<my-el.x:y>", 1), Some(10));
        assert_eq!(name_end("<héllo>", 1), Some(7));
        assert_eq!(name_end("<abc", 1), Some(4));
    }

    #[test]
    fn find_all_reports_every_start() {
        assert_eq!(find_all(b"<!-- a <!-- b", b"<!--"), vec![0, 7]);
        assert_eq!(find_all(b"----", b"--"), vec![0, 1, 2]);
        assert!(find_all(b"abc", b"").is_empty());
    }

    #[test]
    fn find_from_handles_out_of_range_start() {
        assert_eq!(find_from(b"-->", 0, b"-->"), Some(0));
        assert_eq!(find_from(b"-->", 4, b"-->"), None);
    }

    #[test]
    fn ignore_case_prefix() {
        assert!(starts_with_ignore_ascii_case_at(b"x<!DocType", 1, b"<!doctype"));
        assert!(!starts_with_ignore_ascii_case_at(b"<!doc", 0, b"<!doctype"));
    }
}
