//! Sibling ordering inside a storage.
//!
//! Readers such as Word expect siblings sorted by UTF-16 length first and
//! then case-insensitively, with `_VBA_PROJECT` and `__`-prefixed names
//! pushed behind other names of the same length.

use crate::common::binary::utf16_len;
use std::cmp::Ordering;

const VBA_PROJECT: &str = "_VBA_PROJECT";

/// Total order over entry names.
pub fn compare_names(name1: &str, name2: &str) -> Ordering {
    if name1 == name2 {
        return Ordering::Equal;
    }

    match utf16_len(name1).cmp(&utf16_len(name2)) {
        Ordering::Equal => {},
        other => return other,
    }

    if name1 == VBA_PROJECT {
        return Ordering::Greater;
    }
    if name2 == VBA_PROJECT {
        return Ordering::Less;
    }

    match (name1.starts_with("__"), name2.starts_with("__")) {
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {},
    }

    // Ties under case folding fall back to the raw names so the order stays total.
    name1
        .to_uppercase()
        .cmp(&name2.to_uppercase())
        .then_with(|| name1.cmp(name2))
}

/// Case-insensitive name equality, as used for lookups.
#[inline]
pub fn names_match(name1: &str, name2: &str) -> bool {
    name1 == name2 || name1.to_uppercase() == name2.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(names: &[&str]) -> Vec<String> {
        let mut names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        names.sort_by(|a, b| compare_names(a, b));
        names
    }

    #[test]
    fn test_length_before_case() {
        assert_eq!(
            sorted(&["WordDocument", "1Table", "Data", "\u{5}SummaryInformation"]),
            vec!["Data", "1Table", "WordDocument", "\u{5}SummaryInformation"]
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(compare_names("abc", "ABD"), Ordering::Less);
        assert_eq!(compare_names("ABC", "abd"), Ordering::Less);
        assert_eq!(compare_names("b", "A"), Ordering::Greater);
    }

    #[test]
    fn test_equal_names_are_equal() {
        assert_eq!(compare_names("Book", "Book"), Ordering::Equal);
        assert_eq!(compare_names(VBA_PROJECT, VBA_PROJECT), Ordering::Equal);
        assert_ne!(compare_names("BOOK", "book"), Ordering::Equal);
    }

    #[test]
    fn test_special_names_last() {
        assert_eq!(
            sorted(&["_VBA_PROJECT", "ABCDEFGHIJKL", "__srp_0xxxxx", "abcdefghijkm"]),
            vec!["ABCDEFGHIJKL", "abcdefghijkm", "__srp_0xxxxx", "_VBA_PROJECT"]
        );
        assert_eq!(compare_names("__b", "__A"), Ordering::Greater);
    }

    #[test]
    fn test_utf16_length_not_byte_length() {
        // Two UTF-16 units but six UTF-8 bytes.
        assert_eq!(compare_names("\u{4E2D}\u{6587}", "abc"), Ordering::Less);
    }

    #[test]
    fn test_names_match() {
        assert!(names_match("Book", "BOOK"));
        assert!(!names_match("Book", "Books"));
    }
}
