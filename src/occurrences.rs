//! In-text citation marker scanning.
//!
//! Finds numeric bracket groups (`[3]`, `[1,4]`, `[2-5]`, `[1, 2–4]`) anywhere
//! in the manuscript, the reference list included, and expands each group into
//! one `Occurrence` per cited number.

use crate::models::Occurrence;

use once_cell::sync::Lazy;
use regex::Regex;

/// Ranges wider than this are treated as malformed tokens.
const MAX_RANGE_SPAN: u32 = 500;

static BRACKET_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([0-9,\s\-\u{2013}]*[0-9][0-9,\s\-\u{2013}]*)\]").unwrap());

/// Every citation number in document order. A group expands in token order and
/// all of its numbers share the group's byte offset. Duplicates are kept.
pub fn scan_occurrences(text: &str) -> Vec<Occurrence> {
    let mut occurrences = Vec::new();
    for caps in BRACKET_GROUP.captures_iter(text) {
        let (Some(group), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        for number in expand_group(inner.as_str()) {
            occurrences.push(Occurrence {
                number,
                offset: group.start(),
            });
        }
    }
    tracing::debug!(count = occurrences.len(), "scanned citation occurrences");
    occurrences
}

/// Expand the inside of a bracket group (`"1,3-5"`) into numbers. Malformed
/// tokens are skipped without discarding the rest of the group.
pub fn expand_group(inner: &str) -> Vec<u32> {
    let mut numbers = Vec::new();
    for token in inner.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match token.split_once(|c| c == '-' || c == '\u{2013}') {
            Some((a, b)) => {
                let (Ok(a), Ok(b)) = (a.trim().parse::<u32>(), b.trim().parse::<u32>()) else {
                    continue;
                };
                let (lo, hi) = (a.min(b), a.max(b));
                if lo == 0 || hi - lo > MAX_RANGE_SPAN {
                    continue;
                }
                numbers.extend(lo..=hi);
            }
            None => match token.parse::<u32>() {
                Ok(n) if n > 0 => numbers.push(n),
                _ => {}
            },
        }
    }
    numbers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(text: &str) -> Vec<u32> {
        scan_occurrences(text).iter().map(|o| o.number).collect()
    }

    #[test]
    fn test_single_marker() {
        let occs = scan_occurrences("Shown before [3].");
        assert_eq!(occs, vec![Occurrence { number: 3, offset: 13 }]);
    }

    #[test]
    fn test_list_and_range_share_offset() {
        let text = "See [1,3-5] for details.";
        let occs = scan_occurrences(text);
        let nums: Vec<u32> = occs.iter().map(|o| o.number).collect();
        assert_eq!(nums, vec![1, 3, 4, 5]);
        assert!(occs.iter().all(|o| o.offset == 4));
    }

    #[test]
    fn test_en_dash_and_reversed_range() {
        assert_eq!(numbers("[2\u{2013}4]"), vec![2, 3, 4]);
        assert_eq!(numbers("[5-3]"), vec![3, 4, 5]);
    }

    #[test]
    fn test_spaces_inside_group() {
        assert_eq!(numbers("[1, 2 - 3 ]"), vec![1, 2, 3]);
    }

    #[test]
    fn test_malformed_tokens_skipped() {
        assert_eq!(numbers("[1,-,4]"), vec![1, 4]);
        assert_eq!(numbers("[1-2-3, 6]"), vec![6]);
        assert_eq!(numbers("[0, 2]"), vec![2]);
        assert_eq!(numbers("[1-100000]"), Vec::<u32>::new());
    }

    #[test]
    fn test_duplicates_preserved_in_document_order() {
        assert_eq!(numbers("A [2]. B [1]. C [2]."), vec![2, 1, 2]);
    }

    #[test]
    fn test_non_numeric_brackets_ignored() {
        assert_eq!(numbers("[a] [x1] [] [,] [-] [Smith 2020]"), Vec::<u32>::new());
    }

    #[test]
    fn test_reference_list_markers_are_scanned() {
        let text = "Claim [1].\n\nReferences\n[1] A. Author. 2020.";
        assert_eq!(numbers(text), vec![1, 1]);
    }
}
