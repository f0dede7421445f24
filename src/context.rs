//! Claim context windows around citation markers.

/// Characters taken on each side of a citation marker.
pub const CLAIM_RADIUS: usize = 400;

/// Trimmed window of up to `radius` characters on each side of `offset`
/// (a byte offset), clipped to the document. Offsets past the end, or inside a
/// multi-byte character, are moved back to the nearest character boundary.
pub fn claim_window(text: &str, offset: usize, radius: usize) -> String {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }

    let start = text[..offset]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(offset);
    let end = text[offset..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| offset + i)
        .unwrap_or(text.len());

    text[start..end].trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_clipped_to_document() {
        assert_eq!(claim_window("  short text [1]  ", 12, CLAIM_RADIUS), "short text [1]");
    }

    #[test]
    fn test_window_radius_in_characters() {
        let text = format!("{}[1]{}", "a".repeat(10), "b".repeat(10));
        assert_eq!(claim_window(&text, 10, 3), "aaa[1]");
        assert_eq!(claim_window(&text, 10, 5), "aaaaa[1]bb");
    }

    #[test]
    fn test_window_multibyte_characters() {
        let text = "ééééé[1]ééééé";
        let offset = text.find('[').unwrap();
        assert_eq!(claim_window(text, offset, 2), "éé[1");
    }

    #[test]
    fn test_offset_out_of_range_or_mid_char() {
        assert_eq!(claim_window("abc", 99, 2), "bc");
        assert_eq!(claim_window("é", 1, 5), "é");
        assert_eq!(claim_window("", 0, 5), "");
    }
}
