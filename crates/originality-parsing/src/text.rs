/// Return the prefix of `s` holding at most `max_chars` characters.
///
/// Slices on a character boundary, never in the middle of a UTF-8 codepoint.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Byte offset of the character at index `char_idx`, or `s.len()` past the end.
pub(crate) fn char_byte_offset(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
