//! Output truncation.

/// Maximum number of characters kept per output stream.
pub const MAX_OUTPUT_CHARS: usize = 100_000;

/// Truncate `text` to at most `max_chars` characters.
///
/// Text within the limit is returned unmodified. Otherwise the first
/// `max_chars` characters are kept and a marker line with the exact number
/// of omitted characters is appended.
pub fn truncate_output(mut text: String, max_chars: usize) -> String {
    let cut = match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => byte_idx,
        None => return text,
    };

    let omitted = text[cut..].chars().count();
    text.truncate(cut);
    text.push_str(&format!("\n\n--- truncated ({} chars omitted) ---", omitted));
    text
}
