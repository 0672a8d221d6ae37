//! Excerpt selection for a single search hit.
//!
//! Every slice here is taken on char indices, never byte offsets, so
//! multi-byte text is never split and windows never run past either end.

/// Appended to every excerpt that was cut from longer text.
pub const ELLIPSIS: &str = "...";

/// Placed between highlight fragments.
pub const FRAGMENT_SEPARATOR: &str = "... ";

/// Pick the excerpt shown for one hit.
///
/// Priority: highlight fragments, then a window centered on the first
/// case-insensitive occurrence of `query`, then the head of `content`.
/// The result is at most `snippet_length` chars plus [`ELLIPSIS`].
pub fn select_excerpt(
    content: &str,
    query: &str,
    highlights: &[String],
    snippet_length: usize,
) -> String {
    let fragments: Vec<&str> = highlights
        .iter()
        .map(String::as_str)
        .filter(|f| !f.trim().is_empty())
        .collect();

    if !fragments.is_empty() {
        let joined = fragments.join(FRAGMENT_SEPARATOR);
        if joined.chars().count() > snippet_length {
            return format!("{}{ELLIPSIS}", take_chars(&joined, snippet_length));
        }
        return joined;
    }

    let chars: Vec<char> = content.chars().collect();
    let needle: Vec<char> = query.trim().chars().collect();

    if let Some(pos) = find_ignore_case(&chars, &needle) {
        let (start, end) = match_window(pos, needle.len(), chars.len(), snippet_length);
        let window: String = chars[start..end].iter().collect();
        return format!("{window}{ELLIPSIS}");
    }

    format!("{}{ELLIPSIS}", take_chars(content, snippet_length))
}

/// Bounds of a `length`-char window centered on a match, clamped to the text.
///
/// The window always starts at or before the match so a match no longer
/// than the window is fully contained.
fn match_window(pos: usize, match_len: usize, total: usize, length: usize) -> (usize, usize) {
    let center = pos + match_len / 2;
    let mut start = center.saturating_sub(length / 2).min(pos);
    let end = (start + length).min(total);
    if end - start < length {
        start = end.saturating_sub(length).min(pos);
    }
    (start, end)
}

/// Char index of the first case-insensitive occurrence of `needle`.
fn find_ignore_case(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }

    (0..=haystack.len() - needle.len()).find(|&i| {
        haystack[i..i + needle.len()]
            .iter()
            .zip(needle)
            .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
    })
}

fn take_chars(text: &str, count: usize) -> String {
    text.chars().take(count).collect()
}
