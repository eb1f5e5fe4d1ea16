//! UTF-8-safe text truncation and whitespace helpers.

/// Truncate a string to at most `max_chars` Unicode characters.
///
/// Respects UTF-8 character boundaries and never panics, even with
/// multi-byte characters. Zero allocation: returns a slice of the input.
#[inline]
pub fn safe_truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        None => s,
        Some((byte_idx, _)) => &s[..byte_idx],
    }
}

/// Truncate `s` to `max_chars` characters, appending `marker` when anything
/// was cut. Content at or below the cap is returned unchanged.
pub fn truncate_with_marker(s: &str, max_chars: usize, marker: &str) -> String {
    let truncated = safe_truncate_chars(s, max_chars);
    if truncated.len() == s.len() {
        s.to_string()
    } else {
        let mut out = String::with_capacity(truncated.len() + marker.len());
        out.push_str(truncated);
        out.push_str(marker);
        out
    }
}

/// Collapse runs of whitespace in extracted DOM text into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_below_cap_is_unchanged() {
        assert_eq!(truncate_with_marker("hello", 5, "..."), "hello");
        assert_eq!(truncate_with_marker("hi", 100, "..."), "hi");
    }

    #[test]
    fn truncate_above_cap_appends_marker() {
        assert_eq!(truncate_with_marker("hello world", 5, "..."), "hello...");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "日本語のテキスト";
        let out = truncate_with_marker(text, 3, "...");
        assert_eq!(out, "日本語...");
    }

    #[test]
    fn safe_truncate_never_panics_on_multibyte() {
        assert_eq!(safe_truncate_chars("🎉🎊🎈", 2), "🎉🎊");
        assert_eq!(safe_truncate_chars("abc", 0), "");
    }

    #[test]
    fn normalize_collapses_runs() {
        assert_eq!(normalize_whitespace("  a \n\n b\t c  "), "a b c");
    }
}
