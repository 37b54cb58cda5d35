/// Maximum desktop notification body length (Windows toast limit is 256).
pub(crate) const MAX_BODY_LEN: usize = 250;

/// Truncates to at most `max` bytes including a trailing `...`, snapping to
/// a char boundary so a multi-byte character is never split.
pub(crate) fn truncate_body(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max.saturating_sub(3);
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
