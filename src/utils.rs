use regex::Regex;
use std::sync::LazyLock;

// Cached regex — compiled once, reused across all calls
static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([A-Za-z0-9_][A-Za-z0-9_\-.:]*)\]").unwrap());

/// Find the largest char boundary in `s` that is <= `max_bytes`.
/// Safe for slicing: `&s[..find_char_boundary(s, max_bytes)]` never panics.
pub fn find_char_boundary(s: &str, max_bytes: usize) -> usize {
    if max_bytes >= s.len() {
        return s.len();
    }
    let mut boundary = max_bytes;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}

/// Extract cited document IDs from an answer.
///
/// The agent instructions mandate `[id]` citations; this pulls them out in
/// order of first appearance so the UI can list sources under the answer.
pub fn extract_citations(answer: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for capture in CITATION_RE.captures_iter(answer) {
        if let Some(id) = capture.get(1) {
            let id = id.as_str().to_string();
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
    }
    seen
}

/// Truncate `s` to at most `max_bytes`, appending an ellipsis when cut.
pub fn preview(s: &str, max_bytes: usize) -> String {
    let end = find_char_boundary(s, max_bytes);
    if end == s.len() {
        s.to_string()
    } else {
        format!("{}...", &s[..end])
    }
}
