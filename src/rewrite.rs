//!
//! Substitutes every original spreadsheet reference in a query with its
//! derived engine identifier, without touching text inside literals/comments.
//!
use crate::reference::{search_projection, TableReference};

/// Rewrite `query`, replacing every reference's `original` text with its
/// `engine_name`. Keys are processed longest-first so a short reference never
/// pre-empts a longer one that contains it as a substring.
pub fn rewrite_query(query: &str, references: &[TableReference]) -> String {
    let mut ordered: Vec<&TableReference> = references.iter().collect();
    ordered.sort_by(|a, b| b.original.len().cmp(&a.original.len()));

    let search = search_projection(query);
    let mut output: Vec<char> = query.chars().collect();
    let mut search_chars: Vec<char> = search.chars().collect();

    for reference in ordered {
        let quoted = reference.original.contains('\'');
        let spans = find_spans(&search_chars, &reference.original, quoted);
        for (start, end) in spans.into_iter().rev() {
            let replacement: Vec<char> = reference.engine_name.chars().collect();
            output.splice(start..end, replacement.clone());
            search_chars.splice(start..end, replacement);
        }
    }
    output.into_iter().collect()
}

/// Locate every case-insensitive occurrence of `needle` in `haystack`. Quoted
/// keys (containing `'`) match verbatim; unquoted keys require a word
/// boundary (non-identifier character or string edge) on both sides.
fn find_spans(haystack: &[char], needle: &str, quoted: bool) -> Vec<(usize, usize)> {
    let needle_chars: Vec<char> = needle.chars().collect();
    if needle_chars.is_empty() {
        return Vec::new();
    }
    let needle_lower: Vec<char> = needle_chars.iter().map(|c| c.to_ascii_lowercase()).collect();
    let n = haystack.len();
    let m = needle_chars.len();
    let mut spans = Vec::new();
    let mut i = 0;
    while i + m <= n {
        let window_matches = haystack[i..i + m]
            .iter()
            .zip(needle_lower.iter())
            .all(|(a, b)| a.to_ascii_lowercase() == *b);
        if window_matches {
            let boundary_ok = quoted || {
                let before_ok = i == 0 || !is_word_char(haystack[i - 1]);
                let after_ok = i + m == n || !is_word_char(haystack[i + m]);
                before_ok && after_ok
            };
            if boundary_ok {
                spans.push((i, i + m));
                i += m;
                continue;
            }
        }
        i += 1;
    }
    spans
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == ':' || c == '\''
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::extract_references;

    #[test]
    fn rewrites_bare_table() {
        let q = "SELECT * FROM Orders WHERE Orders.id > 1";
        let refs = extract_references(q);
        let rewritten = rewrite_query(q, &refs);
        assert_eq!(rewritten, "SELECT * FROM orders WHERE orders.id > 1");
    }

    #[test]
    fn does_not_rewrite_inside_literals() {
        let q = "SELECT 'Orders are great' FROM Orders";
        let refs = extract_references(q);
        let rewritten = rewrite_query(q, &refs);
        assert_eq!(rewritten, "SELECT 'Orders are great' FROM orders");
    }

    #[test]
    fn longer_reference_wins_over_contained_shorter_one() {
        let q = "SELECT * FROM 'My Sheet'.Orders";
        let refs = extract_references(q);
        let rewritten = rewrite_query(q, &refs);
        assert_eq!(rewritten, format!("SELECT * FROM {}", refs[0].engine_name));
    }
}
