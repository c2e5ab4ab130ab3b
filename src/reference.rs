//!
//! Scans raw SQL text for spreadsheet-side data references and classifies each
//! one into its canonical form.
//!
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{Result, SqliteFnError};

/// The canonical form of one spreadsheet-side reference discovered in a query.
#[derive(Debug, Clone, PartialEq)]
pub struct TableReference {
    /// The exact substring that appeared in the query — the substitution key.
    pub original: String,
    pub sheet: Option<String>,
    pub table: Option<String>,
    pub range: Option<String>,
    pub engine_name: String,
}

impl TableReference {
    fn new(original: &str, sheet: Option<String>, table: Option<String>, range: Option<String>) -> Self {
        let engine_name = derive_engine_name(sheet.as_deref(), table.as_deref(), range.as_deref());
        TableReference { original: original.to_string(), sheet, table, range, engine_name }
    }
}

static RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\$?[A-Z]+\$?\d+:\$?[A-Z]+\$?\d+$").unwrap());
static CROSS_SHEET_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:'([^']+)'|([^!]+))!(\$?[A-Z]+\$?\d+:\$?[A-Z]+\$?\d+)$").unwrap()
});
static SHEET_TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:'([^']+)'|([^.]+))\.(.+)$").unwrap());

static ANCHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(FROM|JOIN|UPDATE|INSERT\s+INTO)\b").unwrap());

/// Strip the quote characters a raw token may be wrapped in and un-escape any
/// doubled interior quotes.
fn unwrap_quotes(token: &str) -> String {
    let bytes = token.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"' {
        return token[1..token.len() - 1].replace("\"\"", "\"");
    }
    token.to_string()
}

/// Classify one extracted token into a `TableReference`.
fn classify(token: &str) -> Option<TableReference> {
    if token.is_empty() {
        return None;
    }
    if RANGE_RE.is_match(token) {
        return Some(TableReference::new(token, None, None, Some(token.to_uppercase())));
    }
    if let Some(caps) = CROSS_SHEET_RANGE_RE.captures(token) {
        let sheet = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string());
        let range = caps.get(3).unwrap().as_str().to_uppercase();
        return Some(TableReference::new(token, sheet, None, Some(range)));
    }
    if let Some(caps) = SHEET_TABLE_RE.captures(token) {
        let sheet = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string());
        let table = unwrap_quotes(caps.get(3).unwrap().as_str());
        return Some(TableReference::new(token, sheet, Some(table), None));
    }
    Some(TableReference::new(token, None, Some(unwrap_quotes(token)), None))
}

/// Derivation per the data model: lowercase each component, collapse runs of
/// non-alphanumerics to a single underscore, trim, join, guard against an empty
/// or digit-leading result.
fn derive_engine_name(sheet: Option<&str>, table: Option<&str>, range: Option<&str>) -> String {
    static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").unwrap());

    let sanitize = |s: &str| -> String {
        let lower = s.to_lowercase();
        NON_ALNUM.replace_all(&lower, "_").trim_matches('_').to_string()
    };

    let mut parts = Vec::new();
    if let Some(sheet) = sheet {
        let p = sanitize(sheet);
        if !p.is_empty() {
            parts.push(p);
        }
    }
    if let Some(table) = table {
        let p = sanitize(table);
        if !p.is_empty() {
            parts.push(p);
        }
    } else if let Some(range) = range {
        let p = sanitize(range);
        if !p.is_empty() {
            parts.push(p);
        }
    }

    let mut name = parts.join("_");
    if name.is_empty() {
        name = "table_ref".to_string();
    }
    if name.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        name = format!("r_{name}");
    }
    name
}

/// Replace string-literal interiors, single-line comments, and block comments
/// with spaces, preserving the original length and every other character's
/// position — the "search projection" used by every scanning pass in this
/// module. A single-quoted run immediately followed by `.` or `!` is left
/// untouched, since that denotes a quoted sheet name rather than a literal.
pub fn search_projection(query: &str) -> String {
    let chars: Vec<char> = query.chars().collect();
    let mut out = chars.clone();
    let n = chars.len();
    let mut i = 0;
    while i < n {
        match chars[i] {
            '-' if i + 1 < n && chars[i + 1] == '-' => {
                let start = i;
                while i < n && chars[i] != '\n' {
                    i += 1;
                }
                for j in start..i {
                    out[j] = ' ';
                }
            }
            '/' if i + 1 < n && chars[i + 1] == '*' => {
                let start = i;
                i += 2;
                while i + 1 < n && !(chars[i] == '*' && chars[i + 1] == '/') {
                    i += 1;
                }
                i = (i + 2).min(n);
                for j in start..i {
                    out[j] = ' ';
                }
            }
            '\'' => {
                let start = i;
                i += 1;
                while i < n {
                    if chars[i] == '\'' {
                        if i + 1 < n && chars[i + 1] == '\'' {
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
                let end = i;
                // a quoted sheet name: preserve verbatim
                let followed_by_sheet_marker = end < n && (chars[end] == '.' || chars[end] == '!');
                if !followed_by_sheet_marker && end > start + 1 {
                    for j in (start + 1)..(end - 1) {
                        out[j] = ' ';
                    }
                }
            }
            _ => {
                i += 1;
            }
        }
    }
    out.into_iter().collect()
}

/// Extract one reference token starting at `pos` in `search`, per the grammar
/// in §4.1: quoted sheet + tail, unquoted sheet/table chain, double-quoted
/// identifier, or a bare run of identifier/range characters.
fn extract_token(search: &str, pos: usize) -> Option<(String, usize)> {
    let rest = &search[pos..];
    let trimmed_start = rest.len() - rest.trim_start().len();
    let start = pos + trimmed_start;
    let rest = &search[start..];
    if rest.is_empty() {
        return None;
    }

    if rest.starts_with('\'') {
        // quoted sheet name, must be followed by . or !
        let mut end = 1;
        let bytes: Vec<char> = rest.chars().collect();
        let n = bytes.len();
        while end < n {
            if bytes[end] == '\'' {
                if end + 1 < n && bytes[end + 1] == '\'' {
                    end += 2;
                    continue;
                }
                end += 1;
                break;
            }
            end += 1;
        }
        if end < n && (bytes[end] == '.' || bytes[end] == '!') {
            end += 1;
            while end < n && is_ident_char(bytes[end]) {
                end += 1;
            }
            let token: String = bytes[..end].iter().collect();
            return Some((token, start + token.len()));
        }
        return None;
    }

    if rest.starts_with('"') {
        let bytes: Vec<char> = rest.chars().collect();
        let n = bytes.len();
        let mut end = 1;
        while end < n {
            if bytes[end] == '"' {
                if end + 1 < n && bytes[end + 1] == '"' {
                    end += 2;
                    continue;
                }
                end += 1;
                break;
            }
            end += 1;
        }
        let token: String = bytes[..end].iter().collect();
        return Some((token, start + token.len()));
    }

    let bytes: Vec<char> = rest.chars().collect();
    let n = bytes.len();
    let mut end = 0;
    while end < n && is_ident_char(bytes[end]) {
        end += 1;
    }
    if end == 0 {
        return None;
    }
    // allow one '.' or '!' chain continuation (unquoted sheet/table form)
    if end < n && (bytes[end] == '.' || bytes[end] == '!') {
        end += 1;
        while end < n && is_ident_char(bytes[end]) {
            end += 1;
        }
    }
    let token: String = bytes[..end].iter().collect();
    Some((token, start + token.len()))
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == ':'
}

static CTE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bWITH\s+(?:RECURSIVE\s+)?|,\s*)([A-Za-z_][A-Za-z0-9_]*)\s*(?:\([^)]*\))?\s+AS\s*\(")
        .unwrap()
});
static CREATE_TABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bCREATE\s+(?:TEMP(?:ORARY)?\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?([A-Za-z_][A-Za-z0-9_]*)")
        .unwrap()
});

/// Names introduced by `WITH <name> AS (...)` and, for multi-statement
/// batches, by an earlier `CREATE [TEMP] TABLE <name>` are not spreadsheet
/// references even though they appear after a `FROM`/`JOIN` anchor.
fn locally_defined_names(search: &str) -> std::collections::HashSet<String> {
    let mut names = std::collections::HashSet::new();
    for caps in CTE_NAME_RE.captures_iter(search) {
        names.insert(caps[1].to_lowercase());
    }
    for caps in CREATE_TABLE_NAME_RE.captures_iter(search) {
        names.insert(caps[1].to_lowercase());
    }
    names
}

/// Enumerate every `TableReference` in first-occurrence order, deduplicated by
/// `original`. Excludes names introduced by `WITH ... AS (...)` or an earlier
/// `CREATE [TEMP] TABLE` in the same query (see design notes).
pub fn extract_references(query: &str) -> Vec<TableReference> {
    let search = search_projection(query);
    let local_names = locally_defined_names(&search);
    let mut refs: Vec<TableReference> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for m in ANCHOR_RE.find_iter(&search) {
        let after_anchor = m.end();
        if let Some((token, _end)) = extract_token(&search, after_anchor) {
            if seen.insert(token.clone()) {
                if let Some(r) = classify(&token) {
                    let is_local = r.sheet.is_none()
                        && r.table.as_deref().map(|t| local_names.contains(&t.to_lowercase())).unwrap_or(false);
                    if !is_local {
                        refs.push(r);
                    }
                }
            }
        }
    }
    refs
}

/// An empty reference string (e.g. `Sheet1!` with nothing after the marker)
/// fails with a reference-syntax error rather than being silently classified.
pub fn parse_reference(token: &str) -> Result<TableReference> {
    if token.trim().is_empty() {
        return Err(SqliteFnError::QuerySyntax("empty reference".to_string()));
    }
    classify(token).ok_or_else(|| SqliteFnError::QuerySyntax(format!("cannot parse reference: {token}")))
}

/// Count bare `?` placeholders outside literals/comments/identifiers.
pub fn count_parameters(query: &str) -> usize {
    let search = search_projection(query);
    search.chars().filter(|&c| c == '?').count()
}

pub fn is_parameterized(query: &str) -> bool {
    count_parameters(query) > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bare_table() {
        let refs = extract_references("SELECT * FROM Orders");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].table.as_deref(), Some("Orders"));
        assert_eq!(refs[0].engine_name, "orders");
    }

    #[test]
    fn ignores_string_literals_and_comments() {
        let refs = extract_references("SELECT 'FROM FakeTable' AS x -- FROM Nope\n FROM Orders");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].table.as_deref(), Some("Orders"));
    }

    #[test]
    fn block_comments_dont_contribute() {
        let refs = extract_references("SELECT * /* FROM Hidden */ FROM Orders");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].table.as_deref(), Some("Orders"));
    }

    #[test]
    fn quoted_sheet_followed_by_dot_is_kept() {
        let refs = extract_references("SELECT * FROM 'My Sheet'.Orders");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].sheet.as_deref(), Some("My Sheet"));
        assert_eq!(refs[0].table.as_deref(), Some("Orders"));
    }

    #[test]
    fn cross_sheet_range() {
        let refs = extract_references("SELECT * FROM Sheet2!A1:C10");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].sheet.as_deref(), Some("Sheet2"));
        assert_eq!(refs[0].range.as_deref(), Some("A1:C10"));
    }

    #[test]
    fn bare_range() {
        let refs = extract_references("SELECT * FROM A1:M100");
        assert_eq!(refs[0].range.as_deref(), Some("A1:M100"));
        assert!(refs[0].sheet.is_none());
    }

    #[test]
    fn dedup_by_original_first_occurrence() {
        let refs = extract_references("SELECT * FROM Orders JOIN Orders ON 1=1");
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn count_parameters_skips_literal_question_marks() {
        assert_eq!(count_parameters("SELECT 1 FROM t WHERE x = 'a?b' AND y = ?"), 1);
    }

    #[test]
    fn engine_name_never_starts_with_digit() {
        let refs = extract_references("SELECT * FROM '2024'.Orders");
        assert!(!refs[0].engine_name.chars().next().unwrap().is_ascii_digit());
    }

    #[test]
    fn cte_name_is_excluded_from_references() {
        let q = "WITH RECURSIVE cnt(x) AS (SELECT 1 UNION ALL SELECT x+1 FROM cnt WHERE x < 5) SELECT x FROM cnt";
        let refs = extract_references(q);
        assert!(refs.is_empty());
    }

    #[test]
    fn create_table_name_is_excluded_from_later_statement() {
        let q = "CREATE TEMP TABLE scratch(x INTEGER); INSERT INTO scratch VALUES (1); SELECT * FROM scratch";
        let refs = extract_references(q);
        assert!(refs.is_empty());
    }

    #[test]
    fn non_local_table_alongside_cte_is_still_extracted() {
        let q = "WITH recent AS (SELECT * FROM Orders) SELECT * FROM recent";
        let refs = extract_references(q);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].table.as_deref(), Some("Orders"));
    }
}
