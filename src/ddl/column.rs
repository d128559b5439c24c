//! Column definition parsing
//!
//! Only the declared name is extracted; data types, defaults and inline
//! constraints are discarded.

use super::identifier::normalize_identifier;

/// Leading keywords of table-level definitions that are not columns.
/// Multi-word entries may be separated by any run of whitespace.
const TABLE_LEVEL_KEYWORDS: &[&[&str]] = &[
    &["constraint"],
    &["primary", "key"],
    &["unique"],
    &["foreign", "key"],
    &["check"],
    &["index"],
    &["alter"],
];

/// Return the column name declared by `segment`, or `""` for table-level
/// constraints and segments with no recognizable name.
///
/// ```
/// use ddl_registry::ddl::parse_column_name;
///
/// assert_eq!(parse_column_name("[OrderId] [int] NOT NULL"), "OrderId");
/// assert_eq!(parse_column_name("PRIMARY KEY (OrderId)"), "");
/// ```
pub fn parse_column_name(segment: &str) -> String {
    let s = segment.trim();
    if is_table_level_definition(s) {
        return String::new();
    }

    let s = s.strip_suffix(',').map(str::trim_end).unwrap_or(s);

    match leading_name(s) {
        Some(name) => normalize_identifier(name),
        None => s
            .split_whitespace()
            .next()
            .map(normalize_identifier)
            .unwrap_or_default(),
    }
}

/// Whether `segment` opens with one of the table-level keywords as a whole word
pub fn is_table_level_definition(segment: &str) -> bool {
    TABLE_LEVEL_KEYWORDS
        .iter()
        .any(|words| starts_with_words(segment, words))
}

fn starts_with_words(s: &str, words: &[&str]) -> bool {
    let mut rest = s;
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            let trimmed = rest.trim_start();
            if trimmed.len() == rest.len() {
                return false;
            }
            rest = trimmed;
        }
        match strip_keyword(rest, word) {
            Some(after) => rest = after,
            None => return false,
        }
    }
    true
}

/// Case-insensitive keyword prefix followed by a word boundary
fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let head = s.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &s[keyword.len()..];
    match rest.chars().next() {
        Some(c) if c.is_alphanumeric() || c == '_' => None,
        _ => Some(rest),
    }
}

/// Name in one of the forms `[name]`, `"name"`, `` `name` `` or a bare
/// `[A-Za-z0-9_]+` run, tried in that order at the very start of `s`
fn leading_name(s: &str) -> Option<&str> {
    for (open, close) in [('[', ']'), ('"', '"'), ('`', '`')] {
        if let Some(rest) = s.strip_prefix(open) {
            return rest
                .find(close)
                .filter(|&end| end > 0)
                .map(|end| &rest[..end]);
        }
    }

    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(s.len());
    (end > 0).then(|| &s[..end])
}
