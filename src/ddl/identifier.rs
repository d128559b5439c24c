//! Identifier normalization

/// Reduce a raw SQL identifier to its bare name.
///
/// Drops schema/owner qualification, then brackets, then quotes. Unmatched
/// leading or trailing brackets and quotes left over from malformed dumps are
/// stripped as well.
///
/// ```
/// use ddl_registry::ddl::normalize_identifier;
///
/// assert_eq!(normalize_identifier("[dbo].[Orders]"), "Orders");
/// assert_eq!(normalize_identifier("\"public\".\"users\""), "users");
/// assert_eq!(normalize_identifier("Orders"), "Orders");
/// ```
pub fn normalize_identifier(raw: &str) -> String {
    let mut s = raw.trim();
    if s.is_empty() {
        return String::new();
    }

    if let Some(dot) = s.rfind('.') {
        s = s[dot + 1..].trim();
    }

    if is_wrapped(s, '[', ']') {
        s = &s[1..s.len() - 1];
    } else {
        if let Some(rest) = s.strip_prefix('[') {
            s = rest;
        }
        if let Some(rest) = s.strip_suffix(']') {
            s = rest;
        }
    }

    if is_wrapped(s, '"', '"') || is_wrapped(s, '\'', '\'') {
        s = &s[1..s.len() - 1];
    } else {
        if let Some(rest) = s.strip_prefix(['"', '\'']) {
            s = rest;
        }
        if let Some(rest) = s.strip_suffix(['"', '\'']) {
            s = rest;
        }
    }

    s.trim().to_string()
}

/// Same as [`normalize_identifier`] for optional input; `None` yields `""`.
pub fn normalize_optional(raw: Option<&str>) -> String {
    raw.map(normalize_identifier).unwrap_or_default()
}

fn is_wrapped(s: &str, open: char, close: char) -> bool {
    s.len() >= 2 && s.starts_with(open) && s.ends_with(close)
}
