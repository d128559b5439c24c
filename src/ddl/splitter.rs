//! Top-level comma splitting of a column-list body

/// Lexical mode of the splitter.
///
/// Parenthesis depth only matters in [`SplitMode::Plain`]; inside quotes or a
/// bracketed identifier every character is literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    Plain,
    SingleQuote,
    DoubleQuote,
    Bracket,
}

/// Split `body` on commas outside parentheses, quotes and `[...]`.
///
/// Segments are trimmed and empty segments are dropped, so a trailing comma
/// does not produce a phantom column.
///
/// ```
/// use ddl_registry::ddl::split_top_level_commas;
///
/// let parts = split_top_level_commas("a NUMERIC(10, 2), b TEXT DEFAULT 'x,y', ");
/// assert_eq!(parts, vec!["a NUMERIC(10, 2)", "b TEXT DEFAULT 'x,y'"]);
/// ```
pub fn split_top_level_commas(body: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut mode = SplitMode::Plain;
    let mut depth: usize = 0;
    let mut start = 0;

    for (i, ch) in body.char_indices() {
        match (mode, ch) {
            (SplitMode::Plain, '\'') => mode = SplitMode::SingleQuote,
            (SplitMode::SingleQuote, '\'') => mode = SplitMode::Plain,
            (SplitMode::Plain, '"') => mode = SplitMode::DoubleQuote,
            (SplitMode::DoubleQuote, '"') => mode = SplitMode::Plain,
            (SplitMode::Plain, '[') => mode = SplitMode::Bracket,
            (SplitMode::Bracket, ']') => mode = SplitMode::Plain,
            (SplitMode::Plain, '(') => depth += 1,
            // never below zero: tolerates a stray ')'
            (SplitMode::Plain, ')') => depth = depth.saturating_sub(1),
            (SplitMode::Plain, ',') if depth == 0 => {
                push_segment(&mut segments, &body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    push_segment(&mut segments, &body[start..]);

    segments
}

fn push_segment<'a>(segments: &mut Vec<&'a str>, raw: &'a str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed);
    }
}
