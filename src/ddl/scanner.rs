//! `CREATE TABLE` block scanning
//!
//! Locates every `create table` keyword (case-insensitive), takes the first
//! opening parenthesis after it and looks up its matching close. Occurrences
//! without a `(` or without a balanced close are skipped; scanning continues
//! after the keyword.
//!
//! Parentheses are paired once for the whole text, so the scan stays linear
//! in the input size (plus a binary search per keyword) even when a dump is
//! full of truncated statements.

const KEYWORD: &str = "create table";

/// Table name used when nothing resembling an identifier precedes the `(`.
///
/// Unlikely to clash with a real table, but a statement that literally names
/// its table `<unknown_table>` lands under the same key.
pub const UNKNOWN_TABLE_SENTINEL: &str = "<unknown_table>";

/// One `CREATE TABLE` occurrence with a balanced column-list body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DdlBlock<'a> {
    /// Table identifier exactly as written, before normalization
    pub raw_table: &'a str,

    /// Text strictly between the outer parentheses
    pub body: &'a str,
}

/// Every `(` offset in source order, each with the offset of its matching `)`
struct ParenPairs {
    opens: Vec<usize>,
    closes: Vec<Option<usize>>,
}

impl ParenPairs {
    /// Pair parentheses with a stack; a `)` with nothing open is ignored
    fn new(bytes: &[u8]) -> Self {
        let mut opens = Vec::new();
        let mut closes = Vec::new();
        let mut stack: Vec<usize> = Vec::new();

        for (pos, &b) in bytes.iter().enumerate() {
            match b {
                b'(' => {
                    stack.push(opens.len());
                    opens.push(pos);
                    closes.push(None);
                }
                b')' => {
                    if let Some(idx) = stack.pop() {
                        closes[idx] = Some(pos);
                    }
                }
                _ => {}
            }
        }

        Self { opens, closes }
    }

    /// First `(` at or after `from`, with its close if balanced
    fn first_open_from(&self, from: usize) -> Option<(usize, Option<usize>)> {
        let idx = self.opens.partition_point(|&open| open < from);
        self.opens.get(idx).map(|&open| (open, self.closes[idx]))
    }
}

/// Scan `sql` for all well-formed `CREATE TABLE` blocks, in source order.
pub fn find_create_table_blocks(sql: &str) -> Vec<DdlBlock<'_>> {
    // ASCII lowercasing keeps byte offsets identical to the original text
    let lower = sql.to_ascii_lowercase();
    let pairs = ParenPairs::new(sql.as_bytes());
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(found) = lower[cursor..].find(KEYWORD) {
        let keyword_pos = cursor + found;
        let after_keyword = keyword_pos + KEYWORD.len();

        let Some((open, close)) = pairs.first_open_from(keyword_pos) else {
            // No '(' anywhere after this point, so no later keyword has one either
            log::debug!("No '(' after CREATE TABLE at byte {}, stopping", keyword_pos);
            break;
        };

        let Some(close) = close else {
            log::debug!(
                "Unbalanced parentheses for CREATE TABLE at byte {}, skipping",
                keyword_pos
            );
            cursor = after_keyword;
            continue;
        };

        blocks.push(DdlBlock {
            raw_table: raw_table_identifier(&sql[after_keyword..open]),
            body: &sql[open + 1..close],
        });
        cursor = close + 1;
    }

    blocks
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'[' | b']' | b'"')
}

/// Pick the table identifier out of the text between the keyword and `(`.
///
/// A span made of whitespace followed by one identifier-grammar token is taken
/// as-is; otherwise the last whitespace-delimited token is used (this covers
/// `IF NOT EXISTS name`, names with spaces, backticks and so on).
fn raw_table_identifier(span: &str) -> &str {
    let trimmed = span.trim_end();
    if trimmed.trim_start().is_empty() {
        return UNKNOWN_TABLE_SENTINEL;
    }

    let token_start = trimmed
        .bytes()
        .rposition(|b| !is_identifier_byte(b))
        .map_or(0, |p| p + 1);
    let prefix = &trimmed[..token_start];
    if token_start < trimmed.len() && !prefix.is_empty() && prefix.trim().is_empty() {
        return &trimmed[token_start..];
    }

    trimmed
        .split_whitespace()
        .next_back()
        .unwrap_or(UNKNOWN_TABLE_SENTINEL)
}
