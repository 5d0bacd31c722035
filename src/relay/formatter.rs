//! Reply text helpers: fitting text into IRC lines.

use crate::protocol::MAX_LINE_LEN;

/// Longest text that fits in one `PRIVMSG <target> :<text>\r\n` line.
pub fn max_text_len(target: &str) -> usize {
    let overhead = "PRIVMSG ".len() + target.len() + " :".len() + "\r\n".len();
    MAX_LINE_LEN.saturating_sub(overhead).max(1)
}

/// Break reply text into the lines to send to `target`.
///
/// Text is split on newlines, blank lines are dropped, and long lines are
/// wrapped to fit the 512 byte limit.
pub fn reply_lines(text: &str, target: &str) -> Vec<String> {
    let max_len = max_text_len(target);
    text.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .flat_map(|line| wrap_line(line, max_len))
        .collect()
}

/// Largest char boundary in `s` not past `index`.
fn char_floor(s: &str, index: usize) -> usize {
    (0..=index.min(s.len()))
        .rev()
        .find(|&i| s.is_char_boundary(i))
        .unwrap_or(0)
}

/// Wrap one line into pieces of at most `max_len` bytes, breaking after the
/// last word that fits.
pub fn wrap_line(line: &str, max_len: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = line;

    while rest.len() > max_len {
        let end = char_floor(rest, max_len);
        let (piece, next) = match rest[..end].rfind(' ') {
            Some(space) if space > 0 => (&rest[..space], &rest[space + 1..]),
            _ if end > 0 => rest.split_at(end),
            // One character wider than the budget goes out on its own.
            _ => rest.split_at(rest.chars().next().map_or(rest.len(), char::len_utf8)),
        };
        pieces.push(piece.to_string());
        rest = next.trim_start();
    }

    if !rest.is_empty() || pieces.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}
