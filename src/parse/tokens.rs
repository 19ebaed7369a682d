//! Whitespace- and quote-aware line splitting shared by both player list
//! decoders.

/// Splits a line on single spaces, treating a double-quoted span as atomic.
/// Quote characters stay in the emitted token; stripping them is the
/// caller's decision. An unterminated quote swallows the rest of the line.
/// Leading and trailing whitespace is trimmed first, so empty input and
/// all-whitespace input both yield no tokens.
///
/// Runs of spaces are not collapsed: the second space of a run starts a new
/// token that keeps its leading spaces. Rows with doubled separators thus
/// misalign and fail the numeric invariants downstream, which is how the
/// servers' own flood of spacing quirks gets rejected rather than guessed at.
pub fn split_quoted(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut token = String::new();
    let mut in_quotes = false;

    for c in line.trim().chars() {
        if c == '"' {
            in_quotes = !in_quotes;
            token.push(c);
            continue;
        }
        if c == ' ' && !in_quotes && !token.is_empty() {
            tokens.push(std::mem::take(&mut token));
            continue;
        }
        token.push(c);
    }
    if !token.is_empty() {
        tokens.push(token);
    }

    tokens
}

/// True if `s` is non-empty and entirely ASCII digits.
pub fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `score` may be empty, all digits, or a `-` followed by digits.
pub fn valid_score(s: &str) -> bool {
    s.is_empty()
        || all_digits(s)
        || (s.len() > 1 && s.starts_with('-') && s[1..].bytes().all(|b| b.is_ascii_digit()))
}

/// `ping` may be empty or all digits.
pub fn valid_ping(s: &str) -> bool {
    s.is_empty() || all_digits(s)
}
