//! Human-natural ordering of entry names.

use std::cmp::Ordering;

/// A maximal run of either ASCII digits or non-digit characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    Number(&'a str),
}

impl<'a> Token<'a> {
    pub fn as_str(&self) -> &'a str {
        match *self {
            Token::Text(text) | Token::Number(text) => text,
        }
    }
}

/// Split `input` into alternating digit and non-digit runs.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_digits = None;

    for (idx, ch) in input.char_indices() {
        let digit = ch.is_ascii_digit();
        match in_digits {
            Some(current) if current != digit => {
                tokens.push(make_token(&input[start..idx], current));
                start = idx;
            }
            _ => {}
        }
        in_digits = Some(digit);
    }

    if let Some(digit) = in_digits {
        tokens.push(make_token(&input[start..], digit));
    }

    tokens
}

fn make_token(run: &str, digits: bool) -> Token<'_> {
    if digits { Token::Number(run) } else { Token::Text(run) }
}

/// Natural comparison of two names.
///
/// Runs are compared pairwise up to the shorter run count: two digit runs compare by integer
/// value, any other pair compares as plain strings, and the first unequal pair decides. When
/// every compared pair is equal the name with fewer runs sorts first. Names that are still tied
/// (such as `p07` and `p7`) fall back to byte order so the result is a total order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a_tokens = tokenize(a);
    let b_tokens = tokenize(b);

    for (a_tok, b_tok) in a_tokens.iter().zip(b_tokens.iter()) {
        let order = match (a_tok, b_tok) {
            (Token::Number(a_digits), Token::Number(b_digits)) => cmp_digits(a_digits, b_digits),
            _ => a_tok.as_str().cmp(b_tok.as_str()),
        };
        if order != Ordering::Equal {
            return order;
        }
    }

    a_tokens.len().cmp(&b_tokens.len()).then_with(|| a.cmp(b))
}

/// Integer comparison of two digit strings of any length.
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
