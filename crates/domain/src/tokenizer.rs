//! Token estimator (spec §4.10 Tokenizer).
//!
//! Lives in `agentrt-domain` rather than `agentrt-util` because every
//! `Resource::tokens()` impl needs it and `agentrt-util` depends on
//! `agentrt-domain`, not the other way around; `agentrt-util::tokenizer`
//! re-exports this module so callers can reach it from either crate.

/// Approximate a GPT-style token count for `text`.
///
/// Rules (spec §4.10): words of length ≤4 count as 1 token; longer words
/// count `ceil(len/4)`; each non-word character counts as 1; every two
/// whitespace characters count as 1. Minimum 1 for non-empty input.
pub fn encode(text: &str) -> Vec<u32> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut tokens = Vec::new();
    let mut whitespace_run = 0u32;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            whitespace_run += 1;
            if whitespace_run == 2 {
                tokens.push(0);
                whitespace_run = 0;
            }
            continue;
        }
        whitespace_run = 0;

        if is_word_char(c) {
            let mut len = 1usize;
            while let Some(&next) = chars.peek() {
                if is_word_char(next) {
                    len += 1;
                    chars.next();
                } else {
                    break;
                }
            }
            let count = if len <= 4 { 1 } else { len.div_ceil(4) };
            for _ in 0..count {
                tokens.push(0);
            }
        } else {
            tokens.push(0);
        }
    }

    if tokens.is_empty() {
        tokens.push(0);
    }
    tokens
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Convenience: token *count* rather than the placeholder vector.
pub fn count(text: &str) -> u32 {
    encode(text).len() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_has_zero_tokens() {
        assert_eq!(encode("").len(), 0);
    }

    #[test]
    fn short_word_counts_one() {
        assert_eq!(count("cat"), 1);
        assert_eq!(count("four"), 1);
    }

    #[test]
    fn long_word_counts_ceil_len_over_4() {
        // "hello" -> len 5 -> ceil(5/4) = 2
        assert_eq!(count("hello"), 2);
        // "establishment" -> len 13 -> ceil(13/4) = 4
        assert_eq!(count("establishment"), 4);
    }

    #[test]
    fn non_word_chars_count_one_each() {
        assert_eq!(count("!"), 1);
        assert_eq!(count("a,b"), 3); // "a" + "," + "b"
    }

    #[test]
    fn whitespace_pairs_count_one() {
        // two spaces -> 1 token
        assert_eq!(count("a  b"), 3); // "a"(1) + "  "(1) + "b"(1)
        // single trailing space contributes nothing on its own
        assert_eq!(count("ab "), 1);
    }

    #[test]
    fn single_whitespace_still_floors_to_one_token() {
        // A lone whitespace char never completes a pair, but non-empty
        // input always yields at least one token.
        assert_eq!(count(" "), 1);
    }

    #[test]
    fn non_empty_never_zero() {
        for s in ["a", " ", ".", "_"] {
            assert!(!encode(s).is_empty(), "encode({s:?}) should not be empty");
        }
    }
}
