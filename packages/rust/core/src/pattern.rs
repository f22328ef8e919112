//! Pattern compiler: rule pattern text → case-insensitive [`Matcher`].
//!
//! The `regex` crate matches in linear time, so a pattern cannot backtrack
//! catastrophically. The limits below bound the remaining cost: how large a
//! compiled program may grow and how long a source string may be.

use regex::{Regex, RegexBuilder};
use soilscope_shared::PatternError;

/// Longest accepted pattern source, in bytes.
pub const MAX_PATTERN_LEN: usize = 1024;

/// Upper bound on the compiled program (and lazy DFA cache) per pattern.
const COMPILED_SIZE_LIMIT: usize = 1 << 20;

/// Maximum nesting depth of groups and repetitions.
const NEST_LIMIT: u32 = 64;

/// A compiled, case-insensitive "does the text contain a match" test.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
}

impl Matcher {
    /// True when `text` contains a match anywhere.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// The pattern source this matcher was compiled from.
    pub fn source(&self) -> &str {
        self.regex.as_str()
    }
}

/// Compile a pattern source into a [`Matcher`].
///
/// Fails with [`PatternError`] when the source is empty, too long, not a
/// valid expression, or compiles past the size limits.
pub fn compile(source: &str) -> Result<Matcher, PatternError> {
    if source.trim().is_empty() {
        return Err(PatternError::new(source, "pattern is empty"));
    }

    if source.len() > MAX_PATTERN_LEN {
        return Err(PatternError::new(
            truncate(source),
            format!(
                "pattern is {} bytes, max {MAX_PATTERN_LEN}",
                source.len()
            ),
        ));
    }

    let regex = RegexBuilder::new(source)
        .case_insensitive(true)
        .size_limit(COMPILED_SIZE_LIMIT)
        .dfa_size_limit(COMPILED_SIZE_LIMIT)
        .nest_limit(NEST_LIMIT)
        .build()
        .map_err(|e| PatternError::new(source, e.to_string()))?;

    Ok(Matcher { regex })
}

/// Shorten an oversized source for error messages.
fn truncate(source: &str) -> String {
    let mut end = 64.min(source.len());
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &source[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_case_insensitive() {
        let m = compile("ph.*range").expect("valid pattern");
        assert!(m.is_match("what is the ph range"));
        assert!(m.is_match("WHAT IS THE PH RANGE"));
        assert!(!m.is_match("range of ph"));
        assert_eq!(m.source(), "ph.*range");
    }

    #[test]
    fn alternation_matches_substrings() {
        let m = compile("corn|maize").unwrap();
        assert!(m.is_match("how do I grow Maize?"));
        assert!(m.is_match("popcorn"));
        assert!(!m.is_match("wheat"));
    }

    #[test]
    fn empty_pattern_rejected() {
        for source in ["", "   ", "\t\n"] {
            let err = compile(source).unwrap_err();
            assert_eq!(err.cause, "pattern is empty");
        }
    }

    #[test]
    fn syntax_errors_rejected() {
        for source in ["(ph", "[a-z", "*corn", "wheat)", "(?<=soil)ph"] {
            let err = compile(source).unwrap_err();
            assert_eq!(err.pattern, source);
            assert!(!err.cause.is_empty());
        }
    }

    #[test]
    fn oversized_source_rejected() {
        let source = "a".repeat(MAX_PATTERN_LEN + 1);
        let err = compile(&source).unwrap_err();
        assert!(err.cause.contains("max 1024"));
        assert!(err.pattern.len() < source.len());
    }

    #[test]
    fn oversized_program_rejected() {
        let err = compile(r"(?:\w{500}){500}").unwrap_err();
        assert!(!err.cause.is_empty());
    }

    #[test]
    fn deep_nesting_rejected() {
        let source = format!("{}a{}", "(".repeat(100), ")".repeat(100));
        assert!(compile(&source).is_err());
    }
}
