//! The fixed fallback ladder consulted after the knowledge base is exhausted.
//!
//! Exactly two rules, always in this order: a greeting detector and an
//! unconditional catch-all.

use std::sync::LazyLock;

use crate::pattern::{self, Matcher};

/// Reply for a message that greets the assistant.
pub const GREETING_REPLY: &str = "Hi! I'm your SoilScope assistant. Ask me about soil health, pH, \
     moisture, crops, or fertilizers.";

/// Reply when nothing else matched.
pub const CATCH_ALL_REPLY: &str = "I can help you with soil analysis, crop recommendations, and \
     farming advice. Try asking about pH levels, fertilizers, or specific crops like tomatoes or corn.";

/// Which rung of the ladder a fallback rule is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackKind {
    Greeting,
    CatchAll,
}

/// A hardcoded last-resort rule.
#[derive(Debug)]
pub struct FallbackRule {
    kind: FallbackKind,
    matcher: Matcher,
    reply: &'static str,
}

impl FallbackRule {
    pub fn kind(&self) -> FallbackKind {
        self.kind
    }

    pub fn reply(&self) -> &'static str {
        self.reply
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }
}

static LADDER: LazyLock<[FallbackRule; 2]> = LazyLock::new(|| {
    [
        FallbackRule {
            kind: FallbackKind::Greeting,
            matcher: pattern::compile(r"\b(hello|hi|hey)\b").expect("valid greeting pattern"),
            reply: GREETING_REPLY,
        },
        FallbackRule {
            kind: FallbackKind::CatchAll,
            matcher: pattern::compile(r"(?s).*").expect("valid catch-all pattern"),
            reply: CATCH_ALL_REPLY,
        },
    ]
});

/// The ladder in evaluation order: greeting, then catch-all.
pub fn ladder() -> &'static [FallbackRule; 2] {
    &LADDER
}
