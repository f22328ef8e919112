//! Reply resolution: `(message, knowledge base) -> reply`.
//!
//! Resolution walks an explicit chain of strategies, each with one data
//! source, and stops at the first that answers:
//!
//! 1. the knowledge base, scanned in stored order (first match wins);
//! 2. the greeting fallback;
//! 3. the catch-all fallback, which always answers.
//!
//! An empty message never enters the chain; it gets [`PROMPT_REPLY`].
//!
//! Resolution is total, deterministic, and performs no I/O. Callers that
//! want to log which strategy answered inspect [`Resolution::source`].

use crate::fallback::{self, FallbackKind, FallbackRule};
use crate::knowledge::KnowledgeBase;

/// Reply for an empty or whitespace-only message.
pub const PROMPT_REPLY: &str = "Please type a question about soil, crops, or fertilizers.";

/// Where a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    /// The message was empty.
    Prompt,
    /// Knowledge-base rule at this priority index.
    Rule { index: usize },
    /// Greeting fallback.
    Greeting,
    /// Catch-all fallback.
    CatchAll,
}

impl ReplySource {
    /// Short label for logs and API responses.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Rule { .. } => "rule",
            Self::Greeting => "greeting",
            Self::CatchAll => "catch-all",
        }
    }
}

impl From<FallbackKind> for ReplySource {
    fn from(kind: FallbackKind) -> Self {
        match kind {
            FallbackKind::Greeting => Self::Greeting,
            FallbackKind::CatchAll => Self::CatchAll,
        }
    }
}

/// The outcome of [`resolve`]. Borrows its text from the knowledge base or
/// from the static fallback replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub reply: &'a str,
    pub source: ReplySource,
}

// ---------------------------------------------------------------------------
// Strategy chain
// ---------------------------------------------------------------------------

/// One link of the resolution chain.
enum Strategy<'a> {
    KnowledgeBase(&'a KnowledgeBase),
    Fallback(&'static FallbackRule),
}

impl<'a> Strategy<'a> {
    fn attempt(&self, text: &str) -> Option<Resolution<'a>> {
        match *self {
            Self::KnowledgeBase(kb) => kb
                .rules()
                .iter()
                .position(|rule| rule.matcher().is_match(text))
                .map(|index| Resolution {
                    reply: kb.rules()[index].reply(),
                    source: ReplySource::Rule { index },
                }),
            Self::Fallback(rule) => rule.is_match(text).then(|| Resolution {
                reply: rule.reply(),
                source: rule.kind().into(),
            }),
        }
    }
}

fn chain(kb: &KnowledgeBase) -> [Strategy<'_>; 3] {
    let [greeting, catch_all] = fallback::ladder();
    [
        Strategy::KnowledgeBase(kb),
        Strategy::Fallback(greeting),
        Strategy::Fallback(catch_all),
    ]
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Resolve `message` against `kb`. Never fails.
pub fn resolve<'a>(message: &str, kb: &'a KnowledgeBase) -> Resolution<'a> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Resolution {
            reply: PROMPT_REPLY,
            source: ReplySource::Prompt,
        };
    }

    let text = trimmed.to_lowercase();
    chain(kb)
        .iter()
        .find_map(|strategy| strategy.attempt(&text))
        .unwrap_or(Resolution {
            reply: fallback::CATCH_ALL_REPLY,
            source: ReplySource::CatchAll,
        })
}

/// Owned-reply convenience over [`resolve`].
pub fn reply(message: &str, kb: &KnowledgeBase) -> String {
    resolve(message, kb).reply.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::{CATCH_ALL_REPLY, GREETING_REPLY};
    use crate::knowledge::load;
    use soilscope_shared::RuleDescriptor;

    fn kb(rules: &[(&str, &str)]) -> KnowledgeBase {
        let descriptors: Vec<RuleDescriptor> = rules
            .iter()
            .map(|(p, r)| RuleDescriptor::new(*p, *r))
            .collect();
        load(&descriptors, "test").expect("load")
    }

    #[test]
    fn empty_message_gets_prompt() {
        let kb = kb(&[(".*", "anything")]);
        for message in ["", "   ", "\n\t "] {
            let res = resolve(message, &kb);
            assert_eq!(res.reply, PROMPT_REPLY);
            assert_eq!(res.source, ReplySource::Prompt);
        }
        assert_eq!(resolve("", &KnowledgeBase::empty()).reply, PROMPT_REPLY);
    }

    #[test]
    fn first_match_wins_in_stored_order() {
        let kb = kb(&[("hello", "A"), ("he", "B")]);
        let res = resolve("hello", &kb);
        assert_eq!(res.reply, "A");
        assert_eq!(res.source, ReplySource::Rule { index: 0 });

        // Only B matches here.
        assert_eq!(resolve("hey", &kb).reply, "B");
    }

    #[test]
    fn reversed_order_flips_priority() {
        let kb = kb(&[("he", "B"), ("hello", "A")]);
        assert_eq!(resolve("hello", &kb).reply, "B");
    }

    #[test]
    fn fallback_ladder_on_empty_kb() {
        let empty = KnowledgeBase::empty();

        let res = resolve("hi there", &empty);
        assert_eq!(res.reply, GREETING_REPLY);
        assert_eq!(res.source, ReplySource::Greeting);

        let res = resolve("xyz123", &empty);
        assert_eq!(res.reply, CATCH_ALL_REPLY);
        assert_eq!(res.source, ReplySource::CatchAll);
    }

    #[test]
    fn knowledge_base_beats_fallback() {
        let kb = kb(&[("hello", "Welcome to the soil desk.")]);
        assert_eq!(resolve("hello", &kb).reply, "Welcome to the soil desk.");
        // Greeting fallback still covers what the rules miss.
        assert_eq!(resolve("hey", &kb).reply, GREETING_REPLY);
    }

    #[test]
    fn case_insensitive_match() {
        let kb = kb(&[("ph.*range", "Most crops thrive in pH 6.0-7.0.")]);
        let upper = resolve("PH RANGE", &kb);
        let lower = resolve("ph range", &kb);
        assert_eq!(upper, lower);
        assert_eq!(upper.source, ReplySource::Rule { index: 0 });
    }

    #[test]
    fn uppercase_pattern_matches_lowercased_message() {
        let kb = kb(&[("(ph|pH).*range|NPK", "balanced")]);
        assert_eq!(resolve("Which NPK ratio?", &kb).reply, "balanced");
        assert_eq!(resolve("pH Range please", &kb).reply, "balanced");
    }

    #[test]
    fn surrounding_whitespace_ignored() {
        let kb = kb(&[("^wheat$", "Wheat likes pH 6.0-7.0.")]);
        assert_eq!(resolve("  Wheat \n", &kb).reply, "Wheat likes pH 6.0-7.0.");
    }

    #[test]
    fn resolution_is_deterministic() {
        let kb = kb(&[("corn|maize", "corn"), ("tomato", "tomato")]);
        for message in ["maize yield", "Tomato blight", "hi", "xyz123", " "] {
            let first = resolve(message, &kb);
            for _ in 0..10 {
                assert_eq!(resolve(message, &kb), first, "{message}");
            }
        }
    }

    #[test]
    fn reply_returns_owned_text() {
        let kb = kb(&[("compost", "Add 2-5 kg/m² of compost annually.")]);
        assert_eq!(reply("COMPOST?", &kb), "Add 2-5 kg/m² of compost annually.");
    }

    #[test]
    fn source_labels() {
        assert_eq!(ReplySource::Prompt.label(), "prompt");
        assert_eq!(ReplySource::Rule { index: 4 }.label(), "rule");
        assert_eq!(ReplySource::from(FallbackKind::CatchAll).label(), "catch-all");
    }
}
