//! Knowledge base: the ordered, immutable rule list and its loader.
//!
//! Load policy is fail-fast. The first descriptor whose pattern does not
//! compile, or whose reply is empty, aborts the whole load with
//! [`LoadError::Rule`] naming its index; nothing partial is ever returned.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use soilscope_shared::{LoadError, RuleDescriptor, RuleFault};

use crate::pattern::{self, Matcher};

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A compiled knowledge-base rule. Only the matcher takes part in resolution;
/// the rest is informational.
#[derive(Debug, Clone)]
pub struct Rule {
    matcher: Matcher,
    reply: String,
    category: String,
    level: String,
    keywords: BTreeSet<String>,
}

impl Rule {
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn reply(&self) -> &str {
        &self.reply
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn keywords(&self) -> &BTreeSet<String> {
        &self.keywords
    }

    /// Compile a single descriptor.
    fn compile(descriptor: &RuleDescriptor) -> Result<Self, RuleFault> {
        let matcher = pattern::compile(&descriptor.question_pattern)?;
        if descriptor.reply_text.trim().is_empty() {
            return Err(RuleFault::EmptyReply);
        }

        Ok(Self {
            matcher,
            reply: descriptor.reply_text.clone(),
            category: descriptor.category.clone(),
            level: descriptor.level.clone(),
            keywords: descriptor
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// KnowledgeBase
// ---------------------------------------------------------------------------

/// The full ordered rule set in effect at one point in time.
///
/// Rule order is match priority. Never mutated after [`load`] returns;
/// reloading builds a new value.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    rules: Vec<Rule>,
    origin: String,
    loaded_at: DateTime<Utc>,
}

impl KnowledgeBase {
    /// A knowledge base with no rules; every message falls through to the
    /// fallback ladder.
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            origin: "empty".into(),
            loaded_at: Utc::now(),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Label of the source the rules were loaded from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Rules tagged with `keyword` or filed under a category equal to it
    /// (case-insensitive), with their priority index.
    pub fn search(&self, keyword: &str) -> Vec<(usize, &Rule)> {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| {
                rule.keywords.contains(&needle) || rule.category.to_lowercase() == needle
            })
            .collect()
    }
}

/// Compile `descriptors` into a [`KnowledgeBase`], preserving their order.
///
/// Pure: touches no shared state. The caller decides whether to install the
/// result.
pub fn load(descriptors: &[RuleDescriptor], origin: &str) -> Result<KnowledgeBase, LoadError> {
    let rules = descriptors
        .iter()
        .enumerate()
        .map(|(index, descriptor)| {
            Rule::compile(descriptor).map_err(|cause| LoadError::Rule { index, cause })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(KnowledgeBase {
        rules,
        origin: origin.to_string(),
        loaded_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptors() -> Vec<RuleDescriptor> {
        let mut ph = RuleDescriptor::new("ph.*range", "Most crops thrive in pH 6.0-7.0.");
        ph.category = "pH Management".into();
        ph.keywords = vec!["pH".into(), "Lime ".into(), "".into()];
        vec![
            ph,
            RuleDescriptor::new("corn|maize", "Corn likes pH 6.0-6.8."),
            RuleDescriptor::new("wheat", "Wheat likes pH 6.0-7.0."),
        ]
    }

    #[test]
    fn load_preserves_order_and_metadata() {
        let kb = load(&descriptors(), "test").expect("load");
        assert_eq!(kb.len(), 3);
        assert_eq!(kb.origin(), "test");

        let replies: Vec<&str> = kb.rules().iter().map(Rule::reply).collect();
        assert_eq!(
            replies,
            vec![
                "Most crops thrive in pH 6.0-7.0.",
                "Corn likes pH 6.0-6.8.",
                "Wheat likes pH 6.0-7.0."
            ]
        );
        assert_eq!(kb.rules()[0].category(), "pH Management");
        assert_eq!(kb.rules()[1].level(), "easy");

        let keywords: Vec<&str> = kb.rules()[0].keywords().iter().map(String::as_str).collect();
        assert_eq!(keywords, vec!["lime", "ph"]);
    }

    #[test]
    fn empty_input_gives_empty_kb() {
        let kb = load(&[], "none").expect("load");
        assert!(kb.is_empty());
    }

    #[test]
    fn every_bad_pattern_aborts_whole_load() {
        let bad_patterns = ["(ph", "[moisture", "", "   ", "+npk", "a{2,1}"];

        for bad in bad_patterns {
            for position in 0..=3 {
                let mut input = descriptors();
                input.insert(position, RuleDescriptor::new(bad, "never installed"));

                let err = load(&input, "test").unwrap_err();
                match err {
                    LoadError::Rule {
                        index,
                        cause: RuleFault::Pattern(_),
                    } => assert_eq!(index, position, "pattern {bad:?}"),
                    other => panic!("expected pattern fault for {bad:?}, got {other:?}"),
                }
            }
        }
    }

    #[test]
    fn first_bad_rule_is_reported() {
        let mut input = descriptors();
        input[1].question_pattern = "(corn".into();
        input[2].question_pattern = "(wheat".into();
        let err = load(&input, "test").unwrap_err();
        assert_eq!(err.rule_index(), Some(1));
    }

    #[test]
    fn empty_reply_rejected() {
        let mut input = descriptors();
        input[2].reply_text = "  ".into();
        let err = load(&input, "test").unwrap_err();
        assert!(matches!(
            err,
            LoadError::Rule {
                index: 2,
                cause: RuleFault::EmptyReply
            }
        ));
    }

    #[test]
    fn search_by_keyword_or_category() {
        let kb = load(&descriptors(), "test").unwrap();

        let hits = kb.search("LIME");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 0);

        let hits = kb.search("ph management");
        assert_eq!(hits.len(), 1);

        let hits = kb.search("general");
        assert_eq!(hits.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![1, 2]);

        assert!(kb.search("  ").is_empty());
    }
}
