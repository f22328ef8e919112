//! Reply engine and domain logic for SoilScope.
//!
//! Messages are answered by an ordered list of case-insensitive regex rules
//! (the knowledge base), with a fixed greeting and catch-all ladder behind
//! it. The knowledge base is loaded from one [`source::RuleSource`] and lives
//! in a [`store::KnowledgeStore`] that can be reloaded while serving.

pub mod accounts;
pub mod fallback;
pub mod knowledge;
pub mod pattern;
pub mod resolver;
pub mod seed;
pub mod source;
pub mod store;

pub use knowledge::{KnowledgeBase, Rule, load};
pub use resolver::{PROMPT_REPLY, ReplySource, Resolution, resolve};
pub use source::RuleSource;
pub use store::{KnowledgeStore, Lifecycle, ReloadReport, Reply, Snapshot};
