//! Intent classification: deterministic first-match rules with a model
//! fallback for messages the rules cannot place.

mod classifier;
mod rules;

pub use classifier::{IntentClassifier, IntentDecision, MessageIntent};
pub use rules::{RuleMatcher, RuleTable, TurnInput};
