//! Query Intent Classifier.
//!
//! Maps a normalized question onto the set of every intent whose keyword
//! list matches it. No statistics, no scoring: an intent is either matched
//! or it is not.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::normalizer::NormalizedText;
use super::policy::KeywordPolicy;
use super::types::{Intent, IntentSet};

// ============================================================================
// Classification Result
// ============================================================================

/// Outcome of intent classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub intents: IntentSet,
    /// First keyword that triggered each matched intent
    pub matched: Vec<(Intent, String)>,
}

impl ClassificationResult {
    pub fn is_unknown(&self) -> bool {
        self.intents.is_unknown()
    }
}

// ============================================================================
// Intent Classifier
// ============================================================================

/// Classifies questions against a [`KeywordPolicy`].
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    policy: Arc<KeywordPolicy>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(Arc::new(KeywordPolicy::default()))
    }
}

impl IntentClassifier {
    pub fn new(policy: Arc<KeywordPolicy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &KeywordPolicy {
        &self.policy
    }

    /// Classify a normalized question. Never fails; no match yields `{unknown}`.
    pub fn classify(&self, input: &NormalizedText) -> ClassificationResult {
        let mut intents = IntentSet::new();
        let mut matched = Vec::new();

        if !input.is_empty() {
            for intent in Intent::MATCHABLE {
                let hit = self
                    .policy
                    .intent_keywords(intent)
                    .iter()
                    .find(|k| self.policy.mentions(&input.text, k));
                if let Some(keyword) = hit {
                    intents.insert(intent);
                    matched.push((intent, keyword.clone()));
                }
            }
        }

        if intents.is_empty() {
            intents = IntentSet::unknown();
        }

        ClassificationResult { intents, matched }
    }
}

// ============================================================================
// Tests
// ============================================================================
