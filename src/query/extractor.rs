//! Constraint Extractor.
//!
//! Turns numeric literals into `column <op> value` constraints. Each literal
//! is governed by the nearest column keyword and the nearest operator keyword
//! within the policy window. Extraction is purely lexical: units are never
//! checked.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::normalizer::{NormalizedText, Token, TokenKind};
use super::policy::{KeywordPolicy, OperatorCue};
use super::types::{Column, Constraint, Intent, IntentSet, SortDirection};
use crate::error::ErrorKind;

// ============================================================================
// Extraction Result
// ============================================================================

/// Why a literal did not become a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Not a valid number ("1.2.3")
    InvalidNumericLiteral,
    /// No column keyword inside the window
    NoColumn,
}

impl SkipReason {
    /// Error kind to log for this skip, if it is one.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::InvalidNumericLiteral => Some(ErrorKind::InvalidNumericLiteral),
            Self::NoColumn => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedLiteral {
    pub text: String,
    pub index: usize,
    pub reason: SkipReason,
}

/// Everything the extractor pulled out of one question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub constraints: Vec<Constraint>,
    /// Row limit requested with "top N" and friends
    pub limit: Option<usize>,
    /// Ordering asked for with "highest", "lowest", ...
    pub direction: Option<SortDirection>,
    pub skipped: Vec<SkippedLiteral>,
}

// ============================================================================
// Keyword Spans
// ============================================================================

/// A keyword occurrence covering tokens `start..=end`.
#[derive(Debug, Clone, Copy)]
struct Span<T> {
    start: usize,
    end: usize,
    value: T,
}

impl<T> Span<T> {
    fn distance_to(&self, index: usize) -> usize {
        if self.end < index {
            index - self.end
        } else {
            self.start.saturating_sub(index)
        }
    }
}

// ============================================================================
// Constraint Extractor
// ============================================================================

/// Extracts constraints against a [`KeywordPolicy`].
#[derive(Debug, Clone)]
pub struct ConstraintExtractor {
    policy: Arc<KeywordPolicy>,
}

impl Default for ConstraintExtractor {
    fn default() -> Self {
        Self::new(Arc::new(KeywordPolicy::default()))
    }
}

impl ConstraintExtractor {
    pub fn new(policy: Arc<KeywordPolicy>) -> Self {
        Self { policy }
    }

    /// Extract constraints from a normalized question.
    ///
    /// Bad literals are skipped one at a time; the rest still get extracted.
    pub fn extract(&self, input: &NormalizedText, intents: &IntentSet) -> Extraction {
        let tokens = &input.tokens;
        let columns = self.spans(tokens, &self.policy.columns);
        let operators = self.spans(tokens, &self.policy.operators);
        let range_active = intents.contains(Intent::Range);

        let mut extraction = Extraction {
            direction: self.direction(&input.text),
            ..Default::default()
        };
        let mut consumed = vec![false; tokens.len()];

        for token in tokens.iter().filter(|t| t.is_number()) {
            let i = token.index;
            if consumed[i] {
                continue;
            }

            let Some(value) = parse_literal(&token.text) else {
                let reason = SkipReason::InvalidNumericLiteral;
                tracing::debug!(
                    literal = %token.text,
                    error = reason.error_kind().map(|k| k.as_str()),
                    "Skipping malformed numeric literal"
                );
                extraction.skipped.push(skipped(token, reason));
                continue;
            };

            if let Some(limit) = self.limit_for(tokens, i, value) {
                extraction.limit = Some(limit);
                continue;
            }

            let Some(column) = self.nearest(&columns, i) else {
                tracing::debug!(literal = %token.text, "No column keyword near literal");
                extraction.skipped.push(skipped(token, SkipReason::NoColumn));
                continue;
            };

            let constraint = match self.nearest(&operators, i) {
                Some(OperatorCue::Greater) => Constraint::greater_than(column, value),
                Some(OperatorCue::Less) => Constraint::less_than(column, value),
                Some(OperatorCue::AtLeast) => Constraint::at_least(column, value),
                Some(OperatorCue::AtMost) => Constraint::at_most(column, value),
                Some(OperatorCue::Equal) => Constraint::equal_to(column, value),
                Some(OperatorCue::Near) => Constraint::near(column, value, self.policy.tolerance),
                Some(OperatorCue::Between) => match self.upper_bound(tokens, i, &consumed) {
                    Some((j, upper)) => {
                        consumed[j] = true;
                        Constraint::between(column, value, upper)
                    }
                    None => self.default_constraint(column, value, range_active),
                },
                None => self.default_constraint(column, value, range_active),
            };
            extraction.constraints.push(constraint);
        }

        extraction
    }

    /// No operator keyword: a band when a range was asked for, equality otherwise.
    fn default_constraint(&self, column: Column, value: f64, range_active: bool) -> Constraint {
        if range_active {
            Constraint::near(column, value, self.policy.tolerance)
        } else {
            Constraint::equal_to(column, value)
        }
    }

    /// Closest keyword within the window; equal distances go to the tie-break policy.
    fn nearest<T: Copy>(&self, spans: &[Span<T>], index: usize) -> Option<T> {
        let mut best: Option<(usize, &Span<T>)> = None;
        for span in spans {
            let distance = span.distance_to(index);
            if distance == 0 || distance > self.policy.window {
                continue;
            }
            let better = match best {
                None => true,
                Some((d, incumbent)) => {
                    distance < d
                        || (distance == d && self.policy.tie_break.prefers(span.start, incumbent.start))
                }
            };
            if better {
                best = Some((distance, span));
            }
        }
        best.map(|(_, span)| span.value)
    }

    /// Second literal of "between A and B".
    fn upper_bound(&self, tokens: &[Token], index: usize, consumed: &[bool]) -> Option<(usize, f64)> {
        tokens
            .iter()
            .skip(index + 1)
            .take(self.policy.window)
            .filter(|t| t.is_number() && !consumed[t.index])
            .find_map(|t| parse_literal(&t.text).map(|v| (t.index, v)))
    }

    /// "top 5": a positive whole number right after a limit word.
    fn limit_for(&self, tokens: &[Token], index: usize, value: f64) -> Option<usize> {
        let previous = tokens.get(index.checked_sub(1)?)?;
        let is_limit_word = previous.kind == TokenKind::Word
            && self
                .policy
                .limit_words
                .iter()
                .any(|w| self.policy.mode_for(w).matches_token(&previous.text, w));
        (is_limit_word && value >= 1.0 && value.fract() == 0.0).then_some(value as usize)
    }

    fn direction(&self, text: &str) -> Option<SortDirection> {
        if self.policy.mentions_any(text, &self.policy.descending_words) {
            Some(SortDirection::Desc)
        } else if self.policy.mentions_any(text, &self.policy.ascending_words) {
            Some(SortDirection::Asc)
        } else {
            None
        }
    }

    /// Every occurrence of every keyword phrase in the token stream.
    fn spans<K: Copy>(
        &self,
        tokens: &[Token],
        table: &std::collections::BTreeMap<K, Vec<String>>,
    ) -> Vec<Span<K>> {
        let mut spans = Vec::new();
        for (value, phrases) in table {
            for phrase in phrases {
                let words: Vec<&str> = phrase.split_whitespace().collect();
                if words.is_empty() || words.len() > tokens.len() {
                    continue;
                }
                let mode = self.policy.mode_for(phrase);
                for start in 0..=tokens.len() - words.len() {
                    let window = &tokens[start..start + words.len()];
                    let hit = window.iter().zip(&words).all(|(t, w)| {
                        !t.is_number() && mode.matches_token(&t.text, w)
                    });
                    if hit {
                        spans.push(Span {
                            start,
                            end: start + words.len() - 1,
                            value: *value,
                        });
                    }
                }
            }
        }
        spans
    }
}

fn parse_literal(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn skipped(token: &Token, reason: SkipReason) -> SkippedLiteral {
    SkippedLiteral {
        text: token.text.clone(),
        index: token.index,
        reason,
    }
}

// ============================================================================
// Tests
// ============================================================================
