//! Keyword policy tables.
//!
//! Everything the classifier and extractor know about vocabulary lives in a
//! [`KeywordPolicy`] value that callers build once and pass in. Nothing here
//! is global, so tests can substitute their own tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::{Column, Intent};
use crate::config::QueryConfig;

// ============================================================================
// Match Mode
// ============================================================================

/// How a keyword has to line up with word boundaries to count as a match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Anywhere in the text, including mid-word ("temp" in "attempt")
    Substring,
    /// Must start at a word boundary but may run on ("temp" in "temperatures")
    #[default]
    WordPrefix,
    /// Must start and end at word boundaries
    WholeWord,
}

impl MatchMode {
    /// Byte offset of the first acceptable occurrence of `keyword` in `text`.
    pub fn find(&self, text: &str, keyword: &str) -> Option<usize> {
        if keyword.is_empty() {
            return None;
        }
        text.match_indices(keyword)
            .map(|(start, _)| start)
            .find(|&start| self.accepts(text, keyword, start))
    }

    pub fn matches(&self, text: &str, keyword: &str) -> bool {
        self.find(text, keyword).is_some()
    }

    /// Match a single keyword word against a single token.
    ///
    /// Symbol keywords (`>`, `=`) always require an exact token.
    pub fn matches_token(&self, token: &str, word: &str) -> bool {
        if !starts_alphanumeric(word) {
            return token == word;
        }
        match self {
            Self::Substring => token.contains(word),
            Self::WordPrefix => token.starts_with(word),
            Self::WholeWord => token == word,
        }
    }

    fn accepts(&self, text: &str, keyword: &str, start: usize) -> bool {
        let at_start = !starts_alphanumeric(keyword) || boundary_before(text, start);
        let at_end = !ends_alphanumeric(keyword) || boundary_after(text, start + keyword.len());
        match self {
            Self::Substring => true,
            Self::WordPrefix => at_start,
            Self::WholeWord => at_start && at_end,
        }
    }
}

fn starts_alphanumeric(s: &str) -> bool {
    s.chars().next().is_some_and(char::is_alphanumeric)
}

fn ends_alphanumeric(s: &str) -> bool {
    s.chars().next_back().is_some_and(char::is_alphanumeric)
}

fn boundary_before(text: &str, start: usize) -> bool {
    text[..start]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_alphanumeric())
}

fn boundary_after(text: &str, end: usize) -> bool {
    text[end..].chars().next().map_or(true, |c| !c.is_alphanumeric())
}

// ============================================================================
// Tie Break
// ============================================================================

/// Which of two equally distant keywords governs a literal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The keyword that appears first in the text wins
    #[default]
    FirstMatch,
    /// The keyword that appears last in the text wins
    LastMatch,
}

impl TieBreak {
    /// Whether a candidate at `challenger` replaces the one at `incumbent`.
    pub fn prefers(&self, challenger: usize, incumbent: usize) -> bool {
        match self {
            Self::FirstMatch => challenger < incumbent,
            Self::LastMatch => challenger > incumbent,
        }
    }
}

// ============================================================================
// Operator Cues
// ============================================================================

/// Comparison a keyword asks for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OperatorCue {
    Greater,
    Less,
    /// Inclusive lower bound (`>=`)
    AtLeast,
    /// Inclusive upper bound (`<=`)
    AtMost,
    Equal,
    Between,
    /// Tolerance band around the literal
    Near,
}

// ============================================================================
// Keyword Policy
// ============================================================================

/// Immutable vocabulary and association rules for one engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordPolicy {
    pub match_mode: MatchMode,
    pub tie_break: TieBreak,
    /// Maximum token distance between a literal and its keywords
    pub window: usize,
    /// Half-width of the band produced for proximity questions
    pub tolerance: f64,
    pub intents: BTreeMap<Intent, Vec<String>>,
    pub columns: BTreeMap<Column, Vec<String>>,
    pub operators: BTreeMap<OperatorCue, Vec<String>>,
    /// Words that turn the following literal into a row limit
    pub limit_words: Vec<String>,
    pub ascending_words: Vec<String>,
    pub descending_words: Vec<String>,
    /// Short keywords that never match as a word prefix ("lat" in "later")
    pub whole_words: Vec<String>,
}

impl Default for KeywordPolicy {
    fn default() -> Self {
        Self {
            match_mode: MatchMode::default(),
            tie_break: TieBreak::default(),
            window: 4,
            tolerance: 1.0,
            intents: BTreeMap::from([
                (
                    Intent::Summary,
                    words(&["summary", "summarize", "overview", "statistics", "stats", "total"]),
                ),
                (Intent::Count, words(&["how many", "number of", "count"])),
                (
                    Intent::Temperature,
                    words(&["temperature", "temp", "warm", "cold", "hot"]),
                ),
                (Intent::Salinity, words(&["salinity", "salt", "psal"])),
                (Intent::Pressure, words(&["pressure", "depth", "dbar", "decibar"])),
                (
                    Intent::Location,
                    words(&[
                        "location",
                        "latitude",
                        "longitude",
                        "lat",
                        "lon",
                        "coordinates",
                        "where",
                        "position",
                    ]),
                ),
                (
                    Intent::Range,
                    words(&[
                        "range", "between", "near", "around", "within", "minimum", "maximum",
                        "min", "max", "average", "mean",
                    ]),
                ),
                (
                    Intent::Visualization,
                    words(&["map", "plot", "chart", "graph", "visualize", "visualise"]),
                ),
            ]),
            columns: BTreeMap::from([
                (Column::Temp, words(&["temperature", "temp"])),
                (Column::Psal, words(&["salinity", "psal"])),
                (Column::Pres, words(&["pressure", "dbar"])),
                (Column::Latitude, words(&["latitude", "lat"])),
                (Column::Longitude, words(&["longitude", "lon"])),
            ]),
            operators: BTreeMap::from([
                (
                    OperatorCue::Greater,
                    words(&[
                        ">",
                        "above",
                        "greater than",
                        "more than",
                        "higher than",
                        "exceeding",
                    ]),
                ),
                (
                    OperatorCue::Less,
                    words(&["<", "below", "less than", "lower than", "under", "beneath"]),
                ),
                (OperatorCue::AtLeast, words(&[">="])),
                (OperatorCue::AtMost, words(&["<="])),
                (OperatorCue::Equal, words(&["=", "equal", "equals", "exactly"])),
                (OperatorCue::Between, words(&["between"])),
                (
                    OperatorCue::Near,
                    words(&["near", "around", "approximately", "roughly", "close to"]),
                ),
            ]),
            limit_words: words(&["top", "first", "limit"]),
            ascending_words: words(&[
                "lowest", "low", "min", "minimum", "coldest", "shallowest", "least",
            ]),
            descending_words: words(&[
                "highest", "high", "max", "maximum", "warmest", "deepest", "most",
            ]),
            whole_words: words(&["lat", "lon", "min", "max"]),
        }
    }
}

impl KeywordPolicy {
    /// Default vocabulary with the knobs from configuration.
    pub fn from_config(config: &QueryConfig) -> Self {
        Self {
            match_mode: config.match_mode,
            tie_break: config.tie_break,
            window: config.window,
            tolerance: config.tolerance,
            ..Self::default()
        }
    }

    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Replace the keyword list of one intent.
    pub fn with_intent_keywords(mut self, intent: Intent, keywords: &[&str]) -> Self {
        self.intents.insert(intent, words(keywords));
        self
    }

    pub fn intent_keywords(&self, intent: Intent) -> &[String] {
        self.intents.get(&intent).map(Vec::as_slice).unwrap_or_default()
    }

    /// Match mode for one keyword: listed abbreviations tighten
    /// `word_prefix` to `whole_word`.
    pub fn mode_for(&self, keyword: &str) -> MatchMode {
        match self.match_mode {
            MatchMode::WordPrefix if self.whole_words.iter().any(|w| w == keyword) => {
                MatchMode::WholeWord
            }
            mode => mode,
        }
    }

    /// Whether `keyword` occurs in `text` under its match mode.
    pub fn mentions(&self, text: &str, keyword: &str) -> bool {
        self.mode_for(keyword).matches(text, keyword)
    }

    /// Whether any word of `list` occurs in `text`.
    pub fn mentions_any(&self, text: &str, list: &[String]) -> bool {
        list.iter().any(|k| self.mentions(text, k))
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_matches_mid_word() {
        assert!(MatchMode::Substring.matches("an attempt", "temp"));
        assert!(!MatchMode::WordPrefix.matches("an attempt", "temp"));
        assert!(!MatchMode::WholeWord.matches("an attempt", "temp"));
    }

    #[test]
    fn test_word_prefix_allows_suffix() {
        assert!(MatchMode::WordPrefix.matches("warm temperatures", "temperature"));
        assert!(!MatchMode::WholeWord.matches("warm temperatures", "temperature"));
        assert!(MatchMode::WholeWord.matches("warm temperature.", "temperature"));
    }

    #[test]
    fn test_multi_word_keywords() {
        assert!(MatchMode::WholeWord.matches("how many profiles", "how many"));
        assert!(!MatchMode::WholeWord.matches("somehow many", "how many"));
        assert!(MatchMode::Substring.matches("somehow many", "how many"));
    }

    #[test]
    fn test_symbols_ignore_boundaries() {
        assert!(MatchMode::WholeWord.matches("temp>15", ">"));
        assert!(MatchMode::WholeWord.matches_token(">", ">"));
        assert!(!MatchMode::Substring.matches_token(">=", "="));
    }

    #[test]
    fn test_later_occurrence_can_match() {
        // first hit is mid-word, second one starts a word
        assert_eq!(MatchMode::WordPrefix.find("attempt temp", "temp"), Some(8));
    }

    #[test]
    fn test_tie_break() {
        assert!(TieBreak::FirstMatch.prefers(1, 3));
        assert!(!TieBreak::FirstMatch.prefers(3, 1));
        assert!(TieBreak::LastMatch.prefers(3, 1));
    }

    #[test]
    fn test_default_tables_cover_matchable_intents() {
        let policy = KeywordPolicy::default();
        for intent in Intent::MATCHABLE {
            assert!(!policy.intent_keywords(intent).is_empty(), "{intent:?}");
        }
        assert!(policy.intent_keywords(Intent::Unknown).is_empty());
    }

    #[test]
    fn test_abbreviations_need_whole_word() {
        let policy = KeywordPolicy::default();
        assert!(policy.mentions("floats at lat 40", "lat"));
        assert!(!policy.mentions("show me later data", "lat"));
        assert!(!policy.mentions("for a long time", "lon"));
        assert!(!policy.mentions("in ten minutes", "min"));
        assert!(policy.mentions("warm temperatures", "temp"));

        let substring = policy.with_match_mode(MatchMode::Substring);
        assert!(substring.mentions("for a long time", "lon"));
    }

    #[test]
    fn test_inclusive_symbols_have_own_cues() {
        let policy = KeywordPolicy::default();
        assert_eq!(policy.operators[&OperatorCue::AtLeast], [">=".to_string()]);
        assert_eq!(policy.operators[&OperatorCue::AtMost], ["<=".to_string()]);
        assert!(!policy.operators[&OperatorCue::Greater].contains(&">=".to_string()));
    }

    #[test]
    fn test_policy_substitution() {
        let policy = KeywordPolicy::default().with_intent_keywords(Intent::Count, &["tally"]);
        assert_eq!(policy.intent_keywords(Intent::Count), ["tally".to_string()]);
    }
}
