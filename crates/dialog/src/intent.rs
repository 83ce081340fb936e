//! Free-text classification: ordered `(pattern, intent)` rules and
//! keyword sets.
//!
//! Matching runs on [`normalize_text`] output: lowercase, punctuation
//! replaced by spaces, whitespace collapsed.  Keywords match whole words
//! or phrases only, so `"menu"` does not fire on `"menus"`.

use regex::Regex;

use pa_domain::config::IntentRuleConfig;
use pa_domain::error::{Error, Result};

/// Lowercase, strip punctuation, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let cleaned = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Word-bounded alternation over normalized keywords.
fn keyword_regex(keywords: &[String]) -> Result<Option<Regex>> {
    let alternatives: Vec<String> = keywords
        .iter()
        .map(|k| normalize_text(k))
        .filter(|k| !k.is_empty())
        .map(|k| regex::escape(&k))
        .collect();
    if alternatives.is_empty() {
        return Ok(None);
    }
    let pattern = format!(r"\b(?:{})\b", alternatives.join("|"));
    Regex::new(&pattern)
        .map(Some)
        .map_err(|e| Error::Config(format!("keyword pattern: {e}")))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Intent rules
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
struct IntentRule {
    intent: String,
    regex: Regex,
}

/// Ordered intent rules; the first rule that matches wins.
#[derive(Debug, Clone, Default)]
pub struct IntentRules {
    rules: Vec<IntentRule>,
}

impl IntentRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule matching any of `keywords` as whole words/phrases.
    pub fn keywords(mut self, intent: impl Into<String>, keywords: &[&str]) -> Result<Self> {
        let owned: Vec<String> = keywords.iter().map(|k| k.to_string()).collect();
        if let Some(regex) = keyword_regex(&owned)? {
            self.rules.push(IntentRule {
                intent: intent.into(),
                regex,
            });
        }
        Ok(self)
    }

    /// Append a rule with a raw regex, matched case-insensitively against
    /// normalized text.
    pub fn pattern(mut self, intent: impl Into<String>, pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("(?i){pattern}"))
            .map_err(|e| Error::Config(format!("intent pattern '{pattern}': {e}")))?;
        self.rules.push(IntentRule {
            intent: intent.into(),
            regex,
        });
        Ok(self)
    }

    /// Build from config, preserving declared order.  A rule with both
    /// keywords and a pattern becomes two consecutive rules.
    pub fn from_config(rules: &[IntentRuleConfig]) -> Result<Self> {
        let mut out = Self::new();
        for rule in rules {
            if let Some(regex) = keyword_regex(&rule.keywords)? {
                out.rules.push(IntentRule {
                    intent: rule.intent.clone(),
                    regex,
                });
            }
            if let Some(pattern) = &rule.pattern {
                out = out.pattern(rule.intent.clone(), pattern)?;
            }
        }
        Ok(out)
    }

    /// Classify free text.  `None` when no rule matches.
    pub fn classify(&self, text: &str) -> Option<&str> {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| rule.regex.is_match(&normalized))
            .map(|rule| rule.intent.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Keyword sets
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A set of words/phrases scanned for anywhere in free text.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    regex: Option<Regex>,
}

impl KeywordSet {
    pub fn new(keywords: &[String]) -> Result<Self> {
        Ok(Self {
            regex: keyword_regex(keywords)?,
        })
    }

    /// The first keyword occurring in `text`, normalized.
    pub fn find(&self, text: &str) -> Option<String> {
        let regex = self.regex.as_ref()?;
        let normalized = normalize_text(text);
        regex.find(&normalized).map(|m| m.as_str().to_string())
    }

    pub fn matches(&self, text: &str) -> bool {
        self.find(text).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize_text("  Check   my BALANCE!!! "), "check my balance");
        assert_eq!(normalize_text("what's up?"), "what s up");
        assert_eq!(normalize_text("?!"), "");
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = IntentRules::new()
            .keywords("block_card", &["block card", "lost card"])
            .unwrap()
            .keywords("card_info", &["card"])
            .unwrap();
        assert_eq!(rules.classify("I LOST my card... lost card!"), Some("block_card"));
        assert_eq!(rules.classify("Tell me about my card"), Some("card_info"));
        assert_eq!(rules.classify("hello"), None);
    }

    #[test]
    fn keywords_match_whole_words_only() {
        let rules = IntentRules::new().keywords("menu", &["menu"]).unwrap();
        assert_eq!(rules.classify("back to menu"), Some("menu"));
        assert_eq!(rules.classify("show me the menus"), None);
    }

    #[test]
    fn punctuation_inside_keyword_is_tolerated() {
        let rules = IntentRules::new().keywords("checkin", &["check-in"]).unwrap();
        assert_eq!(rules.classify("I want to CHECK IN now"), Some("checkin"));
    }

    #[test]
    fn pattern_rules_are_case_insensitive() {
        let rules = IntentRules::new()
            .pattern("booking", r"\bbook(ing)?\s+(a\s+)?(room|flight)")
            .unwrap();
        assert_eq!(rules.classify("Booking a FLIGHT please"), Some("booking"));
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let err = IntentRules::new().pattern("x", "(unclosed").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn from_config_keeps_declared_order() {
        let cfg = vec![
            IntentRuleConfig {
                intent: "agent".into(),
                keywords: vec!["agent".into(), "talk to someone".into()],
                pattern: None,
            },
            IntentRuleConfig {
                intent: "balance".into(),
                keywords: vec![],
                pattern: Some("balance|how much".into()),
            },
        ];
        let rules = IntentRules::from_config(&cfg).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.classify("agent, what's my balance"), Some("agent"));
        assert_eq!(rules.classify("How much money do I have"), Some("balance"));
    }

    #[test]
    fn keyword_set_finds_phrase_in_sentence() {
        let set = KeywordSet::new(&["end session".to_string(), "exit".to_string()]).unwrap();
        assert_eq!(set.find("please END session now").as_deref(), Some("end session"));
        assert!(set.matches("Exit."));
        assert!(!set.matches("exiting soon"));
        assert!(!KeywordSet::default().matches("exit"));
    }
}
