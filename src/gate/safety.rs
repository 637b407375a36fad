//! Denylist filter for statements that must never reach a backend.
//!
//! This is a heuristic, not a SQL parser. Rules are regular expressions
//! matched against the lower-cased query text, so anything that hides a
//! statement from a pattern slips through. Known gaps:
//!
//! - `unconditional_delete` is anchored at the end of the text, so a
//!   trailing comment or a second statement after an unconditional delete
//!   is not caught.
//! - Keywords split by comments (`drop/**/table`) are not caught.

use regex::Regex;
use thiserror::Error;

use crate::config::DenyRuleConfig;

/// Built-in rules, evaluated in this order before any configured ones.
pub const DEFAULT_RULES: &[(&str, &str)] = &[
    ("drop_table", r"drop\s+table"),
    // A WHERE clause after the table name keeps this from matching.
    ("unconditional_delete", r#"delete\s+from\s+[\w.`"]+\s*;?\s*$"#),
    ("truncate", r"\btruncate\b"),
    ("shutdown", r"\bshutdown\b"),
];

#[derive(Debug, Error)]
pub enum SafetyError {
    #[error("Deny rule '{id}' has an invalid pattern: {source}")]
    InvalidPattern {
        id: String,
        #[source]
        source: regex::Error,
    },
}

/// Result of checking a query against the denylist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyVerdict {
    Allowed,
    /// Carries the id of the first rule that matched.
    Rejected(String),
}

#[derive(Debug, Clone)]
struct DenyRule {
    id: String,
    pattern: Regex,
}

/// Ordered denylist; the first matching rule wins.
#[derive(Debug, Clone)]
pub struct SafetyFilter {
    rules: Vec<DenyRule>,
}

impl SafetyFilter {
    /// Build a filter from `(id, pattern)` pairs, keeping their order.
    pub fn new<I, S, P>(rules: I) -> Result<Self, SafetyError>
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: AsRef<str>,
    {
        let rules = rules
            .into_iter()
            .map(|(id, pattern)| {
                let id = id.into();
                Regex::new(pattern.as_ref())
                    .map(|pattern| DenyRule {
                        id: id.clone(),
                        pattern,
                    })
                    .map_err(|source| SafetyError::InvalidPattern { id, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Built-in rules followed by `extra`.
    pub fn with_extra_rules(extra: &[DenyRuleConfig]) -> Result<Self, SafetyError> {
        let builtin = DEFAULT_RULES
            .iter()
            .map(|(id, pattern)| (id.to_string(), pattern.to_string()));
        let configured = extra
            .iter()
            .map(|rule| (rule.id.clone(), rule.pattern.clone()));
        Self::new(builtin.chain(configured))
    }

    pub fn check(&self, query: &str) -> SafetyVerdict {
        let lower = query.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(&lower))
            .map_or(SafetyVerdict::Allowed, |rule| {
                SafetyVerdict::Rejected(rule.id.clone())
            })
    }

    /// Rule ids in evaluation order.
    pub fn rule_ids(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.id.as_str())
    }
}

impl Default for SafetyFilter {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.iter().copied()).expect("built-in deny rules compile")
    }
}
