//! Per-site enablement rules
//!
//! Ordered list of domain overrides resolved against the page hostname.
//! First matching rule wins; no match means enabled.

use serde::{Deserialize, Serialize};

/// What a matching rule does to the ToC on that site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Enable,
    Disable,
}

/// A single per-site override, persisted and user-edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRule {
    pub domain: String,
    pub action: RuleAction,
}

impl DomainRule {
    pub fn new(domain: &str, action: RuleAction) -> Self {
        Self {
            domain: domain.to_string(),
            action,
        }
    }
}

/// Resolve whether the ToC is enabled for `hostname`.
///
/// The match is a symmetric substring test: a rule for `example.com` covers
/// `blog.example.com`, and a rule for `blog.example.com` still matches when
/// the page reports `example.com`. Tolerant of subdomain and TLD variation
/// at the cost of ambiguity between unrelated rules that happen to overlap.
/// Rules with an empty pattern never match.
pub fn is_enabled(hostname: &str, rules: &[DomainRule]) -> bool {
    for rule in rules {
        if rule.domain.is_empty() {
            continue;
        }
        if hostname.contains(&rule.domain) || rule.domain.contains(hostname) {
            return rule.action == RuleAction::Enable;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdomain_matches_disable_rule() {
        let rules = vec![DomainRule::new("example.com", RuleAction::Disable)];
        assert!(!is_enabled("blog.example.com", &rules));
    }

    #[test]
    fn test_no_rules_defaults_to_enabled() {
        assert!(is_enabled("foo.com", &[]));
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = vec![
            DomainRule::new("a.com", RuleAction::Enable),
            DomainRule::new("a.com", RuleAction::Disable),
        ];
        assert!(is_enabled("a.com", &rules));
    }

    #[test]
    fn test_pattern_containing_hostname_matches() {
        let rules = vec![DomainRule::new("docs.rust-lang.org", RuleAction::Disable)];
        assert!(!is_enabled("rust-lang.org", &rules));
    }

    #[test]
    fn test_empty_pattern_never_matches() {
        let rules = vec![
            DomainRule::new("", RuleAction::Disable),
            DomainRule::new("other.net", RuleAction::Disable),
        ];
        assert!(is_enabled("foo.com", &rules));
    }

    #[test]
    fn test_unrelated_rule_falls_through() {
        let rules = vec![DomainRule::new("wiki.org", RuleAction::Disable)];
        assert!(is_enabled("example.com", &rules));
    }
}
