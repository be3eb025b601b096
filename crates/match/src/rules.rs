use serde::{Deserialize, Serialize};
use thiserror::Error;

use khata_core::EntityKind;

/// One externally-configured categorization rule. Read-only here; the
/// engine never mutates the rule table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub pattern: String,
    #[serde(default)]
    pub match_type: RuleMatchType,
    pub category: String,
    #[serde(default)]
    pub entity_hint: Option<EntityKind>,
    pub priority: i32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleMatchType {
    #[default]
    Contains,
    Regex,
}

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Failed to parse rules TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid regex in rule '{pattern}': {source}")]
    Regex {
        pattern: String,
        source: regex::Error,
    },
}

#[derive(Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<CategoryRule>,
}

struct CompiledRule {
    rule: CategoryRule,
    compiled: Option<regex::Regex>,
}

/// Evaluates the active rule set, highest priority first, against a
/// transaction description. The result is advisory: it reorders which
/// matcher the engine tries first but never suppresses the others.
pub struct CategoryRuleEngine {
    rules: Vec<CompiledRule>,
}

impl CategoryRuleEngine {
    pub fn new(rules: Vec<CategoryRule>) -> Result<Self, RuleError> {
        let mut compiled = Vec::new();
        for rule in rules.into_iter().filter(|r| r.active) {
            let regex = match rule.match_type {
                RuleMatchType::Regex => Some(
                    regex::RegexBuilder::new(&rule.pattern)
                        .case_insensitive(true)
                        .build()
                        .map_err(|source| RuleError::Regex {
                            pattern: rule.pattern.clone(),
                            source,
                        })?,
                ),
                RuleMatchType::Contains => None,
            };
            compiled.push(CompiledRule {
                rule,
                compiled: regex,
            });
        }
        // Highest priority first; stable for equal priorities.
        compiled.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));
        Ok(Self { rules: compiled })
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn from_toml(content: &str) -> Result<Self, RuleError> {
        let file: RuleFile = toml::from_str(content)?;
        Self::new(file.rules)
    }

    /// First matching rule in priority order, or no hint at all.
    pub fn find_hint(&self, description: &str) -> Option<&CategoryRule> {
        let lower = description.to_lowercase();
        self.rules
            .iter()
            .find(|cr| match &cr.compiled {
                Some(re) => re.is_match(description),
                None => lower.contains(&cr.rule.pattern.to_lowercase()),
            })
            .map(|cr| &cr.rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str, category: &str, hint: Option<EntityKind>, priority: i32) -> CategoryRule {
        CategoryRule {
            pattern: pattern.to_string(),
            match_type: RuleMatchType::Contains,
            category: category.to_string(),
            entity_hint: hint,
            priority,
            active: true,
        }
    }

    #[test]
    fn contains_match_is_case_insensitive() {
        let engine = CategoryRuleEngine::new(vec![rule(
            "netflix",
            "Entertainment",
            Some(EntityKind::Subscription),
            5,
        )])
        .unwrap();
        let hit = engine.find_hint("ACH D- NETFLIX ENTERTAINMENT").unwrap();
        assert_eq!(hit.category, "Entertainment");
        assert_eq!(hit.entity_hint, Some(EntityKind::Subscription));
    }

    #[test]
    fn higher_priority_wins() {
        let engine = CategoryRuleEngine::new(vec![
            rule("salary", "Generic", None, 1),
            rule("salary", "Payroll", Some(EntityKind::Salary), 10),
        ])
        .unwrap();
        assert_eq!(engine.find_hint("STAFF SALARY NOV").unwrap().category, "Payroll");
    }

    #[test]
    fn inactive_rules_are_skipped() {
        let mut r = rule("salary", "Payroll", None, 10);
        r.active = false;
        let engine = CategoryRuleEngine::new(vec![r]).unwrap();
        assert!(engine.find_hint("STAFF SALARY NOV").is_none());
        assert!(engine.is_empty());
    }

    #[test]
    fn regex_rules() {
        let engine = CategoryRuleEngine::new(vec![CategoryRule {
            pattern: r"^(ACH|NACH) D-".to_string(),
            match_type: RuleMatchType::Regex,
            category: "Subscriptions".to_string(),
            entity_hint: Some(EntityKind::Subscription),
            priority: 5,
            active: true,
        }])
        .unwrap();
        assert!(engine.find_hint("ACH D- SPOTIFY").is_some());
        assert!(engine.find_hint("POS ACH D-").is_none());
    }

    #[test]
    fn invalid_regex_is_an_error() {
        let result = CategoryRuleEngine::new(vec![CategoryRule {
            pattern: "((broken".to_string(),
            match_type: RuleMatchType::Regex,
            category: "X".to_string(),
            entity_hint: None,
            priority: 1,
            active: true,
        }]);
        assert!(matches!(result, Err(RuleError::Regex { .. })));
    }

    #[test]
    fn loads_from_toml() {
        let engine = CategoryRuleEngine::from_toml(
            r#"
[[rules]]
pattern = "netflix"
category = "Entertainment"
entity_hint = "subscription"
priority = 5

[[rules]]
pattern = "salary"
category = "Payroll"
entity_hint = "salary"
priority = 10
active = false
"#,
        )
        .unwrap();
        assert_eq!(engine.len(), 1);
        assert!(engine.find_hint("UPI-NETFLIX-x@upi").is_some());
    }

    #[test]
    fn no_match_yields_no_hint() {
        let engine = CategoryRuleEngine::new(vec![rule("rent", "Office", None, 1)]).unwrap();
        assert!(engine.find_hint("POS GROCERY").is_none());
    }
}
