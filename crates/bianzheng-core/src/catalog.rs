use crate::{
    BianzhengError, Result, SyndromePattern, ZhengsuRegistry, CRITICAL_ELEMENT_IDS,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// What to do when two patterns declare the same composition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CompositionPolicy {
    /// Keep every pattern; matching returns the first in catalog order.
    #[default]
    FirstWins,
    /// Drop later patterns whose composition is already taken.
    Reject,
}

/// The syndrome-pattern corpus in catalog (load) order.
#[derive(Debug, Clone, Default)]
pub struct PatternCatalog {
    patterns: Vec<SyndromePattern>,
    index: HashMap<String, usize>,
}

impl PatternCatalog {
    pub fn new(patterns: Vec<SyndromePattern>) -> Self {
        Self::with_policy(patterns, CompositionPolicy::FirstWins)
    }

    pub fn with_policy(patterns: Vec<SyndromePattern>, policy: CompositionPolicy) -> Self {
        let mut kept: Vec<SyndromePattern> = Vec::with_capacity(patterns.len());
        let mut index = HashMap::with_capacity(patterns.len());
        let mut compositions: HashMap<(Vec<String>, Vec<String>), String> = HashMap::new();

        for pattern in patterns {
            if index.contains_key(&pattern.id) {
                warn!("Duplicate syndrome pattern id '{}', keeping the first", pattern.id);
                continue;
            }

            let (location, nature) = pattern.composition.canonical_key();
            let key = (
                location.into_iter().map(str::to_string).collect::<Vec<_>>(),
                nature.into_iter().map(str::to_string).collect::<Vec<_>>(),
            );
            if let Some(existing) = compositions.get(&key) {
                match policy {
                    CompositionPolicy::FirstWins => {
                        warn!(
                            "Pattern '{}' has the same composition as '{}'",
                            pattern.id, existing
                        );
                    }
                    CompositionPolicy::Reject => {
                        warn!(
                            "Rejecting pattern '{}': composition already used by '{}'",
                            pattern.id, existing
                        );
                        continue;
                    }
                }
            } else {
                compositions.insert(key, pattern.id.clone());
            }

            index.insert(pattern.id.clone(), kept.len());
            kept.push(pattern);
        }

        Self {
            patterns: kept,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SyndromePattern> {
        self.index.get(id).map(|&i| &self.patterns[i])
    }

    pub fn resolve(&self, id: &str) -> Result<&SyndromePattern> {
        self.get(id)
            .ok_or_else(|| BianzhengError::UnknownPattern(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyndromePattern> {
        self.patterns.iter()
    }

    pub fn as_slice(&self) -> &[SyndromePattern] {
        &self.patterns
    }

    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|p| p.name.as_str()).unwrap_or(id)
    }

    pub fn patterns_with_element(&self, element_id: &str) -> Vec<&SyndromePattern> {
        self.patterns
            .iter()
            .filter(|p| p.composition.contains(element_id))
            .collect()
    }

    /// Location names then nature names, joined with " + ".
    pub fn composition_summary(pattern: &SyndromePattern, registry: &ZhengsuRegistry) -> String {
        pattern
            .composition
            .location
            .iter()
            .chain(pattern.composition.nature.iter())
            .map(|id| registry.display_name(id))
            .collect::<Vec<_>>()
            .join(" + ")
    }

    /// A pattern is critical when its nature holds a critical element.
    pub fn is_critical(pattern: &SyndromePattern, registry: &ZhengsuRegistry) -> bool {
        let fixed: HashSet<&str> = CRITICAL_ELEMENT_IDS.iter().copied().collect();
        pattern.composition.nature.iter().any(|id| {
            fixed.contains(id.as_str()) || registry.get(id).map(|e| e.is_critical).unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Composition;

    fn pattern(id: &str, location: &[&str], nature: &[&str]) -> SyndromePattern {
        SyndromePattern::new(
            id,
            id,
            Composition {
                location: location.iter().map(|s| s.to_string()).collect(),
                nature: nature.iter().map(|s| s.to_string()).collect(),
            },
        )
    }

    #[test]
    fn test_first_wins_keeps_both() {
        let catalog = PatternCatalog::new(vec![
            pattern("a", &[], &["feng", "han"]),
            pattern("b", &[], &["han", "feng"]),
        ]);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_reject_drops_duplicate_composition() {
        let catalog = PatternCatalog::with_policy(
            vec![
                pattern("a", &[], &["feng", "han"]),
                pattern("b", &[], &["han", "feng"]),
                pattern("a", &["fei"], &["qi_xu"]),
            ],
            CompositionPolicy::Reject,
        );
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains("a"));
        assert!(!catalog.contains("b"));
    }

    #[test]
    fn test_patterns_with_element() {
        let catalog = PatternCatalog::new(vec![
            pattern("feiqixu", &["fei"], &["qi_xu"]),
            pattern("piqixu", &["pi"], &["qi_xu"]),
            pattern("biaohan", &[], &["feng", "han"]),
        ]);
        assert_eq!(catalog.patterns_with_element("qi_xu").len(), 2);
        assert_eq!(catalog.patterns_with_element("fei").len(), 1);
        assert_eq!(catalog.display_name("nope"), "nope");
    }

    #[test]
    fn test_is_critical_uses_fixed_ids() {
        let reg = ZhengsuRegistry::default();
        assert!(PatternCatalog::is_critical(&pattern("t", &[], &["qi_tuo"]), &reg));
        assert!(!PatternCatalog::is_critical(&pattern("x", &[], &["qi_xu"]), &reg));
    }
}
