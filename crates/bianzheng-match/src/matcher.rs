use crate::Selection;
use bianzheng_core::{
    BianzhengError, ElementId, MatchConfig, PatternCatalog, SyndromePattern, ZhengsuRegistry,
};
use std::collections::HashSet;
use tracing::{debug, warn};

/// What a selection resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult<'a> {
    /// No nature element selected; nothing was scanned.
    NoSelection,
    /// The catalog pattern whose composition equals the selection.
    Matched(&'a SyndromePattern),
    /// No catalog entry; a provisional display name built from the selection.
    Inferred(String),
}

/// A match result plus the selected ids the registry does not know.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome<'a> {
    pub result: MatchResult<'a>,
    pub unresolved: Vec<ElementId>,
}

impl<'a> MatchOutcome<'a> {
    pub fn pattern(&self) -> Option<&'a SyndromePattern> {
        match self.result {
            MatchResult::Matched(p) => Some(p),
            _ => None,
        }
    }

    /// Name to show for the outcome: the pattern name or the inferred one.
    pub fn display_name(&self) -> Option<&str> {
        match &self.result {
            MatchResult::NoSelection => None,
            MatchResult::Matched(p) => Some(p.name.as_str()),
            MatchResult::Inferred(name) => Some(name.as_str()),
        }
    }

    /// `UnknownElementId` for every unresolved id. These never abort matching.
    pub fn errors(&self) -> Vec<BianzhengError> {
        self.unresolved
            .iter()
            .map(|id| BianzhengError::UnknownElementId(id.clone()))
            .collect()
    }
}

/// Provisional name for a selection with no catalog entry: location names,
/// then nature names, in selection order, with no separator, then `suffix`.
pub fn infer_pattern_name(
    location: &[ElementId],
    nature: &[ElementId],
    registry: &ZhengsuRegistry,
    suffix: &str,
) -> String {
    let mut name: String = location
        .iter()
        .chain(nature.iter())
        .map(|id| registry.display_name(id))
        .collect();
    name.push_str(suffix);
    name
}

fn as_set(ids: &[ElementId]) -> HashSet<&str> {
    ids.iter().map(String::as_str).collect()
}

/// Find the pattern whose composition is set-equal to the selection.
///
/// An empty `location` only matches patterns that also have no location.
/// When several patterns qualify the first in `patterns` order wins.
pub fn match_pattern<'a>(
    location: &[ElementId],
    nature: &[ElementId],
    patterns: &'a [SyndromePattern],
    registry: &ZhengsuRegistry,
    suffix: &str,
) -> MatchOutcome<'a> {
    if nature.is_empty() {
        return MatchOutcome {
            result: MatchResult::NoSelection,
            unresolved: Vec::new(),
        };
    }

    let mut unresolved = Vec::new();
    for id in location.iter().chain(nature.iter()) {
        if !registry.contains(id) && !unresolved.contains(id) {
            warn!("Selected syndrome element '{}' is not in the registry", id);
            unresolved.push(id.clone());
        }
    }

    let wanted_location = as_set(location);
    let wanted_nature = as_set(nature);

    let matched = patterns.iter().find(|p| {
        p.composition.nature_set() == wanted_nature
            && p.composition.location_set() == wanted_location
    });

    let result = match matched {
        Some(pattern) => {
            debug!("Selection matched pattern '{}'", pattern.id);
            MatchResult::Matched(pattern)
        }
        None => {
            let name = infer_pattern_name(location, nature, registry, suffix);
            debug!("No pattern for selection, inferred '{}'", name);
            MatchResult::Inferred(name)
        }
    };

    MatchOutcome { result, unresolved }
}

/// Matches selections against one registry and catalog.
#[derive(Debug, Clone, Copy)]
pub struct PatternMatcher<'a> {
    registry: &'a ZhengsuRegistry,
    catalog: &'a PatternCatalog,
    suffix: &'a str,
}

impl<'a> PatternMatcher<'a> {
    pub fn new(
        registry: &'a ZhengsuRegistry,
        catalog: &'a PatternCatalog,
        config: &'a MatchConfig,
    ) -> Self {
        Self {
            registry,
            catalog,
            suffix: config.pattern_suffix.as_str(),
        }
    }

    pub fn match_selection(&self, selection: &Selection) -> MatchOutcome<'a> {
        self.match_ids(selection.location(), selection.nature())
    }

    pub fn match_ids(&self, location: &[ElementId], nature: &[ElementId]) -> MatchOutcome<'a> {
        match_pattern(
            location,
            nature,
            self.catalog.as_slice(),
            self.registry,
            self.suffix,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bianzheng_core::Composition;

    fn ids(v: &[&str]) -> Vec<ElementId> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn pattern(id: &str, location: &[&str], nature: &[&str]) -> SyndromePattern {
        SyndromePattern::new(
            id,
            id,
            Composition {
                location: ids(location),
                nature: ids(nature),
            },
        )
    }

    #[test]
    fn test_first_in_catalog_order_wins() {
        let patterns = vec![
            pattern("first", &[], &["feng", "han"]),
            pattern("second", &[], &["han", "feng"]),
        ];
        let registry = ZhengsuRegistry::default();
        let outcome = match_pattern(&[], &ids(&["han", "feng"]), &patterns, &registry, "證");
        assert_eq!(outcome.pattern().map(|p| p.id.as_str()), Some("first"));
    }

    #[test]
    fn test_superset_does_not_match() {
        let patterns = vec![pattern("p", &[], &["feng"])];
        let registry = ZhengsuRegistry::default();
        let outcome = match_pattern(&[], &ids(&["feng", "han"]), &patterns, &registry, "證");
        assert_eq!(outcome.result, MatchResult::Inferred("fenghan證".to_string()));
    }

    #[test]
    fn test_unresolved_ids_are_reported_once() {
        let registry = ZhengsuRegistry::default();
        let outcome = match_pattern(&ids(&["x"]), &ids(&["y"]), &[], &registry, "證");
        assert_eq!(outcome.unresolved, ids(&["x", "y"]));
        assert_eq!(outcome.errors().len(), 2);
        assert_eq!(outcome.display_name(), Some("xy證"));
    }

    #[test]
    fn test_no_selection_skips_unresolved_check() {
        let registry = ZhengsuRegistry::default();
        let outcome = match_pattern(&ids(&["ghost"]), &[], &[], &registry, "證");
        assert_eq!(outcome.result, MatchResult::NoSelection);
        assert!(outcome.unresolved.is_empty());
        assert_eq!(outcome.display_name(), None);
    }
}
