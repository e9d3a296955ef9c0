use crate::{CompositionPolicy, PatternCatalog, ZhengsuRegistry};
use std::collections::{HashMap, HashSet};

/// Findings of a catalog consistency check, by severity.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Cross-record consistency checks over a loaded registry and catalog.
pub struct CatalogValidator<'a> {
    registry: &'a ZhengsuRegistry,
    catalog: &'a PatternCatalog,
    policy: CompositionPolicy,
    report: ValidationReport,
}

impl<'a> CatalogValidator<'a> {
    pub fn new(registry: &'a ZhengsuRegistry, catalog: &'a PatternCatalog) -> Self {
        Self {
            registry,
            catalog,
            policy: CompositionPolicy::default(),
            report: ValidationReport::default(),
        }
    }

    pub fn with_policy(mut self, policy: CompositionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn run(mut self) -> ValidationReport {
        self.check_element_references();
        self.check_pattern_references();
        self.check_evolution_links();
        self.check_duplicate_compositions();
        self.report
    }

    fn check_element_references(&mut self) {
        for pattern in self.catalog.iter() {
            for id in &pattern.composition.location {
                if !self.registry.contains(id) {
                    self.report.warnings.push(format!(
                        "pattern [{}] references unknown location element: {}",
                        pattern.name, id
                    ));
                }
            }
            for id in &pattern.composition.nature {
                if !self.registry.contains(id) {
                    self.report.warnings.push(format!(
                        "pattern [{}] references unknown nature element: {}",
                        pattern.name, id
                    ));
                }
            }
        }
    }

    fn check_pattern_references(&mut self) {
        for pattern in self.catalog.iter() {
            let linked = pattern
                .evolved_from
                .iter()
                .map(|id| ("evolved_from", id))
                .chain(pattern.can_evolve_to.iter().map(|id| ("can_evolve_to", id)))
                .chain(
                    pattern
                        .differentiation
                        .iter()
                        .filter_map(|d| d.compare_with.as_ref())
                        .map(|id| ("differentiation", id)),
                );
            for (field, id) in linked {
                if !self.catalog.contains(id) {
                    self.report.warnings.push(format!(
                        "pattern [{}] {} references unknown pattern: {}",
                        pattern.name, field, id
                    ));
                }
            }
        }
    }

    fn check_evolution_links(&mut self) {
        let mut evolve_to: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut evolve_from: HashMap<&str, HashSet<&str>> = HashMap::new();

        for pattern in self.catalog.iter() {
            evolve_to
                .entry(pattern.id.as_str())
                .or_default()
                .extend(pattern.can_evolve_to.iter().map(String::as_str));
            evolve_from
                .entry(pattern.id.as_str())
                .or_default()
                .extend(pattern.evolved_from.iter().map(String::as_str));
        }

        for pattern in self.catalog.iter() {
            for target in &pattern.can_evolve_to {
                if !self.catalog.contains(target) {
                    continue;
                }
                let mirrored = evolve_from
                    .get(target.as_str())
                    .map(|sources| sources.contains(pattern.id.as_str()))
                    .unwrap_or(false);
                if !mirrored {
                    self.report.info.push(format!(
                        "one-directional evolution link: [{}] -> [{}]",
                        pattern.name,
                        self.catalog.display_name(target)
                    ));
                }
            }
        }

        if let Some(cycle) = find_cycle(self.catalog, &evolve_to) {
            let names: Vec<&str> = cycle.iter().map(|id| self.catalog.display_name(id)).collect();
            self.report
                .errors
                .push(format!("evolution cycle: {}", names.join(" -> ")));
        }
    }

    fn check_duplicate_compositions(&mut self) {
        let mut seen: HashMap<(Vec<&str>, Vec<&str>), &str> = HashMap::new();
        for pattern in self.catalog.iter() {
            let key = pattern.composition.canonical_key();
            if let Some(first) = seen.get(&key) {
                let message = format!(
                    "patterns [{}] and [{}] share the same composition",
                    self.catalog.display_name(first),
                    pattern.name
                );
                match self.policy {
                    CompositionPolicy::Reject => self.report.errors.push(message),
                    CompositionPolicy::FirstWins => self.report.warnings.push(message),
                }
            } else {
                seen.insert(key, pattern.id.as_str());
            }
        }
    }
}

/// First cycle in the informal `can_evolve_to` relation, as a closed id path.
fn find_cycle<'a>(
    catalog: &'a PatternCatalog,
    evolve_to: &HashMap<&'a str, Vec<&'a str>>,
) -> Option<Vec<&'a str>> {
    fn dfs<'a>(
        node: &'a str,
        catalog: &PatternCatalog,
        evolve_to: &HashMap<&'a str, Vec<&'a str>>,
        visited: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<&'a str>> {
        if let Some(pos) = path.iter().position(|n| *n == node) {
            let mut cycle = path[pos..].to_vec();
            cycle.push(node);
            return Some(cycle);
        }
        if !visited.insert(node) {
            return None;
        }
        path.push(node);
        for next in evolve_to.get(node).into_iter().flatten() {
            if catalog.contains(next) {
                if let Some(cycle) = dfs(next, catalog, evolve_to, visited, path) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
        None
    }

    let mut visited = HashSet::new();
    for pattern in catalog.iter() {
        let start = pattern.id.as_str();
        if !visited.contains(start) {
            if let Some(cycle) = dfs(start, catalog, evolve_to, &mut visited, &mut Vec::new()) {
                return Some(cycle);
            }
        }
    }
    None
}
