//! Derives an [`EvolutionDocument`] from the informal `evolved_from` /
//! `can_evolve_to` links of a pattern catalog.

use crate::{
    Branch, BranchPoint, EvolutionChain, EvolutionDocument, EvolutionEdge, EvolutionNode,
    GraphStatistics, NodeCategory, Relation, Severity,
};
use bianzheng_core::{PatternCatalog, SyndromePattern, CRITICAL_ELEMENT_IDS};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Name keywords per tier, checked from the most severe tier down.
const SEVERITY_KEYWORDS: &[(Severity, &[&str])] = &[
    (Severity::CRITICAL, &["亡", "危"]),
    (Severity::SEVERE, &["脫", "厥", "閉"]),
    (Severity::MODERATE, &["下陷", "不固", "氣滯"]),
    (Severity::MILD, &["虛", "不足"]),
];

const SIX_MERIDIAN_KEYS: &[&str] = &["taiyang", "yangming", "shaoyang", "taiyin", "shaoyin", "jueyin"];

const CRITICAL_PATTERN_IDS: &[&str] = &["qi_tuo_zheng", "wang_yin_zheng", "wang_yang_zheng"];

const CRITICAL_NAME_KEYWORDS: &[&str] = &["亡", "脫", "厥"];

pub fn severity_of(pattern: &SyndromePattern) -> Severity {
    for (severity, keywords) in SEVERITY_KEYWORDS {
        if keywords.iter().any(|k| pattern.name.contains(k)) {
            return *severity;
        }
    }
    if has_critical_element(pattern) {
        Severity::CRITICAL
    } else {
        Severity::MILD
    }
}

pub fn category_of(pattern: &SyndromePattern) -> NodeCategory {
    if SIX_MERIDIAN_KEYS.iter().any(|k| pattern.id.contains(k)) {
        NodeCategory::SixMeridian
    } else if CRITICAL_PATTERN_IDS.contains(&pattern.id.as_str()) {
        NodeCategory::Critical
    } else if !pattern.composition.location.is_empty() {
        NodeCategory::Organ
    } else {
        NodeCategory::Foundational
    }
}

pub fn is_critical_pattern(pattern: &SyndromePattern) -> bool {
    has_critical_element(pattern) || CRITICAL_NAME_KEYWORDS.iter().any(|k| pattern.name.contains(k))
}

fn has_critical_element(pattern: &SyndromePattern) -> bool {
    pattern
        .composition
        .nature
        .iter()
        .any(|id| CRITICAL_ELEMENT_IDS.contains(&id.as_str()))
}

/// Builds graph documents from a catalog. Curated chains can be merged in
/// after discovery.
#[derive(Debug, Clone)]
pub struct GraphBuilder<'a> {
    catalog: &'a PatternCatalog,
    known_chains: Vec<EvolutionChain>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(catalog: &'a PatternCatalog) -> Self {
        Self {
            catalog,
            known_chains: vec![EvolutionChain {
                id: "qi_disease_chain".to_string(),
                name: "氣病演變鏈".to_string(),
                path: vec![
                    "qi_xu_zheng".to_string(),
                    "zhong_qi_xia_xian".to_string(),
                    "qi_tuo_zheng".to_string(),
                ],
                description: "從氣虛到氣脫的完整演變路徑".to_string(),
                severity_progression: "輕 → 中 → 重".to_string(),
            }],
        }
    }

    pub fn with_known_chains(mut self, chains: Vec<EvolutionChain>) -> Self {
        self.known_chains = chains;
        self
    }

    pub fn build(&self) -> EvolutionDocument {
        let nodes = self.build_nodes();
        let edges = self.build_edges();
        let evolution_chains = self.find_chains(&nodes, &edges);
        let branch_points = self.find_branch_points(&edges);

        let statistics = GraphStatistics {
            total_nodes: nodes.len(),
            total_edges: edges.len(),
            critical_nodes: nodes.iter().filter(|n| n.is_critical).count(),
            evolution_chains: evolution_chains.len(),
        };
        info!(
            "Built evolution graph: {} nodes, {} edges, {} chains",
            statistics.total_nodes, statistics.total_edges, statistics.evolution_chains
        );

        EvolutionDocument {
            version: Some("1.0".to_string()),
            generated_at: None,
            description: Some("證型演變關係的有向圖結構".to_string()),
            nodes,
            edges,
            evolution_chains,
            branch_points,
            statistics,
        }
    }

    fn build_nodes(&self) -> Vec<EvolutionNode> {
        let mut nodes: Vec<EvolutionNode> = self
            .catalog
            .iter()
            .map(|p| EvolutionNode {
                id: p.id.clone(),
                name: p.name.clone(),
                category: category_of(p),
                severity: severity_of(p),
                is_critical: is_critical_pattern(p),
            })
            .collect();
        nodes.sort_by(|a, b| a.severity.cmp(&b.severity).then_with(|| a.name.cmp(&b.name)));
        nodes
    }

    fn build_edges(&self) -> Vec<EvolutionEdge> {
        let mut edges = Vec::new();
        let mut seen: HashSet<(&str, &str)> = HashSet::new();

        for pattern in self.catalog.iter() {
            let forward = pattern.can_evolve_to.iter().map(|to| (pattern.id.as_str(), to.as_str()));
            let backward = pattern.evolved_from.iter().map(|from| (from.as_str(), pattern.id.as_str()));
            for (from, to) in forward.chain(backward) {
                if seen.insert((from, to)) {
                    edges.push(self.build_edge(from, to));
                }
            }
        }
        edges
    }

    fn build_edge(&self, from: &str, to: &str) -> EvolutionEdge {
        let source = self.catalog.get(from);
        let from_severity = source.map(severity_of).unwrap_or(Severity::MILD);
        let to_severity = self.catalog.get(to).map(severity_of).unwrap_or(Severity::MILD);

        let relation = if to_severity >= Severity::CRITICAL {
            Relation::Crisis
        } else if to_severity > from_severity {
            Relation::Worsening
        } else {
            Relation::Development
        };

        let description = source
            .and_then(|p| p.key_point_against(to))
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "{}演變為{}",
                    self.catalog.display_name(from),
                    self.catalog.display_name(to)
                )
            });

        EvolutionEdge {
            from: from.to_string(),
            to: to.to_string(),
            relation,
            condition: String::new(),
            description,
        }
    }

    fn find_chains(&self, nodes: &[EvolutionNode], edges: &[EvolutionEdge]) -> Vec<EvolutionChain> {
        let node_map: HashMap<&str, &EvolutionNode> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut in_degree: HashMap<&str, usize> = HashMap::new();

        for edge in edges {
            if node_map.contains_key(edge.from.as_str()) && node_map.contains_key(edge.to.as_str()) {
                adjacency.entry(&edge.from).or_default().push(&edge.to);
                *in_degree.entry(&edge.to).or_default() += 1;
            }
        }

        let name_of = |id: &str| node_map.get(id).map(|n| n.name.clone()).unwrap_or_else(|| id.to_string());

        let mut chains: Vec<EvolutionChain> = Vec::new();
        for node in nodes {
            let start = node.id.as_str();
            let is_source = in_degree.get(start).copied().unwrap_or(0) == 0;
            if !is_source || !adjacency.contains_key(start) {
                continue;
            }

            let path = longest_path(start, &adjacency, &mut HashSet::new());
            if path.len() < 2 || chains.iter().any(|c| same_node_set(&c.path, &path)) {
                continue;
            }

            let severities: Vec<Severity> = path
                .iter()
                .map(|id| node_map.get(id.as_str()).map(|n| n.severity).unwrap_or(Severity::MILD))
                .collect();
            let severity_progression = if severities.windows(2).all(|w| w[0] <= w[1]) {
                severities
                    .iter()
                    .map(|s| s.short_label())
                    .collect::<Vec<_>>()
                    .join(" → ")
            } else {
                String::new()
            };

            let first = name_of(&path[0]);
            let last = name_of(&path[path.len() - 1]);
            debug!("Discovered chain from '{}' with {} nodes", start, path.len());
            chains.push(EvolutionChain {
                id: format!("chain_{}", start),
                name: format!("{}演變鏈", first),
                description: format!("從{}到{}的演變路徑", first, last),
                path,
                severity_progression,
            });
        }

        for known in &self.known_chains {
            if !chains.iter().any(|c| same_node_set(&c.path, &known.path)) {
                chains.push(known.clone());
            }
        }
        chains
    }

    fn find_branch_points(&self, edges: &[EvolutionEdge]) -> Vec<BranchPoint> {
        let mut order: Vec<&str> = Vec::new();
        let mut targets: HashMap<&str, Vec<&EvolutionEdge>> = HashMap::new();
        for edge in edges {
            let entry = targets.entry(&edge.from).or_insert_with(|| {
                order.push(&edge.from);
                Vec::new()
            });
            entry.push(edge);
        }

        order
            .into_iter()
            .filter_map(|from| {
                let tos = targets.get(from)?;
                (tos.len() > 1).then(|| BranchPoint {
                    from: from.to_string(),
                    from_name: self.catalog.display_name(from).to_string(),
                    branches: tos
                        .iter()
                        .map(|edge| Branch {
                            to: edge.to.clone(),
                            to_name: self.catalog.display_name(&edge.to).to_string(),
                            description: edge.description.clone(),
                        })
                        .collect(),
                })
            })
            .collect()
    }
}

/// Longest simple path from `start`; the first strictly longer branch wins ties.
fn longest_path<'a>(
    start: &'a str,
    adjacency: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
) -> Vec<String> {
    if !visited.insert(start) {
        return Vec::new();
    }

    let mut best: Vec<String> = Vec::new();
    for next in adjacency.get(start).into_iter().flatten() {
        if visited.contains(next) {
            continue;
        }
        let path = longest_path(next, adjacency, visited);
        if path.len() > best.len() {
            best = path;
        }
    }
    visited.remove(start);

    let mut path = Vec::with_capacity(best.len() + 1);
    path.push(start.to_string());
    path.extend(best);
    path
}

fn same_node_set(a: &[String], b: &[String]) -> bool {
    let a: HashSet<&String> = a.iter().collect();
    let b: HashSet<&String> = b.iter().collect();
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use bianzheng_core::{Composition, Differentiation};

    fn pattern(id: &str, name: &str, location: &[&str], nature: &[&str]) -> SyndromePattern {
        SyndromePattern::new(
            id,
            name,
            Composition {
                location: location.iter().map(|s| s.to_string()).collect(),
                nature: nature.iter().map(|s| s.to_string()).collect(),
            },
        )
    }

    fn to(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_severity_prefers_most_severe_keyword() {
        assert_eq!(severity_of(&pattern("a", "氣虛證", &[], &["qi_xu"])), Severity::MILD);
        assert_eq!(severity_of(&pattern("b", "中氣下陷證", &[], &["qi_xu"])), Severity::MODERATE);
        // 虛 and 脫 both present: the higher tier wins.
        assert_eq!(severity_of(&pattern("c", "氣虛欲脫證", &[], &["qi_xu"])), Severity::SEVERE);
        assert_eq!(severity_of(&pattern("d", "亡陽證", &[], &["wang_yang"])), Severity::CRITICAL);
        assert_eq!(severity_of(&pattern("e", "某證", &[], &["xue_tuo"])), Severity::CRITICAL);
        assert_eq!(severity_of(&pattern("f", "風寒證", &[], &["feng"])), Severity::MILD);
    }

    #[test]
    fn test_category_rules_in_priority_order() {
        assert_eq!(category_of(&pattern("taiyang_zhongfeng", "太陽中風證", &["biao"], &["feng"])), NodeCategory::SixMeridian);
        assert_eq!(category_of(&pattern("qi_tuo_zheng", "氣脫證", &[], &["qi_tuo"])), NodeCategory::Critical);
        assert_eq!(category_of(&pattern("fei_qi_xu", "肺氣虛證", &["fei"], &["qi_xu"])), NodeCategory::Organ);
        assert_eq!(category_of(&pattern("qi_xu_zheng", "氣虛證", &[], &["qi_xu"])), NodeCategory::Foundational);
    }

    #[test]
    fn test_critical_flag_from_element_or_name() {
        assert!(is_critical_pattern(&pattern("a", "某證", &[], &["qi_jue"])));
        assert!(is_critical_pattern(&pattern("b", "寒厥證", &[], &["han"])));
        assert!(!is_critical_pattern(&pattern("c", "中氣下陷證", &[], &["qi_xu"])));
    }

    #[test]
    fn test_build_edges_relations_and_descriptions() {
        let catalog = PatternCatalog::new(vec![
            pattern("qi_xu_zheng", "氣虛證", &[], &["qi_xu"])
                .with_evolution(vec![], to(&["zhong_qi_xia_xian"]))
                .with_differentiation(Differentiation {
                    compare_with: Some("zhong_qi_xia_xian".to_string()),
                    key_points: vec!["有無下陷".to_string()],
                    ..Differentiation::default()
                }),
            pattern("zhong_qi_xia_xian", "中氣下陷證", &["pi"], &["qi_xu"])
                .with_evolution(to(&["qi_xu_zheng"]), to(&["qi_tuo_zheng"])),
            pattern("qi_tuo_zheng", "氣脫證", &[], &["qi_tuo"])
                .with_evolution(to(&["zhong_qi_xia_xian"]), vec![]),
        ]);
        let doc = GraphBuilder::new(&catalog).build();

        assert_eq!(doc.edges.len(), 2);
        assert_eq!(doc.edges[0].relation, Relation::Worsening);
        assert_eq!(doc.edges[0].description, "有無下陷");
        assert_eq!(doc.edges[1].relation, Relation::Worsening);
        assert_eq!(doc.edges[1].description, "中氣下陷證演變為氣脫證");

        let ids: Vec<_> = doc.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["qi_xu_zheng", "zhong_qi_xia_xian", "qi_tuo_zheng"]);

        // Discovered chain covers the curated one, so it is not merged twice.
        assert_eq!(doc.evolution_chains.len(), 1);
        let chain = &doc.evolution_chains[0];
        assert_eq!(chain.id, "chain_qi_xu_zheng");
        assert_eq!(chain.name, "氣虛證演變鏈");
        assert_eq!(chain.severity_progression, "輕 → 中 → 重");
        assert_eq!(doc.statistics.total_edges, 2);
        assert_eq!(doc.statistics.critical_nodes, 1);
    }

    #[test]
    fn test_crisis_relation_and_branch_points() {
        let catalog = PatternCatalog::new(vec![
            pattern("yin_xu", "陰虛證", &[], &["yin_xu"]).with_evolution(vec![], to(&["wang_yin_zheng", "xu_re", "missing"])),
            pattern("wang_yin_zheng", "亡陰證", &[], &["wang_yin"]),
            pattern("xu_re", "虛熱證", &[], &["re"]),
        ]);
        let doc = GraphBuilder::new(&catalog).with_known_chains(vec![]).build();

        assert_eq!(doc.edges[0].relation, Relation::Crisis);
        assert_eq!(doc.edges[1].relation, Relation::Development);
        assert_eq!(doc.edges[2].description, "陰虛證演變為missing");

        assert_eq!(doc.branch_points.len(), 1);
        assert_eq!(doc.branch_points[0].branches.len(), 3);
        assert_eq!(doc.branch_points[0].branches[2].to_name, "missing");
        assert_eq!(doc.branch_points[0].branches[2].description, "陰虛證演變為missing");

        // Both two-node paths start at yin_xu; the first found wins.
        assert_eq!(doc.evolution_chains.len(), 1);
        assert_eq!(doc.evolution_chains[0].path, to(&["yin_xu", "wang_yin_zheng"]));
    }
}
