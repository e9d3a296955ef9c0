use crate::layout::{Position, SeverityTiers};
use crate::{
    Branch, BranchPoint, ChainGroups, EvolutionChain, EvolutionDocument, EvolutionEdge,
    EvolutionNode, GraphStatistics, Severity, ALL_CHAINS,
};
use bianzheng_core::{BianzhengError, EdgePolicy, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Nodes and edges of a filtered view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subgraph<'a> {
    pub nodes: Vec<&'a EvolutionNode>,
    pub edges: Vec<&'a EvolutionEdge>,
}

/// Names a node evolves into and out of, for a detail panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvolutionSummary<'a> {
    pub evolves_to: Vec<&'a str>,
    pub evolves_from: Vec<&'a str>,
}

/// Read-only syndrome evolution graph with adjacency indexes.
///
/// Edges may reference ids that are not nodes; lookups tolerate them and
/// [`EvolutionGraph::dangling_edges`] reports them.
#[derive(Debug, Clone, Default)]
pub struct EvolutionGraph {
    nodes: Vec<EvolutionNode>,
    node_index: HashMap<String, usize>,
    edges: Vec<EvolutionEdge>,
    outgoing: HashMap<String, Vec<usize>>,
    incoming: HashMap<String, Vec<usize>>,
    chains: Vec<EvolutionChain>,
    chain_index: HashMap<String, usize>,
    statistics: GraphStatistics,
    declared_branch_points: Vec<BranchPoint>,
    positions: HashMap<String, Position>,
}

impl EvolutionGraph {
    pub fn from_json(json: &str, policy: EdgePolicy) -> Result<Self> {
        Self::from_document(EvolutionDocument::from_json(json)?, policy)
    }

    pub fn from_document(doc: EvolutionDocument, policy: EdgePolicy) -> Result<Self> {
        let mut graph = Self {
            statistics: doc.statistics,
            declared_branch_points: doc.branch_points,
            ..Self::default()
        };

        for node in doc.nodes {
            if graph.node_index.contains_key(&node.id) {
                warn!("Duplicate evolution node '{}', keeping the first", node.id);
                continue;
            }
            graph.node_index.insert(node.id.clone(), graph.nodes.len());
            graph.nodes.push(node);
        }

        let mut seen: HashSet<(String, String)> = HashSet::new();
        for edge in doc.edges {
            let key = (edge.from.clone(), edge.to.clone());
            if !seen.insert(key) {
                match policy {
                    EdgePolicy::Dedupe => {
                        warn!("Dropping duplicate edge {} -> {}", edge.from, edge.to);
                        continue;
                    }
                    EdgePolicy::Reject => {
                        return Err(BianzhengError::DuplicateEdge {
                            from: edge.from,
                            to: edge.to,
                        });
                    }
                    EdgePolicy::AllowMulti => {
                        debug!("Keeping parallel edge {} -> {}", edge.from, edge.to);
                    }
                }
            }
            if !graph.node_index.contains_key(&edge.from) || !graph.node_index.contains_key(&edge.to) {
                warn!("Edge {} -> {} references a missing node", edge.from, edge.to);
            }
            let idx = graph.edges.len();
            graph.outgoing.entry(edge.from.clone()).or_default().push(idx);
            graph.incoming.entry(edge.to.clone()).or_default().push(idx);
            graph.edges.push(edge);
        }

        for chain in doc.evolution_chains {
            if chain.path.len() < 2 {
                warn!("Skipping chain '{}': path shorter than 2", chain.id);
                continue;
            }
            if graph.chain_index.contains_key(&chain.id) {
                warn!("Duplicate evolution chain '{}', keeping the first", chain.id);
                continue;
            }
            graph.chain_index.insert(chain.id.clone(), graph.chains.len());
            graph.chains.push(chain);
        }

        let actual = graph.computed_statistics();
        if actual != graph.statistics {
            debug!(
                "Declared graph statistics {:?} differ from loaded {:?}",
                graph.statistics, actual
            );
        }

        info!(
            "Loaded evolution graph: {} nodes, {} edges, {} chains",
            graph.nodes.len(),
            graph.edges.len(),
            graph.chains.len()
        );
        Ok(graph)
    }

    pub fn nodes(&self) -> &[EvolutionNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[EvolutionEdge] {
        &self.edges
    }

    pub fn chains(&self) -> &[EvolutionChain] {
        &self.chains
    }

    pub fn node(&self, id: &str) -> Option<&EvolutionNode> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn chain(&self, id: &str) -> Option<&EvolutionChain> {
        self.chain_index.get(id).map(|&i| &self.chains[i])
    }

    /// Statistics as declared by the document.
    pub fn statistics(&self) -> &GraphStatistics {
        &self.statistics
    }

    /// Statistics counted from what was actually loaded.
    pub fn computed_statistics(&self) -> GraphStatistics {
        GraphStatistics {
            total_nodes: self.nodes.len(),
            total_edges: self.edges.len(),
            critical_nodes: self.nodes.iter().filter(|n| n.is_critical).count(),
            evolution_chains: self.chains.len(),
        }
    }

    /// Name of a node, or the raw id.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.node(id).map(|n| n.name.as_str()).unwrap_or(id)
    }

    /// Edges leaving `node_id`, in source order.
    pub fn neighbors_out(&self, node_id: &str) -> Vec<&EvolutionEdge> {
        self.edges_at(&self.outgoing, node_id)
    }

    /// Edges entering `node_id`, in source order.
    pub fn neighbors_in(&self, node_id: &str) -> Vec<&EvolutionEdge> {
        self.edges_at(&self.incoming, node_id)
    }

    fn edges_at(&self, index: &HashMap<String, Vec<usize>>, node_id: &str) -> Vec<&EvolutionEdge> {
        index
            .get(node_id)
            .map(|idxs| idxs.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    /// Nodes of a chain in path order. Path ids without a node are skipped.
    pub fn nodes_in_chain(&self, chain_id: &str) -> Result<Vec<&EvolutionNode>> {
        let chain = self
            .chain(chain_id)
            .ok_or_else(|| BianzhengError::UnknownChain(chain_id.to_string()))?;
        Ok(chain.path.iter().filter_map(|id| self.node(id)).collect())
    }

    /// Ids of the chain's existing nodes, for highlighting.
    pub fn chain_node_ids(&self, chain_id: &str) -> HashSet<&str> {
        self.chain(chain_id)
            .map(|chain| {
                chain
                    .path
                    .iter()
                    .filter_map(|id| self.node(id))
                    .map(|n| n.id.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Induced subgraph over the union of the group's chain nodes.
    ///
    /// [`ALL_CHAINS`], an unknown key, or a group with none of its chains in
    /// the graph yield the whole graph. Chains whose path ids are all missing
    /// still filter, to an empty view.
    pub fn filter_by_chain_category(&self, groups: &ChainGroups, key: &str) -> Subgraph<'_> {
        let chains: Vec<&EvolutionChain> = if key == ALL_CHAINS {
            Vec::new()
        } else {
            groups
                .chain_ids(key)
                .unwrap_or_default()
                .iter()
                .filter_map(|id| self.chain(id))
                .collect()
        };

        if chains.is_empty() {
            return Subgraph {
                nodes: self.nodes.iter().collect(),
                edges: self.edges.iter().collect(),
            };
        }

        let keep: HashSet<&str> = chains
            .into_iter()
            .flat_map(|c| c.path.iter())
            .filter(|id| self.node_index.contains_key(id.as_str()))
            .map(String::as_str)
            .collect();

        Subgraph {
            nodes: self.nodes.iter().filter(|n| keep.contains(n.id.as_str())).collect(),
            edges: self
                .edges
                .iter()
                .filter(|e| keep.contains(e.from.as_str()) && keep.contains(e.to.as_str()))
                .collect(),
        }
    }

    /// Nodes grouped by severity; each tier keeps node order.
    pub fn compute_severity_tiers(&self) -> SeverityTiers<'_> {
        let mut tiers: BTreeMap<Severity, Vec<&EvolutionNode>> = BTreeMap::new();
        for node in &self.nodes {
            tiers.entry(node.severity).or_default().push(node);
        }
        tiers
    }

    /// The node plus every id one edge away in either direction.
    pub fn related_ids<'a>(&'a self, node_id: &'a str) -> HashSet<&'a str> {
        let mut related = HashSet::new();
        related.insert(node_id);
        related.extend(self.neighbors_out(node_id).into_iter().map(|e| e.to.as_str()));
        related.extend(self.neighbors_in(node_id).into_iter().map(|e| e.from.as_str()));
        related
    }

    pub fn evolution_summary(&self, node_id: &str) -> Result<EvolutionSummary<'_>> {
        if self.node(node_id).is_none() {
            return Err(BianzhengError::UnknownNode(node_id.to_string()));
        }
        Ok(EvolutionSummary {
            evolves_to: self
                .neighbors_out(node_id)
                .into_iter()
                .map(|e| self.display_name(&e.to))
                .collect(),
            evolves_from: self
                .neighbors_in(node_id)
                .into_iter()
                .map(|e| self.display_name(&e.from))
                .collect(),
        })
    }

    pub fn dangling_edges(&self) -> Vec<&EvolutionEdge> {
        self.edges
            .iter()
            .filter(|e| self.node(&e.from).is_none() || self.node(&e.to).is_none())
            .collect()
    }

    /// Branch points listed in the document, as loaded.
    pub fn declared_branch_points(&self) -> &[BranchPoint] {
        &self.declared_branch_points
    }

    /// Sources with two or more outgoing edges, in order of first appearance.
    pub fn branch_points(&self) -> Vec<BranchPoint> {
        let mut order: Vec<&str> = Vec::new();
        for edge in &self.edges {
            if !order.contains(&edge.from.as_str()) {
                order.push(&edge.from);
            }
        }

        order
            .into_iter()
            .filter_map(|from| {
                let out = self.neighbors_out(from);
                if out.len() < 2 {
                    return None;
                }
                Some(BranchPoint {
                    from: from.to_string(),
                    from_name: self.display_name(from).to_string(),
                    branches: out
                        .into_iter()
                        .map(|e| Branch {
                            to: e.to.clone(),
                            to_name: self.display_name(&e.to).to_string(),
                            description: e.description.clone(),
                        })
                        .collect(),
                })
            })
            .collect()
    }

    /// Display text for a raw severity value; out-of-range values read "未知".
    pub fn severity_label(severity: u8) -> &'static str {
        Severity::new(severity).map(Severity::label).unwrap_or("未知")
    }

    pub fn set_position(&mut self, node_id: &str, position: Position) -> Result<()> {
        if self.node(node_id).is_none() {
            return Err(BianzhengError::UnknownNode(node_id.to_string()));
        }
        self.positions.insert(node_id.to_string(), position);
        Ok(())
    }

    /// Store a whole layout; ids without a node are ignored.
    pub fn apply_positions(&mut self, positions: HashMap<String, Position>) {
        for (id, position) in positions {
            if self.node_index.contains_key(&id) {
                self.positions.insert(id, position);
            }
        }
    }

    pub fn position(&self, node_id: &str) -> Option<Position> {
        self.positions.get(node_id).copied()
    }

    pub fn clear_positions(&mut self) {
        self.positions.clear();
    }
}
