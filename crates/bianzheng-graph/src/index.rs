use crate::{EvolutionChain, EvolutionGraph};
use bianzheng_core::{BianzhengError, PatternId, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{info, warn};

/// One editorial group of chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainGroup {
    pub key: String,
    pub chain_ids: Vec<String>,
}

/// Static group-key to chain-id table. Membership is curated, not derived
/// from graph structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainGroups {
    groups: Vec<ChainGroup>,
}

/// Key that selects the whole graph in [`EvolutionGraph::filter_by_chain_category`].
pub const ALL_CHAINS: &str = "all";

const DEFAULT_GROUPS: &[(&str, &[&str])] = &[
    (
        "qi",
        &[
            "chain_qi_xu_zheng",
            "chain_pi_qi_xu",
            "chain_fei_qi_xu",
            "chain_xin_qi_xu",
            "chain_shen_qi_xu",
            "qi_disease_chain",
        ],
    ),
    ("blood", &["chain_xue_xu", "chain_xue_yu"]),
    ("yin_yang", &["chain_yin_xu", "chain_yang_xu", "chain_wang_yin"]),
    (
        "liu_jing",
        &["chain_tai_yang_zheng", "chain_tai_yin_zheng", "chain_shao_yang"],
    ),
    ("weiqi", &["chain_wei_fen", "chain_qi_fen"]),
];

impl Default for ChainGroups {
    fn default() -> Self {
        Self {
            groups: DEFAULT_GROUPS
                .iter()
                .map(|(key, ids)| ChainGroup {
                    key: key.to_string(),
                    chain_ids: ids.iter().map(|id| id.to_string()).collect(),
                })
                .collect(),
        }
    }
}

impl ChainGroups {
    pub fn new(groups: Vec<ChainGroup>) -> Self {
        Self { groups }
    }

    /// Group keys in table order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.key.as_str())
    }

    pub fn chain_ids(&self, key: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|g| g.key == key)
            .map(|g| g.chain_ids.as_slice())
    }

    pub fn group_of(&self, chain_id: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.chain_ids.iter().any(|id| id == chain_id))
            .map(|g| g.key.as_str())
    }
}

/// Chains of one graph organised by [`ChainGroups`].
#[derive(Debug, Clone)]
pub struct ChainIndex {
    chains: Vec<EvolutionChain>,
    groups: ChainGroups,
}

impl ChainIndex {
    pub fn new(graph: &EvolutionGraph, groups: ChainGroups) -> Self {
        Self {
            chains: graph.chains().to_vec(),
            groups,
        }
    }

    pub fn empty() -> Self {
        Self {
            chains: Vec::new(),
            groups: ChainGroups::default(),
        }
    }

    pub fn groups(&self) -> &ChainGroups {
        &self.groups
    }

    pub fn chains(&self) -> &[EvolutionChain] {
        &self.chains
    }

    /// Chains of a group that exist in the graph, in the group's listed
    /// order. Unknown keys give an empty list.
    pub fn chains_by_group(&self, key: &str) -> Vec<&EvolutionChain> {
        self.groups
            .chain_ids(key)
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.chains.iter().find(|c| &c.id == id))
            .collect()
    }

    /// Chains no group lists.
    pub fn ungrouped(&self) -> Vec<&EvolutionChain> {
        self.chains
            .iter()
            .filter(|c| self.groups.group_of(&c.id).is_none())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Opposite,
    Progressive,
    Related,
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Relationship::Opposite => "opposite",
            Relationship::Progressive => "progressive",
            Relationship::Related => "related",
        };
        write!(f, "{}", s)
    }
}

/// Two syndromes linked editorially for differential diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonPair {
    pub syndromes: [PatternId; 2],
    pub relationship: Relationship,
    #[serde(default)]
    pub comparison_key: String,
    #[serde(default)]
    pub description: String,
}

impl ComparisonPair {
    pub fn involves(&self, id: &str) -> bool {
        self.syndromes.iter().any(|s| s == id)
    }

    /// The partner of `id` in this pair.
    pub fn other(&self, id: &str) -> Option<&str> {
        match &self.syndromes {
            [a, b] if a == id => Some(b),
            [a, b] if b == id => Some(a),
            _ => None,
        }
    }
}

/// Comparison pairs in source order. No symmetry or transitive closure.
#[derive(Debug, Clone, Default)]
pub struct PairIndex {
    pairs: Vec<ComparisonPair>,
}

impl PairIndex {
    pub fn new(pairs: Vec<ComparisonPair>) -> Self {
        Self { pairs }
    }

    /// Parse `{pairs: [...]}`. A document without `pairs` is an error; an
    /// individual bad pair is skipped.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let entries = value
            .get("pairs")
            .and_then(Value::as_array)
            .ok_or_else(|| BianzhengError::invalid_record("comparison_pairs", "missing 'pairs' array"))?;

        let mut pairs = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            match serde_json::from_value::<ComparisonPair>(entry.clone()) {
                Ok(pair) => pairs.push(pair),
                Err(e) => warn!("Skipping comparison pair #{}: {}", i, e),
            }
        }
        info!("Loaded {} comparison pairs", pairs.len());
        Ok(Self { pairs })
    }

    pub fn pairs_all(&self) -> &[ComparisonPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs that list `id` directly.
    pub fn pairs_involving(&self, id: &str) -> Vec<&ComparisonPair> {
        self.pairs.iter().filter(|p| p.involves(id)).collect()
    }

    pub fn by_relationship(&self, relationship: Relationship) -> Vec<&ComparisonPair> {
        self.pairs
            .iter()
            .filter(|p| p.relationship == relationship)
            .collect()
    }
}
