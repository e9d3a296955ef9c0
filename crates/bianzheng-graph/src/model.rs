use bianzheng_core::{BianzhengError, PatternId, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Clinical severity tier, 1 (mild) to 4 (critical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Severity(u8);

impl Severity {
    pub const MILD: Severity = Severity(1);
    pub const MODERATE: Severity = Severity(2);
    pub const SEVERE: Severity = Severity(3);
    pub const CRITICAL: Severity = Severity(4);

    pub fn new(value: u8) -> Option<Self> {
        (1..=4).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "輕證",
            2 => "中證",
            3 => "重證",
            _ => "危重證",
        }
    }

    /// Single-character form used in chain progressions.
    pub fn short_label(self) -> &'static str {
        match self.0 {
            1 => "輕",
            2 => "中",
            3 => "重",
            _ => "危",
        }
    }
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("severity {} outside 1..=4", value))
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.0
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    #[serde(rename = "基礎證候", alias = "foundational")]
    Foundational,
    #[serde(rename = "臟腑證候", alias = "organ")]
    Organ,
    #[serde(rename = "六經證候", alias = "six_meridian")]
    SixMeridian,
    #[serde(rename = "危重證候", alias = "critical")]
    Critical,
}

impl NodeCategory {
    pub fn label(self) -> &'static str {
        match self {
            NodeCategory::Foundational => "基礎證候",
            NodeCategory::Organ => "臟腑證候",
            NodeCategory::SixMeridian => "六經證候",
            NodeCategory::Critical => "危重證候",
        }
    }
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    #[serde(rename = "發展", alias = "development")]
    Development,
    #[serde(rename = "惡化", alias = "worsening")]
    Worsening,
    #[serde(rename = "危變", alias = "crisis")]
    Crisis,
}

impl Relation {
    pub fn label(self) -> &'static str {
        match self {
            Relation::Development => "發展",
            Relation::Worsening => "惡化",
            Relation::Crisis => "危變",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionNode {
    pub id: PatternId,
    pub name: String,
    pub category: NodeCategory,
    pub severity: Severity,
    /// Independent of severity.
    #[serde(default)]
    pub is_critical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionEdge {
    pub from: PatternId,
    pub to: PatternId,
    pub relation: Relation,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub condition: String,
    #[serde(default)]
    pub description: String,
}

/// A named traversal path. Consecutive ids are implied steps; they need
/// not exist as edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionChain {
    pub id: String,
    pub name: String,
    pub path: Vec<PatternId>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub severity_progression: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStatistics {
    #[serde(default)]
    pub total_nodes: usize,
    #[serde(default)]
    pub total_edges: usize,
    #[serde(default)]
    pub critical_nodes: usize,
    #[serde(default)]
    pub evolution_chains: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub to: PatternId,
    pub to_name: String,
    #[serde(default)]
    pub description: String,
}

/// A node that can develop into more than one successor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchPoint {
    pub from: PatternId,
    pub from_name: String,
    pub branches: Vec<Branch>,
}

/// On-disk evolution graph (`indexes/evolution_graph.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvolutionDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub nodes: Vec<EvolutionNode>,
    pub edges: Vec<EvolutionEdge>,
    pub evolution_chains: Vec<EvolutionChain>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branch_points: Vec<BranchPoint>,
    pub statistics: GraphStatistics,
}

const REQUIRED_KEYS: [&str; 4] = ["nodes", "edges", "evolution_chains", "statistics"];

impl EvolutionDocument {
    /// Parse a graph document. Any structural problem, including a missing
    /// top-level key or a severity outside 1..=4, is `MalformedGraphDocument`.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| BianzhengError::MalformedGraphDocument(e.to_string()))?;
        Self::from_value(value)
    }

    /// `branch_points` is optional; entries that do not parse are skipped.
    pub fn from_value(mut value: Value) -> Result<Self> {
        let object = value.as_object_mut().ok_or_else(|| {
            BianzhengError::MalformedGraphDocument("top level is not an object".to_string())
        })?;
        for key in REQUIRED_KEYS {
            if !object.contains_key(key) {
                return Err(BianzhengError::MalformedGraphDocument(format!(
                    "missing top-level key '{}'",
                    key
                )));
            }
        }
        let raw_branches = object.remove("branch_points");

        let mut doc: Self = serde_json::from_value(value)
            .map_err(|e| BianzhengError::MalformedGraphDocument(e.to_string()))?;
        doc.branch_points = match raw_branches {
            Some(Value::Array(entries)) => entries
                .into_iter()
                .filter_map(|entry| match serde_json::from_value::<BranchPoint>(entry) {
                    Ok(point) => Some(point),
                    Err(e) => {
                        warn!("Skipping malformed branch point: {}", e);
                        None
                    }
                })
                .collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                warn!("Ignoring branch_points: expected an array, found {}", other);
                Vec::new()
            }
        };
        Ok(doc)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
