//! Severity-tier layouts. Both are pure functions over
//! [`EvolutionGraph::compute_severity_tiers`](crate::EvolutionGraph::compute_severity_tiers);
//! the force-directed layout belongs to the renderer.

use crate::{EvolutionNode, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

pub type SeverityTiers<'a> = BTreeMap<Severity, Vec<&'a EvolutionNode>>;

/// Tiers stacked top to bottom by severity, nodes spread evenly across each row.
///
/// Rows are placed by rank among the tiers present, not by raw severity, so a
/// graph without some severities still fits inside `height`.
pub fn hierarchical(tiers: &SeverityTiers<'_>, width: f64, height: f64) -> HashMap<String, Position> {
    let level_height = height / (tiers.len() + 1) as f64;
    let mut positions = HashMap::new();

    for (rank, nodes) in tiers.values().enumerate() {
        let y = (rank + 1) as f64 * level_height;
        let step = width / (nodes.len() + 1) as f64;
        for (i, node) in nodes.iter().enumerate() {
            positions.insert(node.id.clone(), Position::new((i + 1) as f64 * step, y));
        }
    }

    positions
}

/// Tiers as concentric rings around `center`, severity 1 innermost. The first
/// node of each ring sits at the top.
pub fn radial(tiers: &SeverityTiers<'_>, center: Position, ring_spacing: f64) -> HashMap<String, Position> {
    let mut positions = HashMap::new();

    for (severity, nodes) in tiers {
        let radius = f64::from(severity.value()) * ring_spacing;
        let angle_step = 2.0 * PI / nodes.len() as f64;
        for (i, node) in nodes.iter().enumerate() {
            let angle = i as f64 * angle_step - PI / 2.0;
            positions.insert(
                node.id.clone(),
                Position::new(center.x + radius * angle.cos(), center.y + radius * angle.sin()),
            );
        }
    }

    positions
}
