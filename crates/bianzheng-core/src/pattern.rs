use crate::element::required;
use crate::{BianzhengError, ElementId, PatternId, Record};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Element composition of a pattern. Both lists behave as sets for matching;
/// order is kept for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    /// Empty means systemic, i.e. no specific location.
    #[serde(default)]
    pub location: Vec<ElementId>,
    #[serde(default)]
    pub nature: Vec<ElementId>,
}

impl Composition {
    pub fn is_systemic(&self) -> bool {
        self.location.is_empty()
    }

    pub fn contains(&self, element_id: &str) -> bool {
        self.location.iter().chain(self.nature.iter()).any(|id| id == element_id)
    }

    pub fn location_set(&self) -> HashSet<&str> {
        self.location.iter().map(String::as_str).collect()
    }

    pub fn nature_set(&self) -> HashSet<&str> {
        self.nature.iter().map(String::as_str).collect()
    }

    /// Order-insensitive key used to detect two patterns with the same composition.
    pub fn canonical_key(&self) -> (Vec<&str>, Vec<&str>) {
        let mut location: Vec<&str> = self.location_set().into_iter().collect();
        let mut nature: Vec<&str> = self.nature_set().into_iter().collect();
        location.sort_unstable();
        nature.sort_unstable();
        (location, nature)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymptomProfile {
    #[serde(default)]
    pub main: Vec<String>,
    #[serde(default)]
    pub secondary: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tongue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulse: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalVariant {
    pub name: String,
    #[serde(default)]
    pub cause: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub treatment: String,
    #[serde(default)]
    pub formula: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula_source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Differences {
    #[serde(default)]
    pub this_pattern: String,
    #[serde(default)]
    pub other_pattern: String,
}

/// A differential-diagnosis note against another pattern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Differentiation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_with: Option<PatternId>,
    #[serde(default)]
    pub compare_name: String,
    #[serde(default)]
    pub similarities: Vec<String>,
    #[serde(default)]
    pub differences: Differences,
    #[serde(default)]
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiteratureCitation {
    pub source: String,
    #[serde(default)]
    pub quote: String,
}

/// A syndrome pattern ("zhengxing"): a named combination of syndrome elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PatternRecord")]
pub struct SyndromePattern {
    pub id: PatternId,
    pub name: String,
    #[serde(rename = "alias", skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(rename = "zhengsu_composition")]
    pub composition: Composition,
    pub symptoms: SymptomProfile,
    #[serde(rename = "treatment_principle")]
    pub treatment_principles: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommended_formulas: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommended_herbs: Vec<String>,
    /// Informal links, not reconciled with the evolution graph.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub evolved_from: Vec<PatternId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub can_evolve_to: Vec<PatternId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub clinical_variants: Vec<ClinicalVariant>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub differentiation: Vec<Differentiation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub literature: Vec<LiteratureCitation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pathogenesis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub common_in: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PatternRecord {
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    alias: Vec<String>,
    zhengsu_composition: Option<Composition>,
    symptoms: Option<SymptomProfile>,
    treatment_principle: Option<Vec<String>>,
    #[serde(default)]
    recommended_formulas: Vec<String>,
    #[serde(default)]
    recommended_herbs: Vec<String>,
    #[serde(default)]
    evolved_from: Vec<String>,
    #[serde(default)]
    can_evolve_to: Vec<String>,
    #[serde(default)]
    clinical_variants: Vec<ClinicalVariant>,
    #[serde(default)]
    differentiation: Vec<Differentiation>,
    #[serde(default)]
    literature: Vec<LiteratureCitation>,
    #[serde(default)]
    pathogenesis: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    common_in: Vec<String>,
}

fn dedup_preserving_order(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

impl TryFrom<PatternRecord> for SyndromePattern {
    type Error = BianzhengError;

    fn try_from(raw: PatternRecord) -> Result<Self, Self::Error> {
        let id = required(raw.id, "<unknown>", "id")?;
        let name = required(raw.name, &id, "name")?;
        let composition = raw.zhengsu_composition.ok_or_else(|| {
            BianzhengError::invalid_record(&id, "missing field 'zhengsu_composition'")
        })?;
        if composition.nature.is_empty() {
            return Err(BianzhengError::invalid_record(
                &id,
                "zhengsu_composition.nature must not be empty",
            ));
        }
        let symptoms = raw
            .symptoms
            .ok_or_else(|| BianzhengError::invalid_record(&id, "missing field 'symptoms'"))?;
        let treatment_principles = raw.treatment_principle.ok_or_else(|| {
            BianzhengError::invalid_record(&id, "missing field 'treatment_principle'")
        })?;

        Ok(Self {
            id,
            name,
            aliases: raw.alias,
            composition: Composition {
                location: dedup_preserving_order(composition.location),
                nature: dedup_preserving_order(composition.nature),
            },
            symptoms,
            treatment_principles,
            recommended_formulas: raw.recommended_formulas,
            recommended_herbs: raw.recommended_herbs,
            evolved_from: raw.evolved_from,
            can_evolve_to: raw.can_evolve_to,
            clinical_variants: raw.clinical_variants,
            differentiation: raw.differentiation,
            literature: raw.literature,
            pathogenesis: raw.pathogenesis,
            description: raw.description,
            common_in: raw.common_in,
        })
    }
}

impl SyndromePattern {
    /// Minimal well-formed pattern, mainly for fixtures and builders.
    pub fn new(id: impl Into<String>, name: impl Into<String>, composition: Composition) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            aliases: Vec::new(),
            composition,
            symptoms: SymptomProfile::default(),
            treatment_principles: Vec::new(),
            recommended_formulas: Vec::new(),
            recommended_herbs: Vec::new(),
            evolved_from: Vec::new(),
            can_evolve_to: Vec::new(),
            clinical_variants: Vec::new(),
            differentiation: Vec::new(),
            literature: Vec::new(),
            pathogenesis: None,
            description: None,
            common_in: Vec::new(),
        }
    }

    pub fn with_evolution(mut self, evolved_from: Vec<String>, can_evolve_to: Vec<String>) -> Self {
        self.evolved_from = evolved_from;
        self.can_evolve_to = can_evolve_to;
        self
    }

    pub fn with_differentiation(mut self, differentiation: Differentiation) -> Self {
        self.differentiation.push(differentiation);
        self
    }

    /// First differentiation key point written against `other`, if any.
    pub fn key_point_against(&self, other: &str) -> Option<&str> {
        self.differentiation
            .iter()
            .find(|d| d.compare_with.as_deref() == Some(other))
            .and_then(|d| d.key_points.first())
            .map(String::as_str)
    }
}

impl Record for SyndromePattern {
    const COLLECTION: &'static str = "zhengxing";

    fn record_id(&self) -> &str {
        &self.id
    }
}
