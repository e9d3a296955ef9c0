use crate::{BianzhengError, ElementCategory, ElementId, Record, Subcategory};
use serde::{Deserialize, Serialize};

/// A syndrome element ("zhengsu"): one atomic location or nature descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ElementRecord")]
pub struct SyndromeElement {
    pub id: ElementId,
    pub name: String,
    pub category: ElementCategory,
    pub subcategory: Subcategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment: Option<String>,
    pub is_critical: bool,
    #[serde(rename = "alias", skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Raw on-disk shape; every field optional so that missing data surfaces as
/// a validation error instead of a serde error deep in a nested struct.
#[derive(Debug, Clone, Deserialize)]
struct ElementRecord {
    id: Option<String>,
    name: Option<String>,
    category: Option<ElementCategory>,
    subcategory: Option<Subcategory>,
    #[serde(default)]
    treatment: Option<String>,
    #[serde(default)]
    is_critical: Option<bool>,
    #[serde(default)]
    alias: Vec<String>,
    #[serde(default)]
    description: Option<String>,
}

impl TryFrom<ElementRecord> for SyndromeElement {
    type Error = BianzhengError;

    fn try_from(raw: ElementRecord) -> Result<Self, Self::Error> {
        let id = required(raw.id, "<unknown>", "id")?;
        let name = required(raw.name, &id, "name")?;
        let category = raw
            .category
            .ok_or_else(|| BianzhengError::invalid_record(&id, "missing field 'category'"))?;
        let subcategory = raw
            .subcategory
            .ok_or_else(|| BianzhengError::invalid_record(&id, "missing field 'subcategory'"))?;

        if subcategory.category() != category {
            return Err(BianzhengError::invalid_record(
                &id,
                format!("subcategory {} does not belong to category {}", subcategory, category),
            ));
        }

        // Treatments only attach to nature elements.
        let treatment = match category {
            ElementCategory::Nature => raw.treatment.filter(|t| !t.trim().is_empty()),
            ElementCategory::Location => None,
        };

        Ok(Self {
            id,
            name,
            category,
            subcategory,
            treatment,
            is_critical: raw.is_critical.unwrap_or(false),
            aliases: raw.alias,
            description: raw.description.unwrap_or_default(),
        })
    }
}

pub(crate) fn required(
    value: Option<String>,
    id: &str,
    field: &str,
) -> Result<String, BianzhengError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(BianzhengError::invalid_record(
            id,
            format!("missing field '{}'", field),
        )),
    }
}

impl SyndromeElement {
    pub fn is_location(&self) -> bool {
        self.category == ElementCategory::Location
    }

    pub fn is_nature(&self) -> bool {
        self.category == ElementCategory::Nature
    }
}

impl Record for SyndromeElement {
    const COLLECTION: &'static str = "zhengsu";

    fn record_id(&self) -> &str {
        &self.id
    }
}
