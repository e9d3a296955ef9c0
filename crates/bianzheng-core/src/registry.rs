use crate::{BianzhengError, ElementCategory, Result, Subcategory, SyndromeElement};
use std::collections::HashMap;
use tracing::warn;

/// Read-only lookup of syndrome elements by id.
#[derive(Debug, Clone, Default)]
pub struct ZhengsuRegistry {
    elements: Vec<SyndromeElement>,
    index: HashMap<String, usize>,
}

impl ZhengsuRegistry {
    pub fn new(elements: Vec<SyndromeElement>) -> Self {
        let mut kept = Vec::with_capacity(elements.len());
        let mut index = HashMap::with_capacity(elements.len());

        for element in elements {
            if index.contains_key(&element.id) {
                warn!("Duplicate syndrome element id '{}', keeping the first", element.id);
                continue;
            }
            index.insert(element.id.clone(), kept.len());
            kept.push(element);
        }

        Self {
            elements: kept,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&SyndromeElement> {
        self.index.get(id).map(|&i| &self.elements[i])
    }

    pub fn resolve(&self, id: &str) -> Result<&SyndromeElement> {
        self.get(id)
            .ok_or_else(|| BianzhengError::UnknownElementId(id.to_string()))
    }

    /// Element name, or the raw id when the element is unknown.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|e| e.name.as_str()).unwrap_or(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyndromeElement> {
        self.elements.iter()
    }

    pub fn by_category(&self, category: ElementCategory) -> Vec<&SyndromeElement> {
        self.elements.iter().filter(|e| e.category == category).collect()
    }

    pub fn by_subcategory(&self, subcategory: Subcategory) -> Vec<&SyndromeElement> {
        self.elements
            .iter()
            .filter(|e| e.subcategory == subcategory)
            .collect()
    }

    pub fn critical(&self) -> Vec<&SyndromeElement> {
        self.elements.iter().filter(|e| e.is_critical).collect()
    }

    pub fn treatment_for(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(|e| e.treatment.as_deref())
    }
}

impl FromIterator<SyndromeElement> for ZhengsuRegistry {
    fn from_iter<I: IntoIterator<Item = SyndromeElement>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
