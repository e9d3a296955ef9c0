use bianzheng_core::{ElementId, SyndromePattern, ZhengsuRegistry};
use serde::{Deserialize, Serialize};

/// The user's current pick of location and nature elements, in click order.
/// Each list is duplicate-free.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    location: Vec<ElementId>,
    nature: Vec<ElementId>,
}

fn push_unique(list: &mut Vec<ElementId>, id: ElementId) {
    if !list.contains(&id) {
        list.push(id);
    }
}

fn toggle(list: &mut Vec<ElementId>, id: &str) -> bool {
    if let Some(pos) = list.iter().position(|x| x == id) {
        list.remove(pos);
        false
    } else {
        list.push(id.to_string());
        true
    }
}

impl Selection {
    pub fn new<L, N>(location: L, nature: N) -> Self
    where
        L: IntoIterator,
        L::Item: Into<ElementId>,
        N: IntoIterator,
        N::Item: Into<ElementId>,
    {
        let mut selection = Self::default();
        for id in location {
            push_unique(&mut selection.location, id.into());
        }
        for id in nature {
            push_unique(&mut selection.nature, id.into());
        }
        selection
    }

    /// Select exactly the composition of `pattern`.
    pub fn from_pattern(pattern: &SyndromePattern) -> Self {
        Self::new(
            pattern.composition.location.iter().cloned(),
            pattern.composition.nature.iter().cloned(),
        )
    }

    pub fn location(&self) -> &[ElementId] {
        &self.location
    }

    pub fn nature(&self) -> &[ElementId] {
        &self.nature
    }

    pub fn is_empty(&self) -> bool {
        self.location.is_empty() && self.nature.is_empty()
    }

    /// Returns `true` when the element is selected after the call.
    pub fn toggle_location(&mut self, id: &str) -> bool {
        toggle(&mut self.location, id)
    }

    pub fn toggle_nature(&mut self, id: &str) -> bool {
        toggle(&mut self.nature, id)
    }

    pub fn clear(&mut self) {
        self.location.clear();
        self.nature.clear();
    }

    /// Every selected id, location first.
    pub fn ids(&self) -> impl Iterator<Item = &ElementId> {
        self.location.iter().chain(self.nature.iter())
    }

    /// Display names joined with " + ", location first; `None` when nothing is selected.
    pub fn summary(&self, registry: &ZhengsuRegistry) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(
            self.ids()
                .map(|id| registry.display_name(id))
                .collect::<Vec<_>>()
                .join(" + "),
        )
    }
}
