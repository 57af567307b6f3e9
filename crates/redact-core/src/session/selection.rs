//! Entity selection for redaction requests.

use std::collections::{BTreeMap, BTreeSet};

/// Mapping of entity category to the set of values selected for redaction.
///
/// A category key is pruned the moment its value set becomes empty, so no
/// empty-set entries ever persist. All operations are total over arbitrary
/// strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySelectionSet {
    selected: BTreeMap<String, BTreeSet<String>>,
}

impl EntitySelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Symmetric toggle: absent values are added, present values removed.
    pub fn toggle(&mut self, category: &str, value: &str) {
        if let Some(values) = self.selected.get_mut(category) {
            if values.remove(value) {
                if values.is_empty() {
                    self.selected.remove(category);
                }
            } else {
                values.insert(value.to_string());
            }
        } else {
            self.selected
                .entry(category.to_string())
                .or_default()
                .insert(value.to_string());
        }
    }

    pub fn is_selected(&self, category: &str, value: &str) -> bool {
        self.selected
            .get(category)
            .is_some_and(|values| values.contains(value))
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Exports the current selection for a redaction request.
    pub fn to_request_payload(&self) -> BTreeMap<String, Vec<String>> {
        self.selected
            .iter()
            .map(|(category, values)| {
                (category.clone(), values.iter().cloned().collect())
            })
            .collect()
    }

    /// Iterates over (category, values) pairs, for display.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.selected.iter().map(|(c, v)| (c.as_str(), v))
    }
}
