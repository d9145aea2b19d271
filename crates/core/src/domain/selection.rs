use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionEntry {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Products a shopper picked for one bundle, in the order they were picked.
///
/// Holds at most one entry per product: inserting a product that is already
/// present replaces its quantity in place. Zero quantities are retained so the
/// caller can round-trip what it received, but every engine reads through
/// [`Selection::active`] and never sees them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SelectionEntry>", into = "Vec<SelectionEntry>")]
pub struct Selection {
    entries: Vec<SelectionEntry>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, product_id: ProductId, quantity: u32) {
        match self.entries.iter_mut().find(|entry| entry.product_id == product_id) {
            Some(entry) => entry.quantity = quantity,
            None => self.entries.push(SelectionEntry { product_id, quantity }),
        }
    }

    pub fn with(mut self, product_id: impl Into<String>, quantity: u32) -> Self {
        self.insert(ProductId::new(product_id), quantity);
        self
    }

    pub fn remove(&mut self, product_id: &ProductId) -> Option<u32> {
        let position = self.entries.iter().position(|entry| &entry.product_id == product_id)?;
        Some(self.entries.remove(position).quantity)
    }

    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.entries
            .iter()
            .find(|entry| &entry.product_id == product_id)
            .map(|entry| entry.quantity)
            .unwrap_or(0)
    }

    pub fn active(&self) -> impl Iterator<Item = &SelectionEntry> {
        self.entries.iter().filter(|entry| entry.quantity > 0)
    }

    /// Sum of all active quantities; the same product picked twice counts twice.
    pub fn total_quantity(&self) -> u64 {
        self.active().map(|entry| u64::from(entry.quantity)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.active().next().is_none()
    }

    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }
}

impl FromIterator<(ProductId, u32)> for Selection {
    fn from_iter<I: IntoIterator<Item = (ProductId, u32)>>(iter: I) -> Self {
        let mut selection = Selection::new();
        for (product_id, quantity) in iter {
            selection.insert(product_id, quantity);
        }
        selection
    }
}

impl From<Vec<SelectionEntry>> for Selection {
    fn from(entries: Vec<SelectionEntry>) -> Self {
        entries.into_iter().map(|entry| (entry.product_id, entry.quantity)).collect()
    }
}

impl From<Selection> for Vec<SelectionEntry> {
    fn from(selection: Selection) -> Self {
        selection.entries
    }
}
