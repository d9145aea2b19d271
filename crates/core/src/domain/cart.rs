use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::bundle::BundleId;
use crate::domain::product::ProductId;

/// Shared key linking the cart/order lines of one bundle instance.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BundleGroupKey(pub String);

impl BundleGroupKey {
    /// Fresh key for a bundle being added to a cart: `bundle_{bundle_id}_{uuid}`.
    pub fn generate(bundle_id: &BundleId) -> Self {
        Self(format!("bundle_{}_{}", bundle_id.0, Uuid::new_v4().simple()))
    }
}

impl fmt::Display for BundleGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl LineItem {
    pub fn new(product_id: impl Into<String>, quantity: u32, unit_price: Decimal) -> Self {
        Self { product_id: ProductId::new(product_id), quantity, unit_price }
    }

    pub fn value(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedDiscount {
    pub product_id: ProductId,
    pub quantity: u32,
    pub per_unit_discount: Decimal,
}

impl AllocatedDiscount {
    pub fn line_discount(&self) -> Decimal {
        self.per_unit_discount * Decimal::from(self.quantity)
    }
}

/// A row in the external cart that belongs to a bundle instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub line_key: String,
    pub bundle_id: BundleId,
    pub group_key: BundleGroupKey,
    pub item: LineItem,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleGroup<'a> {
    pub group_key: &'a BundleGroupKey,
    pub bundle_id: &'a BundleId,
    pub lines: Vec<&'a CartLine>,
}

/// Groups cart lines by their bundle instance, preserving first-seen order of
/// both the groups and the lines inside each group.
pub fn group_cart_lines(lines: &[CartLine]) -> Vec<BundleGroup<'_>> {
    let mut groups: Vec<BundleGroup<'_>> = Vec::new();
    for line in lines {
        match groups.iter_mut().find(|group| group.group_key == &line.group_key) {
            Some(group) => group.lines.push(line),
            None => groups.push(BundleGroup {
                group_key: &line.group_key,
                bundle_id: &line.bundle_id,
                lines: vec![line],
            }),
        }
    }
    groups
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSummary {
    pub group_key: BundleGroupKey,
    pub bundle_id: BundleId,
    pub item_count: usize,
    pub total_discount: Decimal,
}

/// Per-bundle discount totals for a cart, given the per-unit discount the
/// caller stored on each line (keyed by `line_key`). Lines without a stored
/// discount contribute nothing.
pub fn bundle_summary(
    lines: &[CartLine],
    per_unit_discount: impl Fn(&str) -> Option<Decimal>,
) -> Vec<BundleSummary> {
    group_cart_lines(lines)
        .into_iter()
        .map(|group| BundleSummary {
            group_key: group.group_key.clone(),
            bundle_id: group.bundle_id.clone(),
            item_count: group.lines.len(),
            total_discount: group
                .lines
                .iter()
                .filter_map(|line| {
                    per_unit_discount(&line.line_key)
                        .map(|discount| discount * Decimal::from(line.item.quantity))
                })
                .sum(),
        })
        .collect()
}
