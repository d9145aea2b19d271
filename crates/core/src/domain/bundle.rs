use std::collections::BTreeSet;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::{CategoryId, ProductId};

pub const DEFAULT_MIN_ITEMS: u32 = 1;
pub const DEFAULT_MAX_ITEMS: u32 = 10;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BundleId(pub String);

impl BundleId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleType {
    Fixed,
    #[default]
    Flexible,
    Mixed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleRules {
    pub min_items: u32,
    pub max_items: u32,
    pub allow_duplicates: bool,
    pub required_categories: BTreeSet<CategoryId>,
    pub excluded_products: BTreeSet<ProductId>,
}

impl Default for BundleRules {
    fn default() -> Self {
        Self {
            min_items: DEFAULT_MIN_ITEMS,
            max_items: DEFAULT_MAX_ITEMS,
            allow_duplicates: false,
            required_categories: BTreeSet::new(),
            excluded_products: BTreeSet::new(),
        }
    }
}

impl BundleRules {
    pub fn with_limits(min_items: u32, max_items: u32) -> Self {
        Self { min_items, max_items, ..Self::default() }
    }

    /// `max_items < min_items` is an authoring mistake the engines tolerate:
    /// every selection then fails at least one of the two count checks.
    pub fn is_satisfiable(&self) -> bool {
        self.max_items >= self.min_items
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingType {
    #[default]
    Percentage,
    Fixed,
    Tiered,
}

/// Value of a quantity tier, tagged with how it applies to the subtotal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TierDiscount {
    Percentage(Decimal),
    Fixed(Decimal),
}

impl TierDiscount {
    pub fn none() -> Self {
        Self::Percentage(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        match self {
            Self::Percentage(value) | Self::Fixed(value) => *value,
        }
    }

    /// Currency amount this tier takes off `subtotal`, clamped to `0..=subtotal`.
    pub fn amount_for(&self, subtotal: Decimal) -> Decimal {
        match *self {
            Self::Percentage(percentage) => percentage_of(subtotal, percentage),
            Self::Fixed(amount) => capped(amount, subtotal),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountTier {
    pub qty: u32,
    pub discount: TierDiscount,
}

impl DiscountTier {
    pub fn percentage(qty: u32, percentage: Decimal) -> Self {
        Self { qty, discount: TierDiscount::Percentage(percentage) }
    }

    pub fn fixed(qty: u32, amount: Decimal) -> Self {
        Self { qty, discount: TierDiscount::Fixed(amount) }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingPolicy {
    #[serde(rename = "type")]
    pub pricing_type: PricingType,
    pub discount_value: Decimal,
    pub tiered_rules: Vec<DiscountTier>,
}

impl PricingPolicy {
    pub fn percentage(discount_value: Decimal) -> Self {
        Self { pricing_type: PricingType::Percentage, discount_value, tiered_rules: Vec::new() }
    }

    pub fn fixed(discount_value: Decimal) -> Self {
        Self { pricing_type: PricingType::Fixed, discount_value, tiered_rules: Vec::new() }
    }

    pub fn tiered(tiered_rules: Vec<DiscountTier>) -> Self {
        Self { pricing_type: PricingType::Tiered, discount_value: Decimal::ZERO, tiered_rules }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    Grid,
    List,
}

/// Storefront presentation hints. Carried with the template, never read by the engines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub show_individual_prices: bool,
    pub show_savings: bool,
    pub layout: Layout,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self { show_individual_prices: true, show_savings: true, layout: Layout::Grid }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleConfig {
    pub id: BundleId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub bundle_type: BundleType,
    #[serde(default)]
    pub rules: BundleRules,
    #[serde(default)]
    pub pricing: PricingPolicy,
    #[serde(default)]
    pub display_settings: DisplaySettings,
}

impl BundleConfig {
    pub fn new(id: impl Into<String>, rules: BundleRules, pricing: PricingPolicy) -> Self {
        Self {
            id: BundleId::new(id),
            title: String::new(),
            bundle_type: BundleType::default(),
            rules,
            pricing,
            display_settings: DisplaySettings::default(),
        }
    }
}

/// `percentage` above 100 takes the whole amount. The product is formed
/// exactly when it fits a `Decimal` and from `amount / 100` otherwise.
pub(crate) fn percentage_of(amount: Decimal, percentage: Decimal) -> Decimal {
    if percentage <= Decimal::ZERO || amount <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let percentage = percentage.min(Decimal::ONE_HUNDRED);
    let share = amount
        .checked_mul(percentage)
        .map(|product| product / Decimal::ONE_HUNDRED)
        .unwrap_or_else(|| amount / Decimal::ONE_HUNDRED * percentage);
    capped(share, amount)
}

pub(crate) fn capped(value: Decimal, ceiling: Decimal) -> Decimal {
    if value <= Decimal::ZERO || ceiling <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    value.min(ceiling)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{BundleRules, TierDiscount};

    #[test]
    fn tier_amounts_never_exceed_subtotal_or_go_negative() {
        let subtotal = Decimal::new(40, 0);

        assert_eq!(
            TierDiscount::Percentage(Decimal::new(25, 0)).amount_for(subtotal),
            Decimal::TEN
        );
        assert_eq!(TierDiscount::Percentage(Decimal::new(150, 0)).amount_for(subtotal), subtotal);
        assert_eq!(TierDiscount::Fixed(Decimal::new(55, 0)).amount_for(subtotal), subtotal);
        assert_eq!(TierDiscount::Fixed(Decimal::new(-5, 0)).amount_for(subtotal), Decimal::ZERO);
        assert_eq!(TierDiscount::none().amount_for(subtotal), Decimal::ZERO);
    }

    #[test]
    fn huge_percentage_on_huge_amount_takes_the_whole_amount() {
        let amount = Decimal::from_i128_with_scale(10_i128.pow(27), 0);

        assert_eq!(TierDiscount::Percentage(Decimal::MAX).amount_for(amount), amount);
        assert_eq!(
            TierDiscount::Percentage(Decimal::new(50, 0)).amount_for(amount),
            Decimal::from_i128_with_scale(5 * 10_i128.pow(26), 0)
        );
    }

    #[test]
    fn inverted_limits_are_reported_as_unsatisfiable() {
        assert!(BundleRules::default().is_satisfiable());
        assert!(!BundleRules::with_limits(5, 2).is_satisfiable());
    }
}
