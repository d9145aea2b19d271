use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::bundle::{
    capped, percentage_of, BundleConfig, BundleId, PricingPolicy, PricingType,
};
use crate::domain::product::ProductId;
use crate::domain::selection::Selection;
use crate::engine::catalog::{CatalogLookup, PriceLookup};
use crate::engine::tiers::resolve_tier;

const SAVINGS_SCALE: u32 = 2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub savings_percentage: Decimal,
}

impl CalculationResult {
    /// Builds a result that satisfies `0 <= discount` and `total = max(0, subtotal - discount)`.
    pub fn from_parts(subtotal: Decimal, discount: Decimal) -> Self {
        let discount = discount.max(Decimal::ZERO);
        let total = (subtotal - discount).max(Decimal::ZERO);
        let savings_percentage = savings_percentage(subtotal, discount);
        Self { subtotal, discount, total, savings_percentage }
    }

    pub fn zero() -> Self {
        Self::from_parts(Decimal::ZERO, Decimal::ZERO)
    }

    /// Display form: subtotal and discount rounded half away from zero to
    /// `scale` places, total re-derived from the rounded parts.
    pub fn rounded(&self, scale: u32) -> Self {
        let round = |value: Decimal| {
            let mut rounded =
                value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
            rounded.rescale(scale);
            rounded
        };
        let subtotal = round(self.subtotal);
        let discount = round(self.discount);
        Self {
            subtotal,
            discount,
            total: round((subtotal - discount).max(Decimal::ZERO)),
            savings_percentage: self.savings_percentage,
        }
    }
}

pub fn savings_percentage(subtotal: Decimal, discount: Decimal) -> Decimal {
    if subtotal <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let mut percentage = (discount / subtotal * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(SAVINGS_SCALE, RoundingStrategy::MidpointAwayFromZero);
    percentage.rescale(SAVINGS_SCALE);
    percentage
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTrace {
    pub bundle_id: BundleId,
    pub steps: Vec<PricingTraceStep>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub calculation: CalculationResult,
    pub trace: PricingTrace,
}

pub trait PricingEngine: Send + Sync {
    fn price(
        &self,
        config: &BundleConfig,
        selection: &Selection,
        prices: &dyn PriceLookup,
    ) -> PricingResult;
}

#[derive(Default)]
pub struct DeterministicPricingEngine;

impl PricingEngine for DeterministicPricingEngine {
    fn price(
        &self,
        config: &BundleConfig,
        selection: &Selection,
        prices: &dyn PriceLookup,
    ) -> PricingResult {
        price_with_trace(config, selection, prices)
    }
}

pub fn subtotal<P: PriceLookup + ?Sized>(selection: &Selection, prices: &P) -> Decimal {
    selection
        .active()
        .map(|entry| {
            prices.price(&entry.product_id).unwrap_or(Decimal::ZERO)
                * Decimal::from(entry.quantity)
        })
        .sum()
}

/// Discount a policy grants on `subtotal` for `total_quantity` selected items.
///
/// A tiered policy is exclusive: when no tier qualifies the discount is zero
/// and `discount_value` is not consulted.
pub fn policy_discount(policy: &PricingPolicy, total_quantity: u64, subtotal: Decimal) -> Decimal {
    match policy.pricing_type {
        PricingType::Tiered => resolve_tier(&policy.tiered_rules, total_quantity)
            .map(|tier| tier.amount_for(subtotal))
            .unwrap_or(Decimal::ZERO),
        PricingType::Percentage => percentage_of(subtotal, policy.discount_value),
        PricingType::Fixed => capped(policy.discount_value, subtotal),
    }
}

pub fn calculate_price<P: PriceLookup + ?Sized>(
    config: &BundleConfig,
    selection: &Selection,
    prices: &P,
) -> CalculationResult {
    let subtotal = subtotal(selection, prices);
    let discount = policy_discount(&config.pricing, selection.total_quantity(), subtotal);
    CalculationResult::from_parts(subtotal, discount)
}

pub fn price_with_trace<P: PriceLookup + ?Sized>(
    config: &BundleConfig,
    selection: &Selection,
    prices: &P,
) -> PricingResult {
    let calculation = calculate_price(config, selection, prices);
    let total_quantity = selection.total_quantity();

    let policy_detail = match config.pricing.pricing_type {
        PricingType::Tiered => match resolve_tier(&config.pricing.tiered_rules, total_quantity) {
            Some(tier) => format!("tier for {total_quantity} items: {tier:?}"),
            None => format!("no tier reached by {total_quantity} items"),
        },
        PricingType::Percentage => format!("{}% of subtotal", config.pricing.discount_value),
        PricingType::Fixed => {
            format!("fixed {} off, capped at subtotal", config.pricing.discount_value)
        }
    };

    PricingResult {
        trace: PricingTrace {
            bundle_id: config.id.clone(),
            steps: vec![
                PricingTraceStep {
                    stage: "subtotal".to_string(),
                    detail: "sum(unit_price * quantity)".to_string(),
                    amount: calculation.subtotal,
                },
                PricingTraceStep {
                    stage: "discount".to_string(),
                    detail: policy_detail,
                    amount: calculation.discount,
                },
                PricingTraceStep {
                    stage: "total".to_string(),
                    detail: "max(0, subtotal - discount)".to_string(),
                    amount: calculation.total,
                },
            ],
        },
        calculation,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    pub items: Vec<BreakdownLine>,
    pub calculation: CalculationResult,
}

/// Per-product lines for display next to the bundle price. Products missing
/// from the catalog get no line; they already contribute nothing to the price.
pub fn pricing_breakdown<C>(
    config: &BundleConfig,
    selection: &Selection,
    catalog: &C,
) -> PricingBreakdown
where
    C: CatalogLookup + PriceLookup + ?Sized,
{
    let items = selection
        .active()
        .filter_map(|entry| {
            let product = catalog.product(&entry.product_id)?;
            Some(BreakdownLine {
                product_id: entry.product_id.clone(),
                name: product.name.clone(),
                unit_price: product.price,
                quantity: entry.quantity,
                line_total: product.price * Decimal::from(entry.quantity),
            })
        })
        .collect();

    PricingBreakdown { items, calculation: calculate_price(config, selection, catalog) }
}
