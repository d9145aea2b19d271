use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::bundle::BundleConfig;
use crate::domain::cart::{AllocatedDiscount, BundleGroup, BundleGroupKey, LineItem};
use crate::engine::pricing::{policy_discount, CalculationResult};

/// Spreads `total_discount` over `line_items` by each line's share of the
/// bundle value (`unit_price * quantity`).
///
/// Lines of a zero-value bundle, and every line when the discount is not
/// positive, receive nothing. Per-unit amounts are left unrounded so that
/// `sum(per_unit_discount * quantity)` reproduces `total_discount`.
pub fn allocate(line_items: &[LineItem], total_discount: Decimal) -> Vec<AllocatedDiscount> {
    let total_bundle_value: Decimal = line_items.iter().map(LineItem::value).sum();
    let distributable = total_bundle_value > Decimal::ZERO && total_discount > Decimal::ZERO;

    line_items
        .iter()
        .map(|item| {
            let per_unit_discount = if distributable && item.quantity > 0 {
                let item_discount = item
                    .value()
                    .checked_mul(total_discount)
                    .map(|product| product / total_bundle_value)
                    .unwrap_or_else(|| item.value() / total_bundle_value * total_discount);
                item_discount / Decimal::from(item.quantity)
            } else {
                Decimal::ZERO
            };
            AllocatedDiscount {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                per_unit_discount,
            }
        })
        .collect()
}

/// Unit price to write back to the cart line; never below zero.
pub fn discounted_unit_price(item: &LineItem, allocation: &AllocatedDiscount) -> Decimal {
    (item.unit_price - allocation.per_unit_discount).max(Decimal::ZERO)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedLine {
    pub line_key: String,
    pub allocation: AllocatedDiscount,
    pub original_unit_price: Decimal,
    pub discounted_unit_price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAllocation {
    pub group_key: BundleGroupKey,
    pub calculation: CalculationResult,
    pub lines: Vec<AllocatedLine>,
}

/// Recomputes the discount of one bundle instance from the unit prices its
/// cart lines currently carry, then allocates it back onto those lines.
///
/// The result depends only on `config` and the lines passed in, so calling it
/// after every add, remove or quantity change yields the same adjustments for
/// the same cart contents.
pub fn allocate_group(config: &BundleConfig, group: &BundleGroup<'_>) -> GroupAllocation {
    let items: Vec<LineItem> = group.lines.iter().map(|line| line.item.clone()).collect();
    let bundle_value: Decimal = items.iter().map(LineItem::value).sum();
    let total_quantity: u64 = items.iter().map(|item| u64::from(item.quantity)).sum();
    let calculation = CalculationResult::from_parts(
        bundle_value,
        policy_discount(&config.pricing, total_quantity, bundle_value),
    );

    let lines = group
        .lines
        .iter()
        .zip(allocate(&items, calculation.discount))
        .map(|(line, allocation)| AllocatedLine {
            line_key: line.line_key.clone(),
            original_unit_price: line.item.unit_price,
            discounted_unit_price: discounted_unit_price(&line.item, &allocation),
            allocation,
        })
        .collect();

    debug!(
        event_name = "bundle.allocation.computed",
        bundle_id = %config.id,
        group_key = %group.group_key,
        line_count = group.lines.len(),
        discount = %calculation.discount,
        "bundle discount allocated across cart lines"
    );

    GroupAllocation { group_key: group.group_key.clone(), calculation, lines }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{allocate, allocate_group, discounted_unit_price};
    use crate::domain::bundle::{BundleConfig, BundleId, BundleRules, PricingPolicy};
    use crate::domain::cart::{group_cart_lines, BundleGroupKey, CartLine, LineItem};

    fn conserved(items: &[LineItem], total_discount: Decimal) -> Decimal {
        allocate(items, total_discount).iter().map(|a| a.line_discount()).sum()
    }

    #[test]
    fn discount_is_split_by_value_share() {
        let items = vec![
            LineItem::new("A", 2, Decimal::new(20, 0)),
            LineItem::new("B", 1, Decimal::new(15, 0)),
        ];

        let allocations = allocate(&items, Decimal::new(550, 2));

        // A holds 40/55 of the value: 4.00 total, 2.00 per unit. B: 1.50.
        assert_eq!(allocations[0].per_unit_discount, Decimal::new(2, 0));
        assert_eq!(allocations[1].per_unit_discount, Decimal::new(150, 2));
    }

    #[test]
    fn allocations_sum_back_to_total_discount() {
        let items = vec![
            LineItem::new("A", 3, Decimal::new(999, 2)),
            LineItem::new("B", 7, Decimal::new(1234, 2)),
            LineItem::new("C", 1, Decimal::new(1, 2)),
        ];
        let tolerance = Decimal::new(1, 6);

        for total_discount in [Decimal::new(1, 2), Decimal::new(1000, 2), Decimal::new(333_33, 2)] {
            let difference = (conserved(&items, total_discount) - total_discount).abs();
            assert!(difference <= tolerance, "lost {difference} allocating {total_discount}");
        }
    }

    #[test]
    fn large_values_allocate_without_overflow() {
        let huge = Decimal::from_i128_with_scale(10_i128.pow(17), 0);
        let items = vec![LineItem::new("A", 1, huge), LineItem::new("B", 1, huge)];

        let allocations = allocate(&items, huge);

        let half = Decimal::from_i128_with_scale(5 * 10_i128.pow(16), 0);
        assert_eq!(allocations[0].per_unit_discount, half);
        assert_eq!(allocations[1].per_unit_discount, half);
        assert_eq!(conserved(&items, huge), huge);
    }

    #[test]
    fn zero_value_bundle_allocates_nothing() {
        let items =
            vec![LineItem::new("A", 2, Decimal::ZERO), LineItem::new("B", 1, Decimal::ZERO)];
        assert!(allocate(&items, Decimal::TEN).iter().all(|a| a.per_unit_discount.is_zero()));
    }

    #[test]
    fn full_discount_brings_unit_price_to_exactly_zero() {
        let items = vec![LineItem::new("A", 2, Decimal::new(5, 0))];
        let allocations = allocate(&items, Decimal::TEN);

        assert_eq!(discounted_unit_price(&items[0], &allocations[0]), Decimal::ZERO);
    }

    #[test]
    fn group_allocation_uses_cart_prices_and_is_repeatable() {
        let config = BundleConfig::new(
            "7",
            BundleRules::with_limits(2, 5),
            PricingPolicy::percentage(Decimal::TEN),
        );
        let group_key = BundleGroupKey("bundle_7_abc".to_string());
        let lines: Vec<CartLine> = [("k1", "A", 2, 20), ("k2", "B", 1, 15)]
            .into_iter()
            .map(|(key, product, quantity, price)| CartLine {
                line_key: key.to_string(),
                bundle_id: BundleId::new("7"),
                group_key: group_key.clone(),
                item: LineItem::new(product, quantity, Decimal::new(price, 0)),
            })
            .collect();

        let groups = group_cart_lines(&lines);
        let first = allocate_group(&config, &groups[0]);
        let second = allocate_group(&config, &groups[0]);

        assert_eq!(first, second);
        assert_eq!(first.calculation.discount, Decimal::new(550, 2));
        assert_eq!(first.lines[0].discounted_unit_price, Decimal::new(18, 0));
        assert_eq!(first.lines[1].discounted_unit_price, Decimal::new(1350, 2));
    }
}
