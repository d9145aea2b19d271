use crate::domain::bundle::{DiscountTier, TierDiscount};

/// Picks the discount of the highest tier whose threshold `total_quantity` reaches.
///
/// Tiers may arrive in any order; they are stable-sorted by `qty` first, so of
/// two tiers sharing a threshold the later one in the input wins. Returns
/// `None` when the list is empty or the quantity is below every threshold.
pub fn resolve_tier(tiers: &[DiscountTier], total_quantity: u64) -> Option<TierDiscount> {
    let mut ordered: Vec<&DiscountTier> = tiers.iter().collect();
    ordered.sort_by_key(|tier| tier.qty);

    let mut resolved = None;
    for tier in ordered {
        if u64::from(tier.qty) > total_quantity {
            break;
        }
        resolved = Some(tier.discount);
    }
    resolved
}

pub fn resolve_tier_discount(tiers: &[DiscountTier], total_quantity: u64) -> TierDiscount {
    resolve_tier(tiers, total_quantity).unwrap_or_else(TierDiscount::none)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{resolve_tier, resolve_tier_discount};
    use crate::domain::bundle::{DiscountTier, TierDiscount};

    fn tiers() -> Vec<DiscountTier> {
        vec![
            DiscountTier::percentage(10, Decimal::new(20, 0)),
            DiscountTier::percentage(2, Decimal::new(5, 0)),
            DiscountTier::percentage(5, Decimal::new(10, 0)),
        ]
    }

    #[test]
    fn highest_qualifying_tier_wins_regardless_of_input_order() {
        assert_eq!(resolve_tier(&tiers(), 7), Some(TierDiscount::Percentage(Decimal::new(10, 0))));
        assert_eq!(resolve_tier(&tiers(), 10), Some(TierDiscount::Percentage(Decimal::new(20, 0))));
        assert_eq!(resolve_tier(&tiers(), 2), Some(TierDiscount::Percentage(Decimal::new(5, 0))));
    }

    #[test]
    fn below_every_threshold_resolves_to_nothing() {
        assert_eq!(resolve_tier(&tiers(), 1), None);
        assert_eq!(resolve_tier_discount(&tiers(), 1).value(), Decimal::ZERO);
        assert_eq!(resolve_tier(&[], 50), None);
    }

    #[test]
    fn equal_thresholds_keep_input_order() {
        let tied =
            vec![DiscountTier::percentage(3, Decimal::ONE), DiscountTier::fixed(3, Decimal::TWO)];
        assert_eq!(resolve_tier(&tied, 3), Some(TierDiscount::Fixed(Decimal::TWO)));
    }
}
