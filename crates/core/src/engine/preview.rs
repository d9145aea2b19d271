use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::product::ProductId;
use crate::domain::selection::Selection;
use crate::engine::{BundleEvaluation, BundleEvaluationInput, BundleRuntime};

pub const MAX_PREVIEW_CHANGES: usize = 50;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SelectionChange {
    Set { product_id: ProductId, quantity: u32 },
    Remove { product_id: ProductId },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceDelta {
    pub subtotal_delta: Decimal,
    pub discount_delta: Decimal,
    pub total_delta: Decimal,
    pub validity_changed: bool,
    pub newly_added_errors: Vec<String>,
    pub cleared_errors: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewComparison {
    pub baseline: BundleEvaluation,
    pub variant_selection: Selection,
    pub variant: BundleEvaluation,
    pub delta: PriceDelta,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PreviewGuardrailError {
    #[error("preview requires at least one selection change")]
    EmptyChangeSet,
    #[error("preview received {requested} changes but max allowed is {max_allowed}")]
    TooManyChanges { requested: usize, max_allowed: usize },
    #[error("selection change product_id cannot be empty")]
    EmptyProductId,
    #[error("cannot remove {product_id}: it is not in the selection")]
    RemoveMissingProduct { product_id: String },
}

impl PreviewGuardrailError {
    pub fn user_safe_message(&self) -> String {
        match self {
            Self::EmptyChangeSet => {
                "Change at least one product to preview a new price.".to_string()
            }
            Self::TooManyChanges { max_allowed, .. } => {
                format!("You can preview up to {max_allowed} changes at once.")
            }
            Self::EmptyProductId => "A preview change is missing its product.".to_string(),
            Self::RemoveMissingProduct { product_id } => {
                format!("'{product_id}' is not part of this bundle selection.")
            }
        }
    }
}

/// Applies `changes` to a copy of `selection`. The input is left untouched.
pub fn fork_selection(
    selection: &Selection,
    changes: &[SelectionChange],
) -> Result<Selection, PreviewGuardrailError> {
    if changes.is_empty() {
        return Err(PreviewGuardrailError::EmptyChangeSet);
    }
    if changes.len() > MAX_PREVIEW_CHANGES {
        return Err(PreviewGuardrailError::TooManyChanges {
            requested: changes.len(),
            max_allowed: MAX_PREVIEW_CHANGES,
        });
    }

    let mut forked = selection.clone();
    for change in changes {
        match change {
            SelectionChange::Set { product_id, quantity } => {
                if product_id.0.trim().is_empty() {
                    return Err(PreviewGuardrailError::EmptyProductId);
                }
                forked.insert(product_id.clone(), *quantity);
            }
            SelectionChange::Remove { product_id } => {
                if product_id.0.trim().is_empty() {
                    return Err(PreviewGuardrailError::EmptyProductId);
                }
                if forked.remove(product_id).is_none() {
                    return Err(PreviewGuardrailError::RemoveMissingProduct {
                        product_id: product_id.0.clone(),
                    });
                }
            }
        }
    }
    Ok(forked)
}

pub fn compute_delta(baseline: &BundleEvaluation, variant: &BundleEvaluation) -> PriceDelta {
    let baseline_errors: BTreeSet<&str> = baseline.validation.errors().into_iter().collect();
    let variant_errors: BTreeSet<&str> = variant.validation.errors().into_iter().collect();

    PriceDelta {
        subtotal_delta: variant.final_price.subtotal - baseline.final_price.subtotal,
        discount_delta: variant.final_price.discount - baseline.final_price.discount,
        total_delta: variant.final_price.total - baseline.final_price.total,
        validity_changed: baseline.validation.valid != variant.validation.valid,
        newly_added_errors: variant_errors
            .difference(&baseline_errors)
            .map(|error| error.to_string())
            .collect(),
        cleared_errors: baseline_errors
            .difference(&variant_errors)
            .map(|error| error.to_string())
            .collect(),
    }
}

/// Live "what if" pricing: evaluates the current selection and a forked one
/// side by side without touching either the selection or any stored state.
pub fn preview<R: BundleRuntime + ?Sized>(
    runtime: &R,
    input: BundleEvaluationInput<'_>,
    changes: &[SelectionChange],
) -> Result<PreviewComparison, PreviewGuardrailError> {
    let variant_selection = fork_selection(input.selection, changes)?;
    let baseline = runtime.evaluate(input);
    let variant =
        runtime.evaluate(BundleEvaluationInput { selection: &variant_selection, ..input });
    let delta = compute_delta(&baseline, &variant);

    Ok(PreviewComparison { baseline, variant_selection, variant, delta })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{fork_selection, preview, PreviewGuardrailError, SelectionChange};
    use crate::domain::bundle::{BundleConfig, BundleRules, PricingPolicy};
    use crate::domain::product::{ProductId, ProductSnapshot};
    use crate::domain::selection::Selection;
    use crate::engine::catalog::InMemoryCatalog;
    use crate::engine::{BundleEvaluationInput, DeterministicBundleRuntime};

    fn set(product: &str, quantity: u32) -> SelectionChange {
        SelectionChange::Set { product_id: ProductId::new(product), quantity }
    }

    #[test]
    fn preview_reports_price_and_validity_deltas() {
        let catalog = InMemoryCatalog::new(vec![
            ProductSnapshot::new("A", "Alpha", Decimal::new(20, 0)),
            ProductSnapshot::new("B", "Beta", Decimal::new(15, 0)),
        ]);
        let config = BundleConfig::new(
            "bundle-1",
            BundleRules::with_limits(2, 5),
            PricingPolicy::percentage(Decimal::TEN),
        );
        let selection = Selection::new().with("A", 1);

        let comparison = preview(
            &DeterministicBundleRuntime::default(),
            BundleEvaluationInput {
                config: &config,
                selection: &selection,
                catalog: &catalog,
                prices: &catalog,
            },
            &[set("A", 2), set("B", 1)],
        )
        .expect("preview should succeed");

        assert_eq!(comparison.delta.subtotal_delta, Decimal::new(35, 0));
        assert_eq!(comparison.delta.total_delta, Decimal::new(3150, 2));
        assert!(comparison.delta.validity_changed);
        assert_eq!(comparison.delta.cleared_errors.len(), 1);
        assert!(comparison.variant.validation.valid);
        assert_eq!(selection.quantity_of(&ProductId::new("A")), 1);
    }

    #[test]
    fn guardrails_reject_empty_or_impossible_changes() {
        let selection = Selection::new().with("A", 1);

        assert_eq!(fork_selection(&selection, &[]), Err(PreviewGuardrailError::EmptyChangeSet));
        assert_eq!(
            fork_selection(&selection, &[set(" ", 1)]),
            Err(PreviewGuardrailError::EmptyProductId)
        );
        let missing = fork_selection(
            &selection,
            &[SelectionChange::Remove { product_id: ProductId::new("B") }],
        )
        .expect_err("removing an unselected product should fail");
        assert_eq!(missing.user_safe_message(), "'B' is not part of this bundle selection.");
    }
}
