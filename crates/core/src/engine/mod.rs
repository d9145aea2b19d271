pub mod allocation;
pub mod catalog;
pub mod preview;
pub mod pricing;
pub mod tiers;
pub mod validation;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::bundle::BundleConfig;
use crate::domain::selection::Selection;

use self::{
    catalog::{CatalogLookup, PriceLookup},
    pricing::{CalculationResult, DeterministicPricingEngine, PricingEngine, PricingResult},
    validation::{DeterministicValidationEngine, ValidationEngine, ValidationResult},
};

#[derive(Clone, Copy)]
pub struct BundleEvaluationInput<'a> {
    pub config: &'a BundleConfig,
    pub selection: &'a Selection,
    pub catalog: &'a dyn CatalogLookup,
    pub prices: &'a dyn PriceLookup,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEvaluation {
    pub validation: ValidationResult,
    /// Canonical engine output, before any caller-supplied adjustment.
    pub pricing: PricingResult,
    /// Price after every registered [`PriceAdjuster`] ran; equals the
    /// canonical calculation when none is registered.
    pub final_price: CalculationResult,
}

/// Caller policy applied on top of the canonical bundle price.
///
/// Adjusters speak through `subtotal` and `discount`; the runtime re-derives
/// `total` and `savings_percentage` from those, clamping a negative discount
/// to zero and the total at zero.
pub trait PriceAdjuster: Send + Sync {
    fn adjust(
        &self,
        config: &BundleConfig,
        selection: &Selection,
        current: &CalculationResult,
    ) -> CalculationResult;
}

impl<F> PriceAdjuster for F
where
    F: Fn(&BundleConfig, &Selection, &CalculationResult) -> CalculationResult + Send + Sync,
{
    fn adjust(
        &self,
        config: &BundleConfig,
        selection: &Selection,
        current: &CalculationResult,
    ) -> CalculationResult {
        self(config, selection, current)
    }
}

pub trait BundleRuntime: Send + Sync {
    fn evaluate(&self, input: BundleEvaluationInput<'_>) -> BundleEvaluation;
}

pub struct DeterministicBundleRuntime<V, P> {
    validation_engine: V,
    pricing_engine: P,
    adjusters: Vec<Box<dyn PriceAdjuster>>,
}

impl<V, P> DeterministicBundleRuntime<V, P> {
    pub fn new(validation_engine: V, pricing_engine: P) -> Self {
        Self { validation_engine, pricing_engine, adjusters: Vec::new() }
    }

    pub fn with_adjuster(mut self, adjuster: impl PriceAdjuster + 'static) -> Self {
        self.adjusters.push(Box::new(adjuster));
        self
    }
}

impl Default
    for DeterministicBundleRuntime<DeterministicValidationEngine, DeterministicPricingEngine>
{
    fn default() -> Self {
        Self::new(DeterministicValidationEngine, DeterministicPricingEngine)
    }
}

impl<V, P> BundleRuntime for DeterministicBundleRuntime<V, P>
where
    V: ValidationEngine,
    P: PricingEngine,
{
    fn evaluate(&self, input: BundleEvaluationInput<'_>) -> BundleEvaluation {
        let validation =
            self.validation_engine.validate(input.config, input.selection, input.catalog);
        let pricing = self.pricing_engine.price(input.config, input.selection, input.prices);

        let final_price =
            self.adjusters.iter().fold(pricing.calculation.clone(), |current, adjuster| {
                let adjusted = adjuster.adjust(input.config, input.selection, &current);
                CalculationResult::from_parts(adjusted.subtotal, adjusted.discount)
            });

        debug!(
            event_name = "bundle.evaluation.completed",
            bundle_id = %input.config.id,
            valid = validation.valid,
            violation_count = validation.violations.len(),
            subtotal = %pricing.calculation.subtotal,
            discount = %final_price.discount,
            total = %final_price.total,
            "bundle selection evaluated"
        );

        BundleEvaluation { validation, pricing, final_price }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::bundle::{BundleConfig, BundleRules, PricingPolicy};
    use crate::domain::product::ProductSnapshot;
    use crate::domain::selection::Selection;
    use crate::engine::{
        catalog::{CatalogLookup, InMemoryCatalog, PriceLookup},
        pricing::{CalculationResult, DeterministicPricingEngine, PricingEngine, PricingResult},
        validation::{ValidationEngine, ValidationResult},
        BundleEvaluationInput, BundleRuntime, DeterministicBundleRuntime,
    };

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new(vec![
            ProductSnapshot::new("A", "Alpha", Decimal::new(20, 0)),
            ProductSnapshot::new("B", "Beta", Decimal::new(15, 0)),
        ])
    }

    fn config() -> BundleConfig {
        BundleConfig::new(
            "bundle-1",
            BundleRules::with_limits(2, 5),
            PricingPolicy::percentage(Decimal::TEN),
        )
    }

    #[test]
    fn runtime_returns_validation_and_pricing_together() {
        let catalog = catalog();
        let config = config();
        let selection = Selection::new().with("A", 2).with("B", 1);

        let result = DeterministicBundleRuntime::default().evaluate(BundleEvaluationInput {
            config: &config,
            selection: &selection,
            catalog: &catalog,
            prices: &catalog,
        });

        assert!(result.validation.valid);
        assert_eq!(result.pricing.calculation.total, Decimal::new(4950, 2));
        assert_eq!(result.final_price, result.pricing.calculation);
    }

    #[test]
    fn invalid_selections_are_still_priced_for_preview() {
        let catalog = catalog();
        let config = config();
        let selection = Selection::new().with("A", 1);

        let result = DeterministicBundleRuntime::default().evaluate(BundleEvaluationInput {
            config: &config,
            selection: &selection,
            catalog: &catalog,
            prices: &catalog,
        });

        assert!(!result.validation.valid);
        assert_eq!(result.pricing.calculation.subtotal, Decimal::new(20, 0));
    }

    #[test]
    fn adjusters_run_in_order_and_results_stay_normalized() {
        let catalog = catalog();
        let config = config();
        let selection = Selection::new().with("A", 2).with("B", 1);

        let runtime = DeterministicBundleRuntime::default()
            .with_adjuster(|_: &BundleConfig, _: &Selection, current: &CalculationResult| {
                let discount = current.discount + Decimal::new(100, 0);
                CalculationResult { discount, ..current.clone() }
            })
            .with_adjuster(|_: &BundleConfig, _: &Selection, current: &CalculationResult| {
                CalculationResult { total: Decimal::new(-1, 0), ..current.clone() }
            });

        let result = runtime.evaluate(BundleEvaluationInput {
            config: &config,
            selection: &selection,
            catalog: &catalog,
            prices: &catalog,
        });

        assert_eq!(result.pricing.calculation.discount, Decimal::new(550, 2));
        assert_eq!(result.final_price.discount, Decimal::new(10550, 2));
        assert_eq!(result.final_price.total, Decimal::ZERO);
    }

    #[test]
    fn runtime_supports_explicit_engine_interfaces() {
        struct RejectAll;

        impl ValidationEngine for RejectAll {
            fn validate(
                &self,
                _config: &BundleConfig,
                _selection: &Selection,
                _catalog: &dyn CatalogLookup,
            ) -> ValidationResult {
                ValidationResult { valid: false, violations: Vec::new() }
            }
        }

        struct ListPrice;

        impl PricingEngine for ListPrice {
            fn price(
                &self,
                config: &BundleConfig,
                selection: &Selection,
                prices: &dyn PriceLookup,
            ) -> PricingResult {
                let mut result = DeterministicPricingEngine.price(config, selection, prices);
                result.calculation =
                    CalculationResult::from_parts(result.calculation.subtotal, Decimal::ZERO);
                result
            }
        }

        let catalog = catalog();
        let config = config();
        let selection = Selection::new().with("A", 2);
        let runtime = DeterministicBundleRuntime::new(RejectAll, ListPrice);

        let result = runtime.evaluate(BundleEvaluationInput {
            config: &config,
            selection: &selection,
            catalog: &catalog,
            prices: &catalog,
        });

        assert!(!result.validation.valid);
        assert_eq!(result.final_price.total, Decimal::new(40, 0));
    }
}
