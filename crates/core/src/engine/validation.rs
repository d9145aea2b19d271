use serde::{Deserialize, Serialize};

use crate::domain::bundle::BundleConfig;
use crate::domain::product::ProductId;
use crate::domain::selection::Selection;
use crate::engine::catalog::CatalogLookup;

const UNKNOWN_PRODUCT: &str = "Unknown product";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationCode {
    BelowMinItems,
    AboveMaxItems,
    CategoryNotAllowed,
    ProductExcluded,
    ProductUnavailable,
    OutOfStock,
    InsufficientStock,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub code: ViolationCode,
    pub message: String,
    pub product_id: Option<ProductId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self { valid: true, violations: Vec::new() }
    }
}

impl ValidationResult {
    fn push(&mut self, code: ViolationCode, message: String, product_id: Option<&ProductId>) {
        self.violations.push(Violation { code, message, product_id: product_id.cloned() });
        self.valid = false;
    }

    /// Human-readable messages in check order.
    pub fn errors(&self) -> Vec<&str> {
        self.violations.iter().map(|violation| violation.message.as_str()).collect()
    }

    pub fn has(&self, code: ViolationCode) -> bool {
        self.violations.iter().any(|violation| violation.code == code)
    }
}

pub trait ValidationEngine: Send + Sync {
    fn validate(
        &self,
        config: &BundleConfig,
        selection: &Selection,
        catalog: &dyn CatalogLookup,
    ) -> ValidationResult;
}

#[derive(Default)]
pub struct DeterministicValidationEngine;

impl ValidationEngine for DeterministicValidationEngine {
    fn validate(
        &self,
        config: &BundleConfig,
        selection: &Selection,
        catalog: &dyn CatalogLookup,
    ) -> ValidationResult {
        validate(config, selection, catalog)
    }
}

/// Checks a selection against the bundle's rules and the current catalog.
///
/// Every check runs; violations are reported in the order min items, max
/// items, category, exclusion, existence, stock. `allow_duplicates` has no
/// check here: a [`Selection`] holds one entry per product.
pub fn validate<C: CatalogLookup + ?Sized>(
    config: &BundleConfig,
    selection: &Selection,
    catalog: &C,
) -> ValidationResult {
    let rules = &config.rules;
    let mut result = ValidationResult::default();
    let total_quantity = selection.total_quantity();
    let display_name = |product_id: &ProductId| {
        catalog
            .product(product_id)
            .map(|product| product.name.clone())
            .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string())
    };

    let min_items = u64::from(rules.min_items);
    if total_quantity < min_items {
        result.push(
            ViolationCode::BelowMinItems,
            format!(
                "Please select at least {} items ({} more needed).",
                rules.min_items,
                min_items - total_quantity
            ),
            None,
        );
    }

    if total_quantity > u64::from(rules.max_items) {
        result.push(
            ViolationCode::AboveMaxItems,
            format!("Please select no more than {} items.", rules.max_items),
            None,
        );
    }

    if !rules.required_categories.is_empty() {
        for entry in selection.active() {
            let allowed = catalog
                .product(&entry.product_id)
                .map(|product| product.in_any_category(&rules.required_categories))
                .unwrap_or(false);
            if !allowed {
                result.push(
                    ViolationCode::CategoryNotAllowed,
                    format!(
                        "\"{}\" is not in an allowed category.",
                        display_name(&entry.product_id)
                    ),
                    Some(&entry.product_id),
                );
            }
        }
    }

    for entry in selection.active() {
        if rules.excluded_products.contains(&entry.product_id) {
            result.push(
                ViolationCode::ProductExcluded,
                format!("\"{}\" is not allowed in this bundle.", display_name(&entry.product_id)),
                Some(&entry.product_id),
            );
        }
    }

    if selection.active().any(|entry| catalog.product(&entry.product_id).is_none()) {
        result.push(
            ViolationCode::ProductUnavailable,
            "One or more selected products are no longer available.".to_string(),
            None,
        );
    }

    for entry in selection.active() {
        let Some(product) = catalog.product(&entry.product_id) else {
            continue;
        };
        if !product.in_stock {
            result.push(
                ViolationCode::OutOfStock,
                format!("\"{}\" is out of stock.", product.name),
                Some(&entry.product_id),
            );
        } else if let Some(available) = product.stock_quantity {
            if available < entry.quantity {
                result.push(
                    ViolationCode::InsufficientStock,
                    format!("Only {available} of \"{}\" available in stock.", product.name),
                    Some(&entry.product_id),
                );
            }
        }
    }

    result
}

pub fn meets_minimum_requirements(config: &BundleConfig, selection: &Selection) -> bool {
    selection.total_quantity() >= u64::from(config.rules.min_items)
}
