use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;

use crate::domain::bundle::{BundleConfig, BundleId};
use crate::domain::product::{ProductId, ProductSnapshot};

/// Product facts supplied by the storefront.
pub trait CatalogLookup {
    fn product(&self, product_id: &ProductId) -> Option<&ProductSnapshot>;
}

/// Unit prices used by the pricing evaluator. `None` prices the product at zero.
pub trait PriceLookup {
    fn price(&self, product_id: &ProductId) -> Option<Decimal>;
}

/// Read-only source of authored bundle templates.
pub trait BundleConfigSource {
    fn bundle(&self, bundle_id: &BundleId) -> Option<&BundleConfig>;
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryCatalog {
    products: Vec<ProductSnapshot>,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<ProductSnapshot>) -> Self {
        Self { products }
    }

    pub fn find(&self, product_id: &ProductId) -> Option<&ProductSnapshot> {
        self.products.iter().find(|product| &product.id == product_id)
    }

    pub fn products(&self) -> &[ProductSnapshot] {
        &self.products
    }
}

impl CatalogLookup for InMemoryCatalog {
    fn product(&self, product_id: &ProductId) -> Option<&ProductSnapshot> {
        self.find(product_id)
    }
}

impl PriceLookup for InMemoryCatalog {
    fn price(&self, product_id: &ProductId) -> Option<Decimal> {
        self.find(product_id).map(|product| product.price)
    }
}

impl PriceLookup for HashMap<ProductId, Decimal> {
    fn price(&self, product_id: &ProductId) -> Option<Decimal> {
        self.get(product_id).copied()
    }
}

impl PriceLookup for BTreeMap<ProductId, Decimal> {
    fn price(&self, product_id: &ProductId) -> Option<Decimal> {
        self.get(product_id).copied()
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryBundleStore {
    bundles: Vec<BundleConfig>,
}

impl InMemoryBundleStore {
    pub fn new(bundles: Vec<BundleConfig>) -> Self {
        Self { bundles }
    }
}

impl BundleConfigSource for InMemoryBundleStore {
    fn bundle(&self, bundle_id: &BundleId) -> Option<&BundleConfig> {
        self.bundles.iter().find(|bundle| &bundle.id == bundle_id)
    }
}
