pub mod boundary;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;

pub use boundary::{
    resolve_bundle_config, resolve_cart_lines, resolve_line_items, resolve_products,
    resolve_selection, BoundaryDefaults,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::bundle::{
    BundleConfig, BundleId, BundleRules, BundleType, DiscountTier, DisplaySettings, Layout,
    PricingPolicy, PricingType, TierDiscount,
};
pub use domain::cart::{
    bundle_summary, group_cart_lines, AllocatedDiscount, BundleGroup, BundleGroupKey,
    BundleSummary, CartLine, LineItem,
};
pub use domain::product::{CategoryId, ProductId, ProductSnapshot};
pub use domain::selection::{Selection, SelectionEntry};
pub use engine::allocation::{allocate, allocate_group, AllocatedLine, GroupAllocation};
pub use engine::catalog::{
    BundleConfigSource, CatalogLookup, InMemoryBundleStore, InMemoryCatalog, PriceLookup,
};
pub use engine::pricing::{
    CalculationResult, DeterministicPricingEngine, PricingEngine, PricingResult, PricingTrace,
};
pub use engine::validation::{
    DeterministicValidationEngine, ValidationEngine, ValidationResult, Violation, ViolationCode,
};
pub use engine::{
    BundleEvaluation, BundleEvaluationInput, BundleRuntime, DeterministicBundleRuntime,
    PriceAdjuster,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
