use std::path::Path;

use bundlekit_core::config::LoadOptions;
use bundlekit_core::engine::pricing::{
    pricing_breakdown, BreakdownLine, CalculationResult, DeterministicPricingEngine, PricingEngine,
    PricingTrace,
};
use serde::Serialize;

use crate::commands::{bad_request, completed, prepare, BundleRequest, CommandResult};

const COMMAND: &str = "price";

#[derive(Debug, Serialize)]
struct PriceReport {
    bundle_id: String,
    currency: String,
    calculation: CalculationResult,
    items: Vec<BreakdownLine>,
    trace: PricingTrace,
}

pub fn run(request_path: &Path, options: LoadOptions) -> CommandResult {
    let context = match prepare(COMMAND, request_path, options) {
        Ok(context) => context,
        Err(failure) => return failure,
    };
    let request = match BundleRequest::resolve(&context) {
        Ok(request) => request,
        Err(error) => return bad_request(COMMAND, &context.correlation_id, error),
    };

    let priced =
        DeterministicPricingEngine.price(&request.bundle, &request.selection, &request.catalog);
    let breakdown = pricing_breakdown(&request.bundle, &request.selection, &request.catalog);
    let scale = context.config.engine.money_scale;

    completed(COMMAND, &context, &request.bundle.id.0);
    CommandResult::report(
        COMMAND,
        format!("priced {} selected items", request.selection.total_quantity()),
        &PriceReport {
            bundle_id: request.bundle.id.0.clone(),
            currency: context.config.engine.currency.clone(),
            calculation: priced.calculation.rounded(scale),
            items: breakdown.items,
            trace: priced.trace,
        },
    )
}
