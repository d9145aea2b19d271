use std::path::Path;

use bundlekit_core::config::LoadOptions;
use bundlekit_core::engine::{
    BundleEvaluation, BundleEvaluationInput, BundleRuntime, DeterministicBundleRuntime,
};
use serde::Serialize;

use crate::commands::{bad_request, completed, prepare, BundleRequest, CommandResult};

const COMMAND: &str = "evaluate";

#[derive(Debug, Serialize)]
struct EvaluationReport {
    bundle_id: String,
    currency: String,
    #[serde(flatten)]
    evaluation: BundleEvaluation,
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

    let runtime = DeterministicBundleRuntime::default();
    let mut evaluation = runtime.evaluate(BundleEvaluationInput {
        config: &request.bundle,
        selection: &request.selection,
        catalog: &request.catalog,
        prices: &request.catalog,
    });
    evaluation.final_price = evaluation.final_price.rounded(context.config.engine.money_scale);

    let message = if evaluation.validation.valid {
        "bundle selection is valid".to_string()
    } else {
        format!("bundle selection has {} rule violations", evaluation.validation.violations.len())
    };

    completed(COMMAND, &context, &request.bundle.id.0);
    CommandResult::report(
        COMMAND,
        message,
        &EvaluationReport {
            bundle_id: request.bundle.id.0.clone(),
            currency: context.config.engine.currency.clone(),
            evaluation,
        },
    )
}
