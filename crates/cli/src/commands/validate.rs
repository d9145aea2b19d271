use std::path::Path;

use bundlekit_core::config::LoadOptions;
use bundlekit_core::engine::validation::{
    meets_minimum_requirements, DeterministicValidationEngine, ValidationEngine, Violation,
};
use serde::Serialize;

use crate::commands::{bad_request, completed, prepare, BundleRequest, CommandResult};

const COMMAND: &str = "validate";

#[derive(Debug, Serialize)]
struct ValidationReport {
    bundle_id: String,
    valid: bool,
    meets_minimum: bool,
    errors: Vec<String>,
    violations: Vec<Violation>,
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

    let result = DeterministicValidationEngine.validate(
        &request.bundle,
        &request.selection,
        &request.catalog,
    );
    let message = if result.valid {
        "selection satisfies bundle rules".to_string()
    } else {
        format!("selection has {} rule violations", result.violations.len())
    };

    completed(COMMAND, &context, &request.bundle.id.0);
    CommandResult::report(
        COMMAND,
        message,
        &ValidationReport {
            bundle_id: request.bundle.id.0.clone(),
            valid: result.valid,
            meets_minimum: meets_minimum_requirements(&request.bundle, &request.selection),
            errors: result.errors().into_iter().map(str::to_string).collect(),
            violations: result.violations,
        },
    )
}
