use std::path::Path;

use bundlekit_core::config::LoadOptions;
use bundlekit_core::domain::bundle::BundleId;
use bundlekit_core::engine::preview::{preview, PreviewComparison, SelectionChange};
use bundlekit_core::engine::{BundleEvaluationInput, DeterministicBundleRuntime};
use bundlekit_core::errors::{ApplicationError, DomainError};
use serde::Serialize;
use serde_json::Value;

use crate::commands::{bad_request, completed, field, prepare, BundleRequest, CommandResult};

const COMMAND: &str = "preview";

#[derive(Debug, Serialize)]
struct PreviewReport {
    bundle_id: BundleId,
    #[serde(flatten)]
    comparison: PreviewComparison,
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
    let changes = match resolve_changes(&context.body) {
        Ok(changes) => changes,
        Err(error) => return bad_request(COMMAND, &context.correlation_id, error),
    };

    let runtime = DeterministicBundleRuntime::default();
    let input = BundleEvaluationInput {
        config: &request.bundle,
        selection: &request.selection,
        catalog: &request.catalog,
        prices: &request.catalog,
    };
    let comparison = match preview(&runtime, input, &changes) {
        Ok(comparison) => comparison,
        Err(error) => {
            return bad_request(
                COMMAND,
                &context.correlation_id,
                ApplicationError::Input(error.user_safe_message()),
            )
        }
    };

    completed(COMMAND, &context, &request.bundle.id.0);
    CommandResult::report(
        COMMAND,
        format!("total changes by {}", comparison.delta.total_delta),
        &PreviewReport { bundle_id: request.bundle.id.clone(), comparison },
    )
}

fn resolve_changes(body: &Value) -> Result<Vec<SelectionChange>, DomainError> {
    serde_json::from_value(field(body, "changes")?.clone()).map_err(|error| {
        DomainError::MalformedPayload { what: "changes", reason: error.to_string() }
    })
}
