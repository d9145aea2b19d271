use std::collections::HashMap;
use std::path::Path;

use bundlekit_core::boundary::{resolve_bundle_config, resolve_cart_lines};
use bundlekit_core::config::LoadOptions;
use bundlekit_core::domain::bundle::BundleConfig;
use bundlekit_core::domain::cart::{bundle_summary, group_cart_lines, BundleSummary, CartLine};
use bundlekit_core::engine::allocation::{allocate_group, GroupAllocation};
use bundlekit_core::engine::catalog::{BundleConfigSource, InMemoryBundleStore};
use bundlekit_core::errors::DomainError;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::commands::{bad_request, field, prepare, CommandResult, RequestContext};

const COMMAND: &str = "cart";

#[derive(Debug, Serialize)]
struct CartReport {
    currency: String,
    groups: Vec<GroupAllocation>,
    summaries: Vec<BundleSummary>,
}

/// Re-allocates every bundle instance in a cart, as the storefront does
/// whenever cart totals are recalculated.
pub fn run(request_path: &Path, options: LoadOptions) -> CommandResult {
    let context = match prepare(COMMAND, request_path, options) {
        Ok(context) => context,
        Err(failure) => return failure,
    };
    let (store, lines) = match resolve(&context) {
        Ok(resolved) => resolved,
        Err(error) => return bad_request(COMMAND, &context.correlation_id, error),
    };
    let groups = match allocate_cart(&store, &lines) {
        Ok(groups) => groups,
        Err(error) => return bad_request(COMMAND, &context.correlation_id, error),
    };

    let per_unit: HashMap<&str, Decimal> = groups
        .iter()
        .flat_map(|group| group.lines.iter())
        .map(|line| (line.line_key.as_str(), line.allocation.per_unit_discount))
        .collect();
    let summaries = bundle_summary(&lines, |line_key| per_unit.get(line_key).copied());

    CommandResult::report(
        COMMAND,
        format!("allocated discounts for {} bundles", groups.len()),
        &CartReport { currency: context.config.engine.currency.clone(), groups, summaries },
    )
}

fn resolve(context: &RequestContext) -> Result<(InMemoryBundleStore, Vec<CartLine>), DomainError> {
    let defaults = context.config.engine.boundary_defaults();
    let bundles = field(&context.body, "bundles")?
        .as_array()
        .ok_or_else(|| DomainError::MalformedPayload {
            what: "bundles",
            reason: "expected an array of bundle templates".to_string(),
        })?
        .iter()
        .map(|bundle| resolve_bundle_config(bundle, &defaults))
        .collect::<Result<Vec<BundleConfig>, _>>()?;
    let lines = resolve_cart_lines(field(&context.body, "cart_lines")?)?;
    Ok((InMemoryBundleStore::new(bundles), lines))
}

fn allocate_cart(
    store: &impl BundleConfigSource,
    lines: &[CartLine],
) -> Result<Vec<GroupAllocation>, DomainError> {
    group_cart_lines(lines)
        .iter()
        .map(|group| {
            let config = store
                .bundle(group.bundle_id)
                .ok_or_else(|| DomainError::UnknownBundle(group.bundle_id.clone()))?;
            Ok(allocate_group(config, group))
        })
        .collect()
}
