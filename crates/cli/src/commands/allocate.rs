use std::path::Path;

use bundlekit_core::boundary::resolve_line_items;
use bundlekit_core::config::LoadOptions;
use bundlekit_core::domain::cart::{AllocatedDiscount, LineItem};
use bundlekit_core::engine::allocation::allocate;
use bundlekit_core::errors::DomainError;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::commands::{bad_request, field, prepare, CommandResult};

const COMMAND: &str = "allocate";

#[derive(Debug, Serialize)]
struct AllocationReport {
    total_discount: Decimal,
    allocated_total: Decimal,
    allocations: Vec<AllocatedDiscount>,
}

pub fn run(request_path: &Path, options: LoadOptions) -> CommandResult {
    let context = match prepare(COMMAND, request_path, options) {
        Ok(context) => context,
        Err(failure) => return failure,
    };
    let (line_items, total_discount) = match resolve(&context.body) {
        Ok(resolved) => resolved,
        Err(error) => return bad_request(COMMAND, &context.correlation_id, error),
    };

    let allocations = allocate(&line_items, total_discount);
    let allocated_total: Decimal = allocations.iter().map(AllocatedDiscount::line_discount).sum();

    CommandResult::report(
        COMMAND,
        format!("allocated discount across {} line items", allocations.len()),
        &AllocationReport { total_discount, allocated_total, allocations },
    )
}

fn resolve(body: &Value) -> Result<(Vec<LineItem>, Decimal), DomainError> {
    let line_items = resolve_line_items(field(body, "line_items")?)?;
    let raw_discount = field(body, "total_discount")?;
    let total_discount = serde_json::from_value::<Decimal>(raw_discount.clone()).map_err(|error| {
        DomainError::MalformedPayload { what: "total_discount", reason: error.to_string() }
    })?;
    Ok((line_items, total_discount))
}
