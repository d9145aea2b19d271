pub mod allocate;
pub mod cart;
pub mod config;
pub mod evaluate;
pub mod preview;
pub mod price;
pub mod validate;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use bundlekit_core::boundary::{resolve_bundle_config, resolve_products, resolve_selection};
use bundlekit_core::config::{AppConfig, LoadOptions};
use bundlekit_core::domain::bundle::BundleConfig;
use bundlekit_core::domain::selection::Selection;
use bundlekit_core::engine::catalog::InMemoryCatalog;
use bundlekit_core::errors::{ApplicationError, DomainError};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    /// Success carrying a structured result under `data`.
    pub fn report(command: &str, message: impl Into<String>, data: &impl Serialize) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(error) => {
                return Self::failure(command, "serialization", error.to_string(), 5);
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: Some(data),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\
             \"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Loaded config and parsed request body shared by every request-driven command.
pub(crate) struct RequestContext {
    pub config: AppConfig,
    pub body: Value,
    pub correlation_id: String,
}

pub(crate) fn prepare(
    command: &'static str,
    request_path: &Path,
    options: LoadOptions,
) -> Result<RequestContext, CommandResult> {
    let config = AppConfig::load(options).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })?;

    let body = read_request(request_path)
        .map_err(|error| CommandResult::failure(command, "request_io", format!("{error:#}"), 3))?;

    let correlation_id = body
        .get("correlation_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| "cli".to_string());

    Ok(RequestContext { config, body, correlation_id })
}

fn read_request(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read request file `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("request file `{}` is not valid JSON", path.display()))
}

pub(crate) fn bad_request(
    command: &'static str,
    correlation_id: &str,
    error: impl Into<ApplicationError>,
) -> CommandResult {
    let interface = error.into().into_interface(correlation_id);
    info!(
        event_name = "cli.command.rejected",
        command,
        correlation_id,
        error_class = interface.error_class(),
        "bundle request rejected"
    );
    CommandResult::failure(
        command,
        interface.error_class(),
        format!("{} ({interface})", interface.user_message()),
        4,
    )
}

pub(crate) fn field<'a>(body: &'a Value, key: &'static str) -> Result<&'a Value, DomainError> {
    body.get(key).ok_or_else(|| DomainError::MalformedPayload {
        what: "request",
        reason: format!("missing `{key}`"),
    })
}

/// The template, catalog and shopper selection behind one bundle request.
pub(crate) struct BundleRequest {
    pub bundle: BundleConfig,
    pub catalog: InMemoryCatalog,
    pub selection: Selection,
}

impl BundleRequest {
    pub(crate) fn resolve(context: &RequestContext) -> Result<Self, DomainError> {
        let defaults = context.config.engine.boundary_defaults();
        Ok(Self {
            bundle: resolve_bundle_config(field(&context.body, "bundle")?, &defaults)?,
            catalog: InMemoryCatalog::new(resolve_products(field(&context.body, "products")?)?),
            selection: resolve_selection(context.body.get("selection").unwrap_or(&Value::Null))?,
        })
    }
}

pub(crate) fn completed(command: &'static str, context: &RequestContext, bundle_id: &str) {
    info!(
        event_name = "cli.command.completed",
        command,
        correlation_id = %context.correlation_id,
        bundle_id,
        "bundle request processed"
    );
}
