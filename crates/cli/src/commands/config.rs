use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use bundlekit_core::config::{AppConfig, LoadOptions};
use serde::Serialize;
use serde_json::{json, Value};

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: Value,
    source: String,
}

pub fn run(options: LoadOptions) -> CommandResult {
    let config_path = options.config_path.clone().or_else(detect_config_path);
    let overrides = options.overrides.clone();
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let config_file_doc = load_config_file_doc(config_path.as_deref());
    let source = |key_path: &str, overridden: bool, env_keys: &[&str]| {
        if overridden {
            return "override".to_string();
        }
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_path.as_deref())
    };
    let entry =
        |key: &'static str, value: Value, source: String| ConfigEntry { key, value, source };

    let entries = vec![
        entry(
            "engine.default_min_items",
            json!(config.engine.default_min_items),
            source("engine.default_min_items", false, &["BUNDLEKIT_ENGINE_DEFAULT_MIN_ITEMS"]),
        ),
        entry(
            "engine.default_max_items",
            json!(config.engine.default_max_items),
            source("engine.default_max_items", false, &["BUNDLEKIT_ENGINE_DEFAULT_MAX_ITEMS"]),
        ),
        entry(
            "engine.money_scale",
            json!(config.engine.money_scale),
            source(
                "engine.money_scale",
                overrides.money_scale.is_some(),
                &["BUNDLEKIT_ENGINE_MONEY_SCALE"],
            ),
        ),
        entry(
            "engine.currency",
            json!(config.engine.currency),
            source(
                "engine.currency",
                overrides.currency.is_some(),
                &["BUNDLEKIT_ENGINE_CURRENCY"],
            ),
        ),
        entry(
            "logging.level",
            json!(config.logging.level),
            source(
                "logging.level",
                overrides.log_level.is_some(),
                &["BUNDLEKIT_LOGGING_LEVEL", "BUNDLEKIT_LOG_LEVEL"],
            ),
        ),
        entry(
            "logging.format",
            json!(config.logging.format),
            source(
                "logging.format",
                overrides.log_format.is_some(),
                &["BUNDLEKIT_LOGGING_FORMAT", "BUNDLEKIT_LOG_FORMAT"],
            ),
        ),
    ];

    CommandResult::report(
        "config",
        "effective config (source precedence: override > env > file > default)",
        &entries,
    )
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("bundlekit.toml"), PathBuf::from("config/bundlekit.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<toml::Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<toml::Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&toml::Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &toml::Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
