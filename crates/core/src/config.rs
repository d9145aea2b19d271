use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::boundary::BoundaryDefaults;
use crate::domain::bundle::{DEFAULT_MAX_ITEMS, DEFAULT_MIN_ITEMS};

pub const MAX_MONEY_SCALE: u32 = 6;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub default_min_items: u32,
    pub default_max_items: u32,
    pub money_scale: u32,
    pub currency: String,
}

impl EngineConfig {
    pub fn boundary_defaults(&self) -> BoundaryDefaults {
        BoundaryDefaults { min_items: self.default_min_items, max_items: self.default_max_items }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub money_scale: Option<u32>,
    pub currency: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig {
                default_min_items: DEFAULT_MIN_ITEMS,
                default_max_items: DEFAULT_MAX_ITEMS,
                money_scale: 2,
                currency: "USD".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("bundlekit.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(engine) = patch.engine {
            if let Some(default_min_items) = engine.default_min_items {
                self.engine.default_min_items = default_min_items;
            }
            if let Some(default_max_items) = engine.default_max_items {
                self.engine.default_max_items = default_max_items;
            }
            if let Some(money_scale) = engine.money_scale {
                self.engine.money_scale = money_scale;
            }
            if let Some(currency) = engine.currency {
                self.engine.currency = currency;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BUNDLEKIT_ENGINE_DEFAULT_MIN_ITEMS") {
            self.engine.default_min_items =
                parse_u32("BUNDLEKIT_ENGINE_DEFAULT_MIN_ITEMS", &value)?;
        }
        if let Some(value) = read_env("BUNDLEKIT_ENGINE_DEFAULT_MAX_ITEMS") {
            self.engine.default_max_items =
                parse_u32("BUNDLEKIT_ENGINE_DEFAULT_MAX_ITEMS", &value)?;
        }
        if let Some(value) = read_env("BUNDLEKIT_ENGINE_MONEY_SCALE") {
            self.engine.money_scale = parse_u32("BUNDLEKIT_ENGINE_MONEY_SCALE", &value)?;
        }
        if let Some(value) = read_env("BUNDLEKIT_ENGINE_CURRENCY") {
            self.engine.currency = value;
        }

        let log_level =
            read_env("BUNDLEKIT_LOGGING_LEVEL").or_else(|| read_env("BUNDLEKIT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BUNDLEKIT_LOGGING_FORMAT").or_else(|| read_env("BUNDLEKIT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(money_scale) = overrides.money_scale {
            self.engine.money_scale = money_scale;
        }
        if let Some(currency) = overrides.currency {
            self.engine.currency = currency;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_engine(&self.engine)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("bundlekit.toml"), PathBuf::from("config/bundlekit.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_engine(engine: &EngineConfig) -> Result<(), ConfigError> {
    if engine.default_max_items == 0 {
        return Err(ConfigError::Validation(
            "engine.default_max_items must be greater than zero".to_string(),
        ));
    }

    if engine.default_min_items > engine.default_max_items {
        return Err(ConfigError::Validation(format!(
            "engine.default_min_items ({}) must not exceed engine.default_max_items ({})",
            engine.default_min_items, engine.default_max_items
        )));
    }

    if engine.money_scale > MAX_MONEY_SCALE {
        return Err(ConfigError::Validation(format!(
            "engine.money_scale must be in range 0..={MAX_MONEY_SCALE}"
        )));
    }

    let currency = engine.currency.trim();
    if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(
            "engine.currency must be a three-letter uppercase ISO code (for example `USD`)"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    engine: Option<EnginePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct EnginePatch {
    default_min_items: Option<u32>,
    default_max_items: Option<u32>,
    money_scale: Option<u32>,
    currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const ENGINE_VARS: [&str; 8] = [
        "BUNDLEKIT_ENGINE_DEFAULT_MIN_ITEMS",
        "BUNDLEKIT_ENGINE_DEFAULT_MAX_ITEMS",
        "BUNDLEKIT_ENGINE_MONEY_SCALE",
        "BUNDLEKIT_ENGINE_CURRENCY",
        "BUNDLEKIT_LOGGING_LEVEL",
        "BUNDLEKIT_LOG_LEVEL",
        "BUNDLEKIT_LOGGING_FORMAT",
        "BUNDLEKIT_LOG_FORMAT",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid_without_any_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&ENGINE_VARS);

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let config = AppConfig::load(LoadOptions {
            config_path: Some(dir.path().join("absent.toml")),
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config == AppConfig::default(), "missing optional file should yield defaults")?;
        ensure(config.engine.default_min_items == 1, "default min items should be 1")?;
        ensure(config.engine.default_max_items == 10, "default max items should be 10")?;
        ensure(config.engine.money_scale == 2, "default money scale should be 2")
    }

    #[test]
    fn required_file_must_exist() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("bundlekit.toml");

        let result = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "missing required file should be reported",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&ENGINE_VARS);
        env::set_var("TEST_BUNDLE_CURRENCY", "EUR");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("bundlekit.toml");
            fs::write(
                &path,
                r#"
[engine]
currency = "${TEST_BUNDLE_CURRENCY}"
default_max_items = 6
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.engine.currency == "EUR", "currency should be interpolated from env")?;
            ensure(config.engine.default_max_items == 6, "file should set default max items")?;
            Ok(())
        })();

        clear_vars(&["TEST_BUNDLE_CURRENCY"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&["TEST_BUNDLE_UNSET"]);

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("bundlekit.toml");
        fs::write(&path, "[engine]\ncurrency = \"${TEST_BUNDLE_UNSET}\"\n")
            .map_err(|err| err.to_string())?;

        let result =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() });
        ensure(
            matches!(
                result,
                Err(ConfigError::MissingEnvInterpolation { ref var }) if var == "TEST_BUNDLE_UNSET"
            ),
            "unset interpolation variable should be named in the error",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&ENGINE_VARS);
        env::set_var("BUNDLEKIT_LOG_LEVEL", "warn");
        env::set_var("BUNDLEKIT_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["BUNDLEKIT_LOG_LEVEL", "BUNDLEKIT_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&ENGINE_VARS);
        env::set_var("BUNDLEKIT_ENGINE_MONEY_SCALE", "4");
        env::set_var("BUNDLEKIT_ENGINE_DEFAULT_MIN_ITEMS", "2");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("bundlekit.toml");
            fs::write(
                &path,
                r#"
[engine]
default_min_items = 3
money_scale = 3
currency = "GBP"

[logging]
level = "warn"
format = "json"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    currency: Some("CAD".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.engine.money_scale == 4, "env money scale should win over file")?;
            ensure(config.engine.default_min_items == 2, "env min items should win over file")?;
            ensure(config.engine.currency == "CAD", "override currency should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.logging.format == LogFormat::Json, "file log format should survive")?;
            Ok(())
        })();

        clear_vars(&ENGINE_VARS);
        result
    }

    #[test]
    fn invalid_env_override_names_the_variable() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&ENGINE_VARS);
        env::set_var("BUNDLEKIT_ENGINE_DEFAULT_MAX_ITEMS", "many");

        let result = AppConfig::load(LoadOptions::default());
        clear_vars(&ENGINE_VARS);

        ensure(
            matches!(
                result,
                Err(ConfigError::InvalidEnvOverride { ref key, .. })
                    if key == "BUNDLEKIT_ENGINE_DEFAULT_MAX_ITEMS"
            ),
            "non-numeric max items should be rejected",
        )
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&ENGINE_VARS);

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides { money_scale: Some(9), ..ConfigOverrides::default() },
            ..LoadOptions::default()
        }) {
            Ok(_) => {
                return Err("expected validation failure but config load succeeded".to_string())
            }
            Err(error) => error,
        };

        let message = error.to_string();
        ensure(message.contains("engine.money_scale"), "validation error should name the key")?;

        let mut inverted = AppConfig::default();
        inverted.engine.default_min_items = 12;
        ensure(inverted.validate().is_err(), "min above max should be rejected")?;

        let mut lowercase = AppConfig::default();
        lowercase.engine.currency = "usd".to_string();
        ensure(lowercase.validate().is_err(), "currency must be an uppercase ISO code")
    }
}
