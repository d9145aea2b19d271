//! Resolution of loosely-typed storefront payloads into typed records.
//!
//! Template meta and request bodies arrive as JSON where numbers may be
//! strings, booleans may be `"yes"`/`"no"` and whole sections may be missing
//! or empty. Everything is normalized here, once; the engines only ever see
//! the typed [`BundleConfig`], [`Selection`] and [`ProductSnapshot`] values.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::domain::bundle::{
    BundleConfig, BundleId, BundleRules, BundleType, DiscountTier, DisplaySettings, Layout,
    PricingPolicy, PricingType, TierDiscount, DEFAULT_MAX_ITEMS, DEFAULT_MIN_ITEMS,
};
use crate::domain::cart::{BundleGroupKey, CartLine, LineItem};
use crate::domain::product::{CategoryId, ProductId, ProductSnapshot};
use crate::domain::selection::Selection;
use crate::errors::DomainError;

/// Fallback item limits for templates that never stored their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundaryDefaults {
    pub min_items: u32,
    pub max_items: u32,
}

impl Default for BoundaryDefaults {
    fn default() -> Self {
        Self { min_items: DEFAULT_MIN_ITEMS, max_items: DEFAULT_MAX_ITEMS }
    }
}

pub fn resolve_bundle_config(
    value: &Value,
    defaults: &BoundaryDefaults,
) -> Result<BundleConfig, DomainError> {
    let root = as_object(value, "bundle config")?;
    let id = root.get("id").and_then(loose_string).ok_or_else(|| DomainError::MalformedPayload {
        what: "bundle config",
        reason: "missing id".to_string(),
    })?;

    let bundle_type = keyword(
        "bundle_type",
        root.get("bundle_type").or_else(|| root.get("type")),
        &[
            ("fixed", BundleType::Fixed),
            ("flexible", BundleType::Flexible),
            ("mixed", BundleType::Mixed),
        ],
        BundleType::default(),
    )?;

    Ok(BundleConfig {
        id: BundleId(id),
        title: root.get("title").and_then(loose_string).unwrap_or_default(),
        bundle_type,
        rules: resolve_rules(section(root, "rules"), defaults),
        pricing: resolve_pricing(section(root, "pricing"))?,
        display_settings: resolve_display_settings(section(root, "display_settings"))?,
    })
}

fn resolve_rules(rules: Option<&Map<String, Value>>, defaults: &BoundaryDefaults) -> BundleRules {
    let field = |key: &str| rules.and_then(|rules| rules.get(key));

    BundleRules {
        min_items: field("min_items").and_then(loose_u32).unwrap_or(defaults.min_items),
        max_items: field("max_items").and_then(loose_u32).unwrap_or(defaults.max_items),
        allow_duplicates: field("allow_duplicates").and_then(loose_bool).unwrap_or(false),
        required_categories: string_list(field("required_categories"))
            .into_iter()
            .map(CategoryId)
            .collect(),
        excluded_products: string_list(field("excluded_products"))
            .into_iter()
            .map(ProductId)
            .collect(),
    }
}

fn resolve_pricing(pricing: Option<&Map<String, Value>>) -> Result<PricingPolicy, DomainError> {
    let Some(pricing) = pricing else {
        return Ok(PricingPolicy::default());
    };

    let pricing_type = keyword(
        "pricing.type",
        pricing.get("type"),
        &[
            ("percentage", PricingType::Percentage),
            ("fixed", PricingType::Fixed),
            ("tiered", PricingType::Tiered),
        ],
        PricingType::default(),
    )?;

    let mut tiered_rules = Vec::new();
    if let Some(Value::Array(rows)) = pricing.get("tiered_rules") {
        for row in rows.iter().filter_map(Value::as_object) {
            if let Some(tier) = resolve_tier(row)? {
                tiered_rules.push(tier);
            }
        }
    }

    Ok(PricingPolicy {
        pricing_type,
        discount_value: pricing.get("discount_value").and_then(loose_decimal).unwrap_or_default(),
        tiered_rules,
    })
}

/// Rows missing a usable `qty` or `discount` are dropped rather than rejected.
/// A tier without an explicit `kind` is a percentage tier.
fn resolve_tier(row: &Map<String, Value>) -> Result<Option<DiscountTier>, DomainError> {
    #[derive(Clone, Copy)]
    enum Kind {
        Percentage,
        Fixed,
    }

    let kind = keyword(
        "tiered_rules.kind",
        row.get("kind"),
        &[("percentage", Kind::Percentage), ("fixed", Kind::Fixed)],
        Kind::Percentage,
    )?;
    let (Some(qty), Some(value)) =
        (row.get("qty").and_then(loose_u32), row.get("discount").and_then(loose_decimal))
    else {
        return Ok(None);
    };

    let discount = match kind {
        Kind::Percentage => TierDiscount::Percentage(value),
        Kind::Fixed => TierDiscount::Fixed(value),
    };
    Ok(Some(DiscountTier { qty, discount }))
}

fn resolve_display_settings(
    settings: Option<&Map<String, Value>>,
) -> Result<DisplaySettings, DomainError> {
    let defaults = DisplaySettings::default();
    let Some(settings) = settings else {
        return Ok(defaults);
    };

    Ok(DisplaySettings {
        show_individual_prices: settings
            .get("show_individual_prices")
            .and_then(loose_bool)
            .unwrap_or(defaults.show_individual_prices),
        show_savings: settings
            .get("show_savings")
            .and_then(loose_bool)
            .unwrap_or(defaults.show_savings),
        layout: keyword(
            "display_settings.layout",
            settings.get("layout"),
            &[("grid", Layout::Grid), ("list", Layout::List)],
            defaults.layout,
        )?,
    })
}

/// Accepts `{"product": qty, ...}` or `[{"product_id": .., "quantity": ..}, ...]`.
/// Entries with a non-positive or unreadable quantity are dropped.
pub fn resolve_selection(value: &Value) -> Result<Selection, DomainError> {
    let mut selection = Selection::new();
    match value {
        Value::Object(entries) => {
            for (product_id, quantity) in entries {
                if let Some(quantity) = positive_quantity(quantity) {
                    selection.insert(ProductId(product_id.clone()), quantity);
                }
            }
        }
        Value::Array(rows) => {
            for row in rows.iter().filter_map(Value::as_object) {
                let product_id =
                    row.get("product_id").or_else(|| row.get("id")).and_then(loose_string);
                let quantity =
                    row.get("quantity").or_else(|| row.get("qty")).and_then(positive_quantity);
                if let (Some(product_id), Some(quantity)) = (product_id, quantity) {
                    selection.insert(ProductId(product_id), quantity);
                }
            }
        }
        Value::Null => {}
        other => {
            return Err(DomainError::MalformedPayload {
                what: "selection",
                reason: format!("expected an object or array, found {}", kind_of(other)),
            })
        }
    }
    Ok(selection)
}

pub fn resolve_products(value: &Value) -> Result<Vec<ProductSnapshot>, DomainError> {
    let rows = as_array(value, "products")?;
    let mut products = Vec::with_capacity(rows.len());
    for row in rows {
        let row = as_object(row, "products")?;
        let id = row.get("id").and_then(loose_string).ok_or_else(|| DomainError::MalformedPayload {
            what: "products",
            reason: "product without id".to_string(),
        })?;

        let managed = row.get("manage_stock").and_then(loose_bool).unwrap_or(true);
        let stock_quantity = row
            .get("stock_quantity")
            .and_then(loose_i64)
            .filter(|_| managed)
            .map(|quantity| u32::try_from(quantity.max(0)).unwrap_or(u32::MAX));

        products.push(ProductSnapshot {
            id: ProductId(id),
            name: row.get("name").and_then(loose_string).unwrap_or_default(),
            price: row.get("price").and_then(loose_decimal).unwrap_or_default(),
            categories: string_list(row.get("categories")).into_iter().map(CategoryId).collect(),
            in_stock: row
                .get("in_stock")
                .or_else(|| row.get("stock_status"))
                .and_then(stock_flag)
                .unwrap_or(true),
            stock_quantity,
        });
    }
    Ok(products)
}

/// Line items with a zero quantity cannot carry a discount and are dropped.
pub fn resolve_line_items(value: &Value) -> Result<Vec<LineItem>, DomainError> {
    let rows = as_array(value, "line items")?;
    Ok(rows.iter().filter_map(Value::as_object).filter_map(line_item).collect())
}

pub fn resolve_cart_lines(value: &Value) -> Result<Vec<CartLine>, DomainError> {
    let rows = as_array(value, "cart lines")?;
    let mut lines = Vec::with_capacity(rows.len());
    for row in rows.iter().filter_map(Value::as_object) {
        let fields = (
            row.get("line_key").and_then(loose_string),
            row.get("bundle_id").and_then(loose_string),
            row.get("group_key").and_then(loose_string),
            line_item(row),
        );
        let (Some(line_key), Some(bundle_id), Some(group_key), Some(item)) = fields else {
            return Err(DomainError::MalformedPayload {
                what: "cart lines",
                reason: "each line needs line_key, bundle_id, group_key, product_id \
                         and a positive quantity"
                    .to_string(),
            });
        };
        lines.push(CartLine {
            line_key,
            bundle_id: BundleId(bundle_id),
            group_key: BundleGroupKey(group_key),
            item,
        });
    }
    Ok(lines)
}

fn line_item(row: &Map<String, Value>) -> Option<LineItem> {
    Some(LineItem {
        product_id: ProductId(row.get("product_id").and_then(loose_string)?),
        quantity: row.get("quantity").and_then(positive_quantity)?,
        unit_price: row.get("unit_price").and_then(loose_decimal).unwrap_or_default(),
    })
}

fn as_object<'a>(
    value: &'a Value,
    what: &'static str,
) -> Result<&'a Map<String, Value>, DomainError> {
    value.as_object().ok_or_else(|| DomainError::MalformedPayload {
        what,
        reason: format!("expected an object, found {}", kind_of(value)),
    })
}

fn as_array<'a>(value: &'a Value, what: &'static str) -> Result<&'a Vec<Value>, DomainError> {
    value.as_array().ok_or_else(|| DomainError::MalformedPayload {
        what,
        reason: format!("expected an array, found {}", kind_of(value)),
    })
}

/// Stored meta for an unset section is often `""` or `[]`; both read as absent.
fn section<'a>(root: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    root.get(key).and_then(Value::as_object)
}

fn keyword<T: Copy>(
    field: &'static str,
    value: Option<&Value>,
    table: &[(&str, T)],
    default: T,
) -> Result<T, DomainError> {
    let Some(raw) = value.and_then(loose_string) else {
        return Ok(default);
    };
    let normalized = raw.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return Ok(default);
    }
    table
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, parsed)| *parsed)
        .ok_or(DomainError::InvalidBundleConfig { field, value: raw })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn loose_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(loose_string).collect(),
        Some(Value::String(text)) => text
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn loose_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|n| n.is_finite()).map(|n| n.trunc() as i64)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>().ok().or_else(|| {
                text.parse::<f64>().ok().filter(|n| n.is_finite()).map(|n| n.trunc() as i64)
            })
        }
        _ => None,
    }
}

fn loose_u32(value: &Value) -> Option<u32> {
    loose_i64(value).and_then(|number| u32::try_from(number).ok())
}

fn positive_quantity(value: &Value) -> Option<u32> {
    loose_u32(value).filter(|quantity| *quantity > 0)
}

fn loose_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_i64().map(|n| n != 0),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "1" | "on" => Some(true),
            "no" | "false" | "0" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn stock_flag(value: &Value) -> Option<bool> {
    match value {
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "instock" | "onbackorder" => Some(true),
            "outofstock" => Some(false),
            _ => loose_bool(value),
        },
        other => loose_bool(other),
    }
}

/// Numbers or numeric strings; a trailing `%` is tolerated and ignored.
fn loose_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().trim_end_matches('%').trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text).ok().or_else(|| Decimal::from_scientific(&text).ok())
}
