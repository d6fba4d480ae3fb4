//! Record sanitization
//!
//! Everything that reaches the store passes through here first: an arbitrary
//! merged JSON object is projected onto the public schema for its entity
//! kind, with raw source metadata dropped and logo URLs rewritten into a
//! stable form. Sanitization is a pure projection and idempotent, so the
//! remote-sync stage can re-run it over stored bytes to compute comparison
//! digests.

use crate::error::{Error, Result};
use crate::registry::record::{EntityKind, RiskFactor, SpenderRecord, TokenRecord};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

const USDT_LOGO: &str = "https://raw.githubusercontent.com/Uniswap/assets/master/blockchains/ethereum/assets/0xdAC17F958D2ee523a2206206994597C13D831ec7/logo.png";
const WETH_LOGO: &str = "https://raw.githubusercontent.com/Uniswap/assets/master/blockchains/ethereum/assets/0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2/logo.png";

/// Trusted logo URLs for symbols whose source-supplied logos are routinely
/// broken or inconsistent across providers. Matches are exact.
fn logo_override(symbol: &str) -> Option<&'static str> {
    match symbol {
        "USDT" | "USDTE" => Some(USDT_LOGO),
        "WETH" => Some(WETH_LOGO),
        _ => None,
    }
}

/// Numeric cache-buster query strings (`logo.png?1696501628`) churn between
/// runs and would cause spurious remote diffs. Real query parameters such as
/// the `?w=32` thumbnail size are left alone.
fn cache_buster() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\.(?:png|jpg))\?\d+$").expect("pattern is a valid regex"))
}

/// Rewrite a logo URL into its stored form.
///
/// Applied in order, each step a no-op when its pattern is absent: large
/// CoinGecko thumbnails become small ones, oversized width parameters are
/// shrunk, `ipfs://` URIs are routed through a public HTTPS gateway, and
/// trailing cache-busters are stripped.
pub fn rewrite_logo_uri(uri: &str) -> String {
    let uri = uri.replacen("/thumb/", "/small/", 1);
    let uri = uri.replacen("w=500", "w=32", 1);
    let uri = uri.replacen("ipfs://", "https://ipfs.io/ipfs/", 1);
    cache_buster().replace(&uri, "$1").into_owned()
}

/// Project a raw record onto the public schema for `kind`.
pub fn sanitize(kind: EntityKind, record: &Value) -> Result<Value> {
    let clean = match kind {
        EntityKind::Tokens => serde_json::to_value(sanitize_token(record)?),
        EntityKind::Spenders => serde_json::to_value(sanitize_spender(record)?),
    };
    Ok(clean?)
}

/// Canonical stored bytes for a record: sanitized, compact JSON, sorted
/// keys. Both the write path and the remote-sync diff use this, so local
/// and remote bytes are comparable.
pub fn canonical_bytes(kind: EntityKind, record: &Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&sanitize(kind, record)?)?)
}

/// Project a raw token record onto `{symbol, decimals, logoURI, isSpam}`.
///
/// Missing or mis-typed fields are treated as absent; the symbol override
/// table beats any supplied logo. Fails only when `record` is not an object.
pub fn sanitize_token(record: &Value) -> Result<TokenRecord> {
    let fields = object_fields(record)?;

    let symbol = string_field(fields, "symbol");
    let decimals = fields
        .get("decimals")
        .and_then(Value::as_u64)
        .and_then(|d| u32::try_from(d).ok());
    let supplied = string_field(fields, "logoURI").map(|uri| rewrite_logo_uri(&uri));
    let logo_uri = symbol
        .as_deref()
        .and_then(logo_override)
        .map(str::to_string)
        .or(supplied);
    let is_spam = fields.get("isSpam").and_then(Value::as_bool);

    Ok(TokenRecord {
        symbol,
        decimals,
        logo_uri,
        is_spam,
    })
}

/// Project a raw spender record onto `{name, label, riskFactors}`.
pub fn sanitize_spender(record: &Value) -> Result<SpenderRecord> {
    let fields = object_fields(record)?;

    let risk_factors = fields
        .get("riskFactors")
        .and_then(Value::as_array)
        .map(|factors| factors.iter().filter_map(parse_risk_factor).collect());

    Ok(SpenderRecord {
        name: string_field(fields, "name"),
        label: string_field(fields, "label"),
        risk_factors,
    })
}

fn parse_risk_factor(value: &Value) -> Option<RiskFactor> {
    let fields = value.as_object()?;
    Some(RiskFactor {
        kind: fields.get("type").and_then(Value::as_str)?.to_string(),
        source: fields.get("source").and_then(Value::as_str)?.to_string(),
        data: fields.get("data").and_then(Value::as_str).map(str::to_string),
    })
}

fn object_fields(record: &Value) -> Result<&Map<String, Value>> {
    record.as_object().ok_or_else(|| {
        Error::Schema(format!(
            "record must be a JSON object, got {}",
            value_kind(record)
        ))
    })
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields.get(name).and_then(Value::as_str).map(str::to_string)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
