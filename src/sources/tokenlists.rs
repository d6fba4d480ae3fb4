//! Community token list aggregate.
//!
//! Pulls a fixed set of published token lists, flattens them into one
//! pool, and serves per-chain slices of that pool. Lists are fetched
//! once per run; a list that cannot be fetched is skipped with a warning
//! rather than sinking the whole aggregate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::Result;
use crate::registry::{is_address, normalize_identifier};
use crate::sources::{http_client, TokenMapping, TokenSource};

/// One published token list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenListRef {
    /// Full URL, or a GitHub path starting with `/` that is resolved
    /// against `raw.githubusercontent.com`.
    pub url: String,
    /// Chain to file every entry under, for lists that omit or misuse
    /// the per-token `chainId` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

impl TokenListRef {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            chain_id: None,
        }
    }

    pub fn pinned(url: &str, chain_id: u64) -> Self {
        Self {
            url: url.to_string(),
            chain_id: Some(chain_id),
        }
    }
}

/// The lists aggregated by default. Single-chain lists that predate the
/// token list schema get their chain pinned here.
pub fn default_token_lists() -> Vec<TokenListRef> {
    vec![
        TokenListRef::pinned("/map3xyz/wanchain-tokenlist/master/tokenlist.json", 888),
        TokenListRef::pinned("/kardiachain/token-assets/master/tokens/mobile-list.json", 24),
        TokenListRef::pinned(
            "/yodedex/yodeswap-default-tokenlist/696cafc9a9cba70e6617ec3439cd7ef76d2052dd/yodeswap.tokenlist.json",
            2000,
        ),
        TokenListRef::new("/CoinTool-App/cdn/d5f27f04269a0ccc1d9252510ed699b80744f3c8/json/dogechain.json"),
        TokenListRef::new("/CoinTool-App/cdn/d5f27f04269a0ccc1d9252510ed699b80744f3c8/json/heco.json"),
        TokenListRef::new("/CoinTool-App/cdn/d5f27f04269a0ccc1d9252510ed699b80744f3c8/json/movr.json"),
        TokenListRef::new("/CoinTool-App/cdn/d5f27f04269a0ccc1d9252510ed699b80744f3c8/json/onus.json"),
        TokenListRef::new("/BeamSwap/exosama-tokenlist/main/tokenlist.json"),
        TokenListRef::new("https://unpkg.com/@1hive/default-token-list@5.17.1/build/honeyswap-default.tokenlist.json"),
        TokenListRef::new("https://unpkg.com/quickswap-default-token-list@1.0.91/build/quickswap-default.tokenlist.json"),
        TokenListRef::new("/Ubeswap/default-token-list/master/ubeswap.token-list.json"),
        TokenListRef::new("/DefiKingdoms/community-token-list/main/src/defikingdoms-default.tokenlist.json"),
        TokenListRef::new(
            "/syscoin/syscoin-rollux.github.io/c7a99fa23f7d51b6afc3f2683e999b3e51532c22/rollux.tokenlist.json",
        ),
        TokenListRef::new(
            "/nahmii-community/bridge/4ae719bcac44377952f6a18710d619821d772459/src/nahmii.tokenlist.json",
        ),
        TokenListRef::new(
            "/etherspot/etherspot-popular-tokens-tokenlist/ceb93ecae050b100069d912339307c8acf63153a/multichain.tokenlist.json",
        ),
        TokenListRef::new("/elkfinance/tokens/c205c0d68a8a2d0052c17207d5440ac934b150fa/all.tokenlist.json"),
        TokenListRef::new("https://raw.githubusercontent.com/viaprotocol/tokenlists/main/all_tokens/all.json"),
        TokenListRef::new("/pangolindex/tokenlists/main/pangolin.tokenlist.json"),
        TokenListRef::new("https://static.optimism.io/optimism.tokenlist.json"),
        TokenListRef::new("https://tokens.uniswap.org"),
    ]
}

/// Token source backed by the union of all configured lists.
pub struct TokenListAggregate {
    client: reqwest::Client,
    lists: Vec<TokenListRef>,
    fetched: OnceCell<Vec<Value>>,
}

impl TokenListAggregate {
    pub fn new(lists: Vec<TokenListRef>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            lists,
            fetched: OnceCell::new(),
        })
    }

    /// All list entries, fetched on first use and reused for every chain.
    async fn entries(&self) -> &[Value] {
        self.fetched
            .get_or_init(|| async {
                let mut all = Vec::new();
                for list in &self.lists {
                    match fetch_list(&self.client, list).await {
                        Ok(mut entries) => {
                            debug!(url = %list.url, count = entries.len(), "fetched token list");
                            all.append(&mut entries);
                        }
                        Err(e) => {
                            warn!(url = %list.url, error = %e, "skipping unreachable token list");
                        }
                    }
                }
                all
            })
            .await
    }
}

#[async_trait]
impl TokenSource for TokenListAggregate {
    fn name(&self) -> &'static str {
        "tokenlists"
    }

    async fn tokens_for_chain(&self, chain_id: u64) -> Result<Option<TokenMapping>> {
        let mut mapping = TokenMapping::new();
        for entry in self.entries().await {
            let Some(fields) = entry.as_object() else {
                continue;
            };
            if fields.get("chainId").and_then(Value::as_u64) != Some(chain_id) {
                continue;
            }
            let Some(address) = fields.get("address").and_then(Value::as_str) else {
                continue;
            };
            if !is_address(address) {
                continue;
            }
            let record = fold_alternate_fields(fields.clone());
            mapping.insert(normalize_identifier(address), Value::Object(record));
        }
        if mapping.is_empty() {
            return Ok(None);
        }
        Ok(Some(mapping))
    }
}

fn resolve_list_url(url: &str) -> String {
    if let Some(path) = url.strip_prefix('/') {
        format!("https://raw.githubusercontent.com/{path}")
    } else {
        url.to_string()
    }
}

async fn fetch_list(client: &reqwest::Client, list: &TokenListRef) -> Result<Vec<Value>> {
    let url = resolve_list_url(&list.url);
    let body: Value = client
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let mut entries = extract_entries(body);
    if let Some(chain_id) = list.chain_id {
        for entry in &mut entries {
            if let Value::Object(fields) = entry {
                fields.insert("chainId".to_string(), Value::from(chain_id));
            }
        }
    }
    Ok(entries)
}

/// Pull the token array out of whichever shape a list uses: the standard
/// `{ "tokens": [...] }` wrapper, a bare array, or a map of per-chain
/// arrays (the viaprotocol export).
fn extract_entries(body: Value) -> Vec<Value> {
    match body {
        Value::Array(entries) => entries,
        Value::Object(mut fields) => match fields.remove("tokens") {
            Some(Value::Array(entries)) => entries,
            _ => fields
                .into_iter()
                .filter_map(|(_, value)| match value {
                    Value::Array(entries) => Some(entries),
                    _ => None,
                })
                .flatten()
                .collect(),
        },
        _ => Vec::new(),
    }
}

/// Some lists use their own field names. Fold the known alternates into
/// the standard names when the standard field is missing or null.
fn fold_alternate_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    const ALTERNATES: [(&str, &str); 3] = [
        ("symbol", "tokenSymbol"),
        ("decimals", "decimal"),
        ("logoURI", "logo"),
    ];
    for (canonical, alternate) in ALTERNATES {
        if fields.get(canonical).map_or(true, Value::is_null) {
            if let Some(value) = fields.get(alternate).cloned() {
                fields.insert(canonical.to_string(), value);
            }
        }
    }
    fields
}
