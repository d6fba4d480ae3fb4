//! Chainbook configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::registry::RetryPolicy;
use crate::sources::{default_token_lists, AlchemyNetwork, TokenListRef};

/// Main chainbook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainbookConfig {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Chains the registry covers
    #[serde(default = "default_chains")]
    pub chains: Vec<ChainEntry>,

    /// Upstream source configuration
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Universal spender configuration
    #[serde(default)]
    pub universal: UniversalConfig,

    /// Remote object store configuration
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Local write retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ChainbookConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            chains: default_chains(),
            sources: SourcesConfig::default(),
            universal: UniversalConfig::default(),
            remote: RemoteConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl ChainbookConfig {
    /// Load configuration from a TOML file. Missing sections fall back
    /// to their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.chains.is_empty() {
            return Err(Error::Config("chain list is empty".to_string()));
        }
        let mut ids: Vec<u64> = self.chains.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.chains.len() {
            return Err(Error::Config("chain list contains duplicate ids".to_string()));
        }
        let mut slugs: Vec<&str> = self
            .chains
            .iter()
            .filter_map(|c| c.slug.as_deref())
            .collect();
        slugs.sort_unstable();
        slugs.dedup();
        let slug_count = self.chains.iter().filter(|c| c.slug.is_some()).count();
        if slugs.len() != slug_count {
            return Err(Error::Config(
                "chain list contains duplicate slugs".to_string(),
            ));
        }
        if self.sources.chain_concurrency == 0 {
            return Err(Error::Config("chain_concurrency must be at least 1".to_string()));
        }
        if self.remote.concurrency == 0 {
            return Err(Error::Config(
                "remote concurrency must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        self.chains.iter().map(|c| c.id).collect()
    }

    pub fn chain_name(&self, chain_id: u64) -> Option<&str> {
        self.chains
            .iter()
            .find(|c| c.id == chain_id)
            .map(|c| c.name.as_str())
    }

    pub fn chain_by_slug(&self, slug: &str) -> Option<&ChainEntry> {
        self.chains
            .iter()
            .find(|c| c.slug.as_deref() == Some(slug))
    }
}

/// One supported chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainEntry {
    /// Chain id
    pub id: u64,

    /// Display name used in logs
    pub name: String,

    /// Router deployment slug, for chains Uniswap deploys to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

fn chain(id: u64, name: &str) -> ChainEntry {
    ChainEntry {
        id,
        name: name.to_string(),
        slug: None,
    }
}

fn chain_with_slug(id: u64, name: &str, slug: &str) -> ChainEntry {
    ChainEntry {
        id,
        name: name.to_string(),
        slug: Some(slug.to_string()),
    }
}

fn default_chains() -> Vec<ChainEntry> {
    vec![
        chain_with_slug(1, "Ethereum", "mainnet"),
        chain_with_slug(5, "Goerli", "goerli"),
        chain_with_slug(10, "OP Mainnet", "optimism"),
        chain(24, "KardiaChain"),
        chain_with_slug(56, "BNB Smart Chain", "bsc"),
        chain(100, "Gnosis"),
        chain(128, "Huobi ECO Chain"),
        chain_with_slug(130, "Unichain", "unichain"),
        chain_with_slug(137, "Polygon", "polygon"),
        chain(250, "Fantom"),
        chain_with_slug(420, "Optimism Goerli", "optimism-goerli"),
        chain_with_slug(480, "World Chain", "worldchain"),
        chain(570, "Rollux"),
        chain(888, "Wanchain"),
        chain(1285, "Moonriver"),
        chain_with_slug(1301, "Unichain Sepolia", "unichain-sepolia"),
        chain_with_slug(1868, "Soneium", "soneium"),
        chain(1975, "ONUS"),
        chain(2000, "Dogechain"),
        chain(2109, "Exosama"),
        chain(5551, "Nahmii"),
        chain_with_slug(8453, "Base", "base"),
        chain_with_slug(42161, "Arbitrum One", "arbitrum"),
        chain_with_slug(42220, "Celo", "celo"),
        chain_with_slug(43114, "Avalanche", "avalanche"),
        chain_with_slug(44787, "Celo Alfajores", "celo-alfajores"),
        chain_with_slug(57073, "Ink", "ink"),
        chain_with_slug(80001, "Mumbai", "polygon-mumbai"),
        chain_with_slug(81457, "Blast", "blast"),
        chain_with_slug(84531, "Base Goerli", "base-goerli"),
        chain_with_slug(84532, "Base Sepolia", "base-sepolia"),
        chain_with_slug(421613, "Arbitrum Goerli", "arbitrum-goerli"),
        chain_with_slug(7777777, "Zora", "zora"),
        chain_with_slug(11155111, "Sepolia", "sepolia"),
        chain_with_slug(11155420, "OP Sepolia", "op-sepolia"),
        chain(1666600000, "Harmony"),
    ]
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the registry data tree
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Upstream source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// How many chains to process concurrently
    #[serde(default = "default_chain_concurrency")]
    pub chain_concurrency: usize,

    /// Token lists to aggregate
    #[serde(default = "default_token_lists")]
    pub token_lists: Vec<TokenListRef>,

    /// CoinGecko settings
    #[serde(default)]
    pub coingecko: CoingeckoConfig,

    /// 1inch settings
    #[serde(default)]
    pub oneinch: OneInchConfig,

    /// Reservoir settings
    #[serde(default)]
    pub reservoir: ReservoirConfig,

    /// Alchemy settings
    #[serde(default)]
    pub alchemy: AlchemyConfig,

    /// ScamSniffer settings
    #[serde(default)]
    pub scamsniffer: ScamSnifferConfig,
}

fn default_chain_concurrency() -> usize {
    4
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            chain_concurrency: default_chain_concurrency(),
            token_lists: default_token_lists(),
            coingecko: CoingeckoConfig::default(),
            oneinch: OneInchConfig::default(),
            reservoir: ReservoirConfig::default(),
            alchemy: AlchemyConfig::default(),
            scamsniffer: ScamSnifferConfig::default(),
        }
    }
}

/// CoinGecko settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoingeckoConfig {
    /// API base URL
    #[serde(default = "default_coingecko_api_url")]
    pub api_url: String,

    /// Host serving per-platform token lists
    #[serde(default = "default_coingecko_tokens_host")]
    pub tokens_host: String,

    /// Minimum spacing between requests in milliseconds
    #[serde(default = "default_coingecko_interval_ms")]
    pub min_interval_ms: u64,
}

fn default_coingecko_api_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_coingecko_tokens_host() -> String {
    "https://tokens.coingecko.com".to_string()
}

fn default_coingecko_interval_ms() -> u64 {
    2_000
}

impl Default for CoingeckoConfig {
    fn default() -> Self {
        Self {
            api_url: default_coingecko_api_url(),
            tokens_host: default_coingecko_tokens_host(),
            min_interval_ms: default_coingecko_interval_ms(),
        }
    }
}

/// 1inch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneInchConfig {
    /// Token API base URL
    #[serde(default = "default_oneinch_api_url")]
    pub api_url: String,

    /// Minimum spacing between requests in milliseconds
    #[serde(default = "default_oneinch_interval_ms")]
    pub min_interval_ms: u64,
}

fn default_oneinch_api_url() -> String {
    "https://tokens.1inch.io/v1.2".to_string()
}

fn default_oneinch_interval_ms() -> u64 {
    1_000
}

impl Default for OneInchConfig {
    fn default() -> Self {
        Self {
            api_url: default_oneinch_api_url(),
            min_interval_ms: default_oneinch_interval_ms(),
        }
    }
}

/// Reservoir settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservoirConfig {
    /// Collections index URL, already carrying sort and page-size params
    #[serde(default = "default_reservoir_api_url")]
    pub api_url: String,

    /// Collections below this all-time volume are dropped
    #[serde(default = "default_volume_floor")]
    pub volume_floor: f64,

    /// Delay between pages in milliseconds
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Chain the collections are filed under
    #[serde(default = "default_reservoir_chain_id")]
    pub chain_id: u64,
}

fn default_reservoir_api_url() -> String {
    "https://api.reservoir.tools/collections/v5?includeTopBid=false&sortBy=allTimeVolume&limit=20"
        .to_string()
}

fn default_volume_floor() -> f64 {
    100.0
}

fn default_page_delay_ms() -> u64 {
    1_000
}

fn default_reservoir_chain_id() -> u64 {
    1
}

impl Default for ReservoirConfig {
    fn default() -> Self {
        Self {
            api_url: default_reservoir_api_url(),
            volume_floor: default_volume_floor(),
            page_delay_ms: default_page_delay_ms(),
            chain_id: default_reservoir_chain_id(),
        }
    }
}

/// Alchemy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlchemyConfig {
    /// API key, usually supplied via ALCHEMY_API_KEY
    #[serde(default)]
    pub api_key: String,

    /// Networks to pull spam contracts for
    #[serde(default = "default_alchemy_networks")]
    pub networks: Vec<AlchemyNetwork>,
}

fn default_alchemy_networks() -> Vec<AlchemyNetwork> {
    vec![
        AlchemyNetwork {
            chain_id: 1,
            network: "eth-mainnet".to_string(),
        },
        AlchemyNetwork {
            chain_id: 137,
            network: "polygon-mainnet".to_string(),
        },
    ]
}

impl Default for AlchemyConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            networks: default_alchemy_networks(),
        }
    }
}

/// ScamSniffer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScamSnifferConfig {
    /// Blocklist endpoint
    #[serde(default = "default_scamsniffer_api_url")]
    pub api_url: String,

    /// API key, usually supplied via SCAMSNIFFER_API_KEY
    #[serde(default)]
    pub api_key: String,

    /// Bucket the blocklist entries are filed under
    #[serde(default = "default_scamsniffer_bucket")]
    pub bucket: String,
}

fn default_scamsniffer_api_url() -> String {
    "https://lookup-api.scamsniffer.io/v1/blocklist/address".to_string()
}

fn default_scamsniffer_bucket() -> String {
    "scamsniffer".to_string()
}

impl Default for ScamSnifferConfig {
    fn default() -> Self {
        Self {
            api_url: default_scamsniffer_api_url(),
            api_key: String::new(),
            bucket: default_scamsniffer_bucket(),
        }
    }
}

/// Universal spender configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UniversalConfig {
    /// Extra delegate contracts to fan out across every chain, on top
    /// of the built-in table
    #[serde(default)]
    pub flagged_delegates: Vec<FlaggedDelegate>,
}

/// A delegate contract present on every chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedDelegate {
    /// Contract address
    pub address: String,

    /// Display name
    pub name: String,

    /// Longer label
    pub label: String,

    /// Risk factor types to attach, recorded with source `manual`
    #[serde(default)]
    pub risk_factors: Vec<String>,
}

/// Remote object store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Bucket name
    #[serde(default)]
    pub bucket: String,

    /// Region override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Endpoint override, for S3-compatible hosts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// How many objects to compare and upload concurrently
    #[serde(default = "default_remote_concurrency")]
    pub concurrency: usize,
}

fn default_remote_concurrency() -> usize {
    16
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: None,
            endpoint: None,
            concurrency: default_remote_concurrency(),
        }
    }
}

/// Local write retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per write before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    4
}

fn default_base_delay_ms() -> u64 {
    250
}

fn default_max_delay_ms() -> u64 {
    5_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChainbookConfig::default();
        assert_eq!(config.chains.len(), 36);
        assert_eq!(config.storage.data_dir, PathBuf::from("./data"));
        assert_eq!(config.sources.token_lists.len(), 20);
        assert_eq!(config.sources.coingecko.min_interval_ms, 2_000);
        assert_eq!(config.remote.concurrency, 16);
        config.validate().unwrap();
    }

    #[test]
    fn test_router_slugs_cover_deploy_files() {
        let config = ChainbookConfig::default();
        let slugged = config.chains.iter().filter(|c| c.slug.is_some()).count();
        assert_eq!(slugged, 24);
        assert_eq!(config.chain_by_slug("mainnet").unwrap().id, 1);
        assert_eq!(config.chain_by_slug("base-sepolia").unwrap().id, 84532);
        assert_eq!(config.chain_by_slug("zora").unwrap().id, 7777777);
        assert!(config.chain_by_slug("unknown-chain").is_none());
    }

    #[test]
    fn test_chain_lookups() {
        let config = ChainbookConfig::default();
        assert_eq!(config.chain_name(137), Some("Polygon"));
        assert_eq!(config.chain_name(999), None);
        assert!(config.chain_ids().contains(&1666600000));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ChainbookConfig = toml::from_str(
            r#"
            [remote]
            bucket = "registry-data"

            [sources.coingecko]
            min_interval_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.remote.bucket, "registry-data");
        assert_eq!(config.remote.concurrency, 16);
        assert_eq!(config.sources.coingecko.min_interval_ms, 500);
        assert_eq!(
            config.sources.coingecko.api_url,
            "https://api.coingecko.com/api/v3"
        );
        assert_eq!(config.chains.len(), 36);
        assert_eq!(config.sources.token_lists.len(), 20);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ChainbookConfig::default();
        let rendered = config.to_toml().unwrap();
        let parsed: ChainbookConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.chains.len(), config.chains.len());
        assert_eq!(parsed.sources.oneinch.api_url, config.sources.oneinch.api_url);
        assert_eq!(parsed.retry.max_attempts, config.retry.max_attempts);
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut config = ChainbookConfig::default();
        config.chains.push(chain(1, "Duplicate"));
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = ChainbookConfig::default();
        config.chains.push(chain_with_slug(999_999, "Extra", "mainnet"));
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_bounds() {
        let mut config = ChainbookConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = ChainbookConfig::default();
        config.sources.chain_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = ChainbookConfig::default();
        config.chains.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_policy_conversion() {
        let retry = RetryConfig {
            max_attempts: 2,
            base_delay_ms: 100,
            max_delay_ms: 400,
        };
        let policy = retry.policy();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.base_delay, Duration::from_millis(100));
        assert_eq!(policy.max_delay, Duration::from_millis(400));
    }
}
