//! Record types stored in the registry
//!
//! A record lives at one (tier, entity kind, partition, identifier)
//! coordinate and is always a single JSON object. Optional fields are
//! omitted from serialization so the stored bytes carry only what a
//! writer actually supplied.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Hand-curated overrides; overlays the generated tier before publication
    Manual,
    /// Pipeline output; the only tier that is published
    Generated,
}

impl Tier {
    /// Directory name under the store root
    pub fn dir_name(&self) -> &'static str {
        match self {
            Tier::Manual => "manual",
            Tier::Generated => "generated",
        }
    }
}

/// Kind of entity a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// ERC-20 and NFT token metadata
    Tokens,
    /// Contracts that hold token approvals
    Spenders,
}

impl EntityKind {
    /// Directory name under the tier
    pub fn dir_name(&self) -> &'static str {
        match self {
            EntityKind::Tokens => "tokens",
            EntityKind::Spenders => "spenders",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Partition within a tier and kind: the chain a record belongs to, or a
/// named bucket for records not tied to one chain (e.g. a source name).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Partition {
    /// Numeric chain id
    Chain(u64),
    /// Named bucket
    Bucket(String),
}

impl Partition {
    /// Directory name under the entity kind
    pub fn dir_name(&self) -> String {
        self.to_string()
    }

    /// Parse a partition from its directory name. All-digit names are chain
    /// partitions, everything else is a bucket.
    pub fn from_dir_name(name: &str) -> Partition {
        match name.parse::<u64>() {
            Ok(id) => Partition::Chain(id),
            Err(_) => Partition::Bucket(name.to_string()),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Chain(id) => write!(f, "{}", id),
            Partition::Bucket(name) => f.write_str(name),
        }
    }
}

impl From<u64> for Partition {
    fn from(chain_id: u64) -> Self {
        Partition::Chain(chain_id)
    }
}

/// Public token record schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Ticker symbol (for NFTs, the collection name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,

    /// Decimal places
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,

    /// Logo image URL
    #[serde(rename = "logoURI", skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,

    /// Marked as spam by a spam-list provider
    #[serde(rename = "isSpam", skip_serializing_if = "Option::is_none")]
    pub is_spam: Option<bool>,
}

/// Public spender record schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpenderRecord {
    /// Short display name, e.g. "Uniswap"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Full label, e.g. "Uniswap: Universal Router v2"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Risk annotations reported for this spender
    #[serde(rename = "riskFactors", skip_serializing_if = "Option::is_none")]
    pub risk_factors: Option<Vec<RiskFactor>>,
}

/// One risk annotation attached to a spender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    /// Risk kind, e.g. "blocklist" or "deprecated"
    #[serde(rename = "type")]
    pub kind: String,

    /// Provider that attested the risk
    pub source: String,

    /// Optional provider-specific payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl RiskFactor {
    /// Risk factor with no extra payload
    pub fn new(kind: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            source: source.into(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_dir_names_round_trip() {
        let chain = Partition::Chain(42161);
        assert_eq!(chain.dir_name(), "42161");
        assert_eq!(Partition::from_dir_name("42161"), chain);

        let bucket = Partition::Bucket("scamsniffer".to_string());
        assert_eq!(bucket.dir_name(), "scamsniffer");
        assert_eq!(Partition::from_dir_name("scamsniffer"), bucket);
    }

    #[test]
    fn test_token_record_omits_absent_fields() {
        let record = TokenRecord {
            is_spam: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"isSpam":true}"#);
    }

    #[test]
    fn test_token_record_wire_names() {
        let record = TokenRecord {
            symbol: Some("WETH".to_string()),
            decimals: Some(18),
            logo_uri: Some("https://example.org/weth.png".to_string()),
            is_spam: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"symbol":"WETH","decimals":18,"logoURI":"https://example.org/weth.png"}"#
        );
    }

    #[test]
    fn test_spender_record_wire_names() {
        let record = SpenderRecord {
            name: Some("Uniswap (old)".to_string()),
            label: Some("Uniswap: Universal Router v1".to_string()),
            risk_factors: Some(vec![RiskFactor::new("deprecated", "whois")]),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Uniswap (old)","label":"Uniswap: Universal Router v1","riskFactors":[{"type":"deprecated","source":"whois"}]}"#
        );
    }
}
