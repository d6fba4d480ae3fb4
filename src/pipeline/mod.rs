//! Update pipelines.
//!
//! Each pipeline is one runnable unit of work: pull from upstream
//! sources, shape the records, and hand them to the store or the remote.
//! They share the store and config but not state with each other, and
//! each corresponds to one CLI subcommand.

pub mod contracts;
pub mod deployments;
pub mod merge;
pub mod nfts;
pub mod risk;
pub mod seed;
pub mod spam;
pub mod sync;
pub mod tokens;
pub mod universal;

pub use contracts::import_contracts;
pub use deployments::import_router_deployments;
pub use merge::{passes_display_gate, MergeEngine, ZERO_ADDRESS};
pub use nfts::update_nft_tokens;
pub use risk::update_risk_factors;
pub use seed::seed_manual_overrides;
pub use spam::update_spam_tokens;
pub use sync::{sync_kind, SyncReport};
pub use tokens::update_erc20_tokens;
pub use universal::update_universal_spenders;

use crate::config::ChainbookConfig;

/// Log-friendly chain label, `Name (id)` when the chain is configured.
pub(crate) fn chain_label(config: &ChainbookConfig, chain_id: u64) -> String {
    match config.chain_name(chain_id) {
        Some(name) => format!("{name} ({chain_id})"),
        None => format!("chain {chain_id}"),
    }
}
