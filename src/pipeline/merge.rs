//! Token source merge engine.
//!
//! Sources are layered in registration order and later layers win whole
//! records: a record from a higher-precedence source completely replaces
//! the lower one, fields are never mixed across sources. A source that
//! fails for a chain is skipped with a warning so the remaining layers
//! still produce output.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::sources::{TokenMapping, TokenSource};

/// Token lists occasionally carry the zero address as a token.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

pub struct MergeEngine {
    sources: Vec<Arc<dyn TokenSource>>,
}

impl MergeEngine {
    /// `sources` in ascending precedence: the last source named wins
    /// conflicts.
    pub fn new(sources: Vec<Arc<dyn TokenSource>>) -> Self {
        Self { sources }
    }

    /// Merged records for one chain, or `None` when no source had
    /// anything to say about it.
    pub async fn merge_chain(&self, chain_id: u64) -> Option<TokenMapping> {
        let mut layers = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match source.tokens_for_chain(chain_id).await {
                Ok(layer) => layers.push(layer),
                Err(e) => {
                    warn!(source = source.name(), chain_id, error = %e, "skipping failed source");
                    layers.push(None);
                }
            }
        }

        if layers
            .iter()
            .all(|layer| layer.as_ref().map_or(true, |m| m.is_empty()))
        {
            return None;
        }

        let mut merged = TokenMapping::new();
        for layer in layers.into_iter().flatten() {
            merged.extend(layer);
        }
        Some(merged)
    }
}

/// Whether a merged token record is worth publishing. Records without a
/// symbol or logo cannot be rendered, and the zero address shows up in
/// enough lists to need an explicit exclusion.
pub fn passes_display_gate(identifier: &str, record: &Value) -> bool {
    if identifier == ZERO_ADDRESS {
        return false;
    }
    let symbol = record.get("symbol").and_then(Value::as_str).unwrap_or("");
    let logo = record.get("logoURI").and_then(Value::as_str).unwrap_or("");
    !symbol.is_empty() && !logo.is_empty()
}
