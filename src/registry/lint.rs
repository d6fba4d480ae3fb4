//! Identifier lint
//!
//! Normalization rules evolve; files written under an older spelling keep
//! the store non-canonical until something renames them. The lint walks a
//! tier and kind and renames every file whose stem is not its own
//! normalization. This is the only sanctioned way a record file disappears.

use crate::error::Result;
use crate::registry::address::normalize_identifier;
use crate::registry::record::{EntityKind, Tier};
use crate::registry::store::DataStore;

/// Tally of one lint sweep.
#[derive(Debug, Default)]
pub struct LintReport {
    /// Files renamed to their canonical spelling
    pub renamed: usize,
    /// Files whose rename failed
    pub failed: usize,
}

/// Rename every stored file whose name is not its own normalization.
/// If a file already exists at the canonical name, the renamed file
/// replaces it. A rename that fails is logged and tallied; the sweep
/// continues with the remaining files.
pub async fn lint_identifiers(store: &DataStore, tier: Tier, kind: EntityKind) -> Result<LintReport> {
    let mut report = LintReport::default();
    for entry in store.walk(tier, kind) {
        let canonical = normalize_identifier(&entry.identifier);
        if canonical == entry.identifier {
            continue;
        }
        let target = entry.path.with_file_name(format!("{}.json", canonical));
        match tokio::fs::rename(&entry.path, &target).await {
            Ok(()) => {
                tracing::info!(
                    "Renamed {} -> {}.json",
                    entry.path.display(),
                    canonical
                );
                report.renamed += 1;
            }
            Err(e) => {
                tracing::warn!(
                    path = %entry.path.display(),
                    error = %e,
                    "failed to rename non-canonical file"
                );
                report.failed += 1;
            }
        }
    }
    Ok(report)
}
