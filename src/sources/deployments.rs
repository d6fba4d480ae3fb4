//! Uniswap universal-router checkout reader.
//!
//! The router repo publishes one `deploy-addresses/<chain-slug>.json`
//! per chain, each a flat map of contract key to deployed address. This
//! reader only collects the files; turning keys into spender records is
//! the deployments pipeline's job.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// One chain's router deployment file.
#[derive(Debug, Clone)]
pub struct RouterDeployment {
    /// File name without extension, e.g. `mainnet` or `base-sepolia`.
    pub slug: String,
    /// Contract key to deployed address.
    pub contracts: BTreeMap<String, String>,
}

pub struct DeploymentsCheckout {
    root: PathBuf,
}

impl DeploymentsCheckout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Read every deployment file. The checkout is curated upstream, so
    /// unreadable or malformed files abort the import instead of being
    /// skipped.
    pub fn read_deployments(&self) -> Result<Vec<RouterDeployment>> {
        let deployments_dir = self.root.join("deploy-addresses");
        if !deployments_dir.is_dir() {
            return Err(Error::Config(format!(
                "{} does not look like a universal-router checkout (missing deploy-addresses/)",
                self.root.display()
            )));
        }

        let mut deployments = Vec::new();
        for entry in WalkDir::new(&deployments_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| Error::Source(e.to_string()))?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let Some(slug) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let contents = std::fs::read_to_string(path)?;
            let contracts: BTreeMap<String, String> = serde_json::from_str(&contents)?;
            debug!(slug, count = contracts.len(), "read deployment file");
            deployments.push(RouterDeployment {
                slug: slug.to_string(),
                contracts,
            });
        }
        Ok(deployments)
    }
}
