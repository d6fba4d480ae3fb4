//! ethereum-lists/contracts import pipeline.

use std::path::Path;

use tracing::{info, warn};

use crate::error::Result;
use crate::registry::{DataStore, Tier};
use crate::sources::ContractsCheckout;

/// Import spender names and labels from a local checkout of the
/// ethereum-lists/contracts repository.
pub async fn import_contracts(store: &DataStore, checkout_path: &Path) -> Result<usize> {
    info!(path = %checkout_path.display(), "Importing spenders from contracts checkout");
    let checkout = ContractsCheckout::new(checkout_path);

    let projects = checkout.read_projects()?;
    info!(projects = projects.len(), "project index read");

    let records = checkout.read_contracts(&projects)?;
    let total = records.len();

    let mut written = 0;
    for (partition, identifier, record) in &records {
        match store
            .write_spender(Tier::Generated, partition, identifier, record)
            .await
        {
            Ok(_) => written += 1,
            Err(e) => {
                warn!(identifier = %identifier, error = %e, "failed to write contract spender");
            }
        }
    }
    info!("wrote {written} of {total} contract spenders");
    Ok(written)
}
