//! Manual override seeding pipeline.

use tracing::{info, warn};

use crate::error::Result;
use crate::registry::{DataStore, EntityKind, Tier};

/// Copy every manual record into the generated tier, re-sanitizing on
/// the way through. Manual data is curated by hand and wins over
/// whatever the automated pipelines wrote, so this runs after them.
pub async fn seed_manual_overrides(store: &DataStore, kind: Option<EntityKind>) -> Result<usize> {
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => vec![EntityKind::Tokens, EntityKind::Spenders],
    };

    let mut written = 0;
    for kind in kinds {
        info!(kind = %kind, "Seeding manual overrides");
        for entry in store.walk(Tier::Manual, kind) {
            let record = match store.read_path(&entry.path).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(path = %entry.path.display(), error = %e, "skipping unreadable manual record");
                    continue;
                }
            };
            match store
                .write(Tier::Generated, kind, &entry.partition, &entry.identifier, &record)
                .await
            {
                Ok(_) => written += 1,
                Err(e) => {
                    warn!(identifier = %entry.identifier, error = %e, "failed to seed manual record");
                }
            }
        }
    }
    info!(written, "manual overrides seeded");
    Ok(written)
}
