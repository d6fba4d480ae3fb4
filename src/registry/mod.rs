//! Canonical record registry
//!
//! Identifier normalization, the public record schemas, the sanitizer, the
//! path-addressed file store, and the identifier lint.

pub mod address;
pub mod lint;
pub mod record;
pub mod sanitize;
pub mod store;

pub use address::{is_address, normalize_identifier};
pub use record::{EntityKind, Partition, RiskFactor, SpenderRecord, Tier, TokenRecord};
pub use store::{DataStore, RetryPolicy, StoredEntry};
