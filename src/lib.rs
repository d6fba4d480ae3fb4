//! Chainbook - Canonical Multi-Chain Token and Spender Registry
//!
//! Chainbook maintains a canonical registry of ERC-20 token, NFT collection,
//! and spender contract metadata across EVM chains. It merges unreliable
//! upstream feeds under a fixed precedence order, sanitizes every record
//! through a single canonical encoder, stores records as one file per entity,
//! and diff-syncs the result to an S3-compatible object store.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                           Upstream feeds                           │
//! │  ┌────────────┐ ┌───────┐ ┌───────────┐ ┌───────────┐ ┌────────┐  │
//! │  │ Token lists│ │ 1inch │ │ CoinGecko │ │ Reservoir │ │ Alchemy│  │
//! │  └─────┬──────┘ └───┬───┘ └─────┬─────┘ └─────┬─────┘ └───┬────┘  │
//! └────────┼────────────┼───────────┼─────────────┼───────────┼───────┘
//!          └────────────┴─────┬─────┘             │           │
//!                             ▼                   │           │
//!                  ┌─────────────────────┐        │           │
//!                  │     Merge engine    │        │           │
//!                  │  - fixed precedence │        │           │
//!                  │  - per-source       │        │           │
//!                  │    failure isolation│        │           │
//!                  └──────────┬──────────┘        │           │
//!                             └─────────┬─────────┴───────────┘
//!                                       ▼
//!                            ┌─────────────────────┐
//!                            │      Sanitizer      │
//!                            │  - schema projection│
//!                            │  - logo URI rewrites│
//!                            │  - sorted keys      │
//!                            └──────────┬──────────┘
//!                                       ▼
//!                     ┌──────────────────────────────────┐
//!                     │      Path-addressed store        │
//!                     │  <tier>/<kind>/<partition>/<id>  │
//!                     └────────────────┬─────────────────┘
//!                                      ▼
//!                            ┌──────────────────┐
//!                            │     Diff sync    │──► S3 bucket
//!                            └──────────────────┘
//! ```
//!
//! ## Key Properties
//!
//! ### Canonical identifiers
//! - EVM addresses carry their EIP-55 checksum everywhere
//! - Non-address identifiers (ENS names, domains) are lowercased
//! - One normalization routine feeds file paths, merge keys, and sync keys
//!
//! ### Deterministic records
//! - Every write passes through one sanitize-and-encode choke point
//! - Object keys serialize sorted, so equal records are equal bytes
//! - The sync diff compares those bytes and uploads only on mismatch
//!
//! ### Failure isolation
//! - One source failing never sinks a chain; one chain never sinks a run
//! - Bulk imports skip and log malformed entries instead of aborting
//! - Transient store and upload errors retry with bounded backoff
//!
//! ## Modules
//!
//! - [`registry`]: identifier normalization, record schemas, sanitizer, store
//! - [`sources`]: upstream feed clients and checkout readers
//! - [`pipeline`]: refresh, import, seed, and sync operations
//! - [`remote`]: object store abstraction and the S3 backend
//! - [`config`]: TOML configuration with production defaults

pub mod config;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod remote;
pub mod sources;

pub use config::ChainbookConfig;
pub use error::{Error, Result};
