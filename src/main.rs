//! Chainbook - Canonical Multi-Chain Token and Spender Registry
//!
//! Command-line entry point for the registry pipelines: token and spender
//! refreshes, checkout imports, manual override seeding, the identifier
//! lint, and the remote diff sync.

use anyhow::Result;
use chainbook::{
    config::ChainbookConfig,
    pipeline::{
        import_contracts, import_router_deployments, seed_manual_overrides, sync_kind,
        update_erc20_tokens, update_nft_tokens, update_risk_factors, update_spam_tokens,
        update_universal_spenders,
    },
    registry::{lint::lint_identifiers, DataStore, EntityKind, Tier},
    remote::S3Remote,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chainbook")]
#[command(version)]
#[command(about = "Canonical multi-chain token and spender registry")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CHAINBOOK_CONFIG", default_value = "chainbook.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh ERC-20 token records for every configured chain
    Tokens,

    /// Refresh NFT collection records from Reservoir
    Nfts,

    /// Mark Alchemy-reported spam contracts as spam tokens
    Spam {
        /// Alchemy API key (overrides the config file)
        #[arg(long, env = "ALCHEMY_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Write universal spenders and flagged delegates to every chain
    Universal,

    /// Pull the ScamSniffer blocklist into spender risk factors
    RiskFactors {
        /// ScamSniffer API key (overrides the config file)
        #[arg(long, env = "SCAMSNIFFER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Import spender labels from a contracts checkout
    Contracts {
        /// Path to the checkout root
        path: PathBuf,
    },

    /// Import Uniswap router spenders from a universal-router checkout
    Deployments {
        /// Path to the checkout root
        path: PathBuf,
    },

    /// Copy manual overrides over their generated counterparts
    Seed {
        /// Restrict to one entity kind
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
    },

    /// Diff-sync generated records to the remote bucket
    Sync {
        /// Restrict to one entity kind
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
    },

    /// Rename stored files whose names are not canonical identifiers
    Lint,

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Tokens,
    Spenders,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Tokens => EntityKind::Tokens,
            KindArg::Spenders => EntityKind::Spenders,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("chainbook={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut config = if cli.config.exists() {
        ChainbookConfig::load(&cli.config)?
    } else {
        ChainbookConfig::default()
    };

    let store = DataStore::with_retry(&config.storage.data_dir, config.retry.policy());

    match cli.command {
        Commands::Tokens => {
            update_erc20_tokens(&config, &store).await?;
        }
        Commands::Nfts => {
            update_nft_tokens(&config, &store).await?;
        }
        Commands::Spam { api_key } => {
            if let Some(key) = api_key {
                config.sources.alchemy.api_key = key;
            }
            update_spam_tokens(&config, &store).await?;
        }
        Commands::Universal => {
            update_universal_spenders(&config, &store).await?;
        }
        Commands::RiskFactors { api_key } => {
            if let Some(key) = api_key {
                config.sources.scamsniffer.api_key = key;
            }
            update_risk_factors(&config, &store).await?;
        }
        Commands::Contracts { path } => {
            import_contracts(&store, &path).await?;
        }
        Commands::Deployments { path } => {
            import_router_deployments(&config, &store, &path).await?;
        }
        Commands::Seed { kind } => {
            seed_manual_overrides(&store, kind.map(Into::into)).await?;
        }
        Commands::Sync { kind } => {
            run_sync(&config, &store, kind.map(Into::into)).await?;
        }
        Commands::Lint => {
            run_lint(&store).await?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn run_sync(
    config: &ChainbookConfig,
    store: &DataStore,
    kind: Option<EntityKind>,
) -> Result<()> {
    if config.remote.bucket.is_empty() {
        anyhow::bail!("remote.bucket is not configured; nothing to sync to");
    }
    let remote = S3Remote::connect(&config.remote).await?;

    let kinds = match kind {
        Some(kind) => vec![kind],
        None => vec![EntityKind::Tokens, EntityKind::Spenders],
    };
    let retry = config.retry.policy();
    let mut failed = 0;
    for kind in kinds {
        let report = sync_kind(store, &remote, kind, config.remote.concurrency, &retry).await?;
        failed += report.failed.len();
    }
    if failed > 0 {
        anyhow::bail!("{failed} records failed to sync");
    }
    Ok(())
}

/// Both tiers get linted: manual overrides are edited by hand, so
/// non-canonical names show up there first.
async fn run_lint(store: &DataStore) -> Result<()> {
    let mut renamed = 0;
    let mut failed = 0;
    for tier in [Tier::Generated, Tier::Manual] {
        for kind in [EntityKind::Tokens, EntityKind::Spenders] {
            let report = lint_identifiers(store, tier, kind).await?;
            renamed += report.renamed;
            failed += report.failed;
        }
    }
    tracing::info!(renamed, failed, "identifier lint finished");
    if failed > 0 {
        anyhow::bail!("{failed} files could not be renamed");
    }
    Ok(())
}

fn show_config(config: Option<&ChainbookConfig>) -> Result<()> {
    let config = match config {
        Some(config) => config.to_toml()?,
        None => ChainbookConfig::default().to_toml()?,
    };
    println!("{}", config);
    Ok(())
}
