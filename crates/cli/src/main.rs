//! Leather Shop CLI - catalog, cart and checkout from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Fetch the catalog snapshot (first run only)
//! shop-cli catalog load
//!
//! # Browse
//! shop-cli catalog list --category men
//! shop-cli catalog show 1
//!
//! # Fill the cart
//! shop-cli cart add 1 --size L --quantity 2
//! shop-cli cart show
//!
//! # Check out
//! shop-cli checkout --form order.yaml
//! ```
//!
//! # Commands
//!
//! - `catalog` - Load and browse the product catalog
//! - `cart` - Add, update, remove and show cart entries
//! - `zip` - Look up a zip code
//! - `checkout` - Submit a checkout form against the cart
//!
//! Configuration comes from the environment (see `StorefrontConfig`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use leather_shop_core::ProductId;
use leather_shop_storefront::config::StorefrontConfig;
use leather_shop_storefront::error::Result;
use leather_shop_storefront::state::Storefront;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "shop-cli")]
#[command(author, version, about = "Leather Shop CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and browse the product catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Zip code lookups
    Zip {
        #[command(subcommand)]
        action: ZipAction,
    },
    /// Submit a checkout form against the current cart
    Checkout {
        /// YAML file with the checkout form
        #[arg(short, long)]
        form: PathBuf,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Fetch and persist the catalog snapshot if not already present
    Load,
    /// List products
    List {
        /// Only show this category (case-insensitive)
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show one product
    Show {
        /// Product ID
        id: ProductId,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Add a product
    Add {
        /// Product ID
        id: ProductId,

        /// Size
        #[arg(short, long, default_value = "M")]
        size: String,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a product's quantity
    Set {
        /// Product ID
        id: ProductId,

        /// New quantity (values below 1 are ignored)
        quantity: u32,
    },
    /// Remove a product
    Remove {
        /// Product ID
        id: ProductId,
    },
    /// Show the cart and its totals
    Show,
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum ZipAction {
    /// Look up the state and country for a zip
    Lookup {
        /// Zip code
        zip: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "leather_shop_storefront=info,leather_shop_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Configuration is needed for Sentry, which must be initialized before tracing
    let config = StorefrontConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let storefront = match Storefront::from_config(&config) {
        Ok(storefront) => storefront,
        Err(e) => {
            tracing::error!("Failed to open storefront: {}", e.report());
            return ExitCode::FAILURE;
        }
    };

    let ctx = Context { config, storefront };
    match run(cli, &ctx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {}", e.report());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, ctx: &Context) -> Result<()> {
    match cli.command {
        Commands::Catalog { action } => match action {
            CatalogAction::Load => commands::catalog::load(ctx).await?,
            CatalogAction::List { category } => {
                commands::catalog::list(ctx, category.as_deref()).await?;
            }
            CatalogAction::Show { id } => commands::catalog::show(ctx, id).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Add { id, size, quantity } => {
                commands::cart::add(ctx, id, &size, quantity).await?;
            }
            CartAction::Set { id, quantity } => commands::cart::set(ctx, id, quantity)?,
            CartAction::Remove { id } => commands::cart::remove(ctx, id)?,
            CartAction::Show => commands::cart::show(ctx).await?,
            CartAction::Clear => commands::cart::clear(ctx)?,
        },
        Commands::Zip { action } => match action {
            ZipAction::Lookup { zip } => commands::zip::lookup(ctx, &zip)?,
        },
        Commands::Checkout { form } => commands::checkout::run(ctx, &form).await?,
    }
    Ok(())
}
