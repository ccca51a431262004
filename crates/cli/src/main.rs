//! Shopcart CLI - drive the cart store against a live backend.
//!
//! # Usage
//!
//! ```bash
//! # Pull the server cart and show it
//! shopcart show
//!
//! # Show the locally saved cart without touching the network
//! shopcart show --offline
//!
//! # Reserve stock and add a line
//! shopcart add -p 64f1c0 -t "Court Classic" --price 25000 -q 2 --size 42 --color white
//!
//! # Remove one line, or everything
//! shopcart remove 6650b2e1
//! shopcart clear
//!
//! # Stock lookups
//! shopcart stock product 64f1c0
//! shopcart stock refresh
//!
//! # Forget the locally saved cart (logout)
//! shopcart purge
//! ```
//!
//! Configuration comes from the environment (see `shopcart_store::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use shopcart_store::StoreConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "shopcart")]
#[command(author, version, about = "Shopcart cart store client")]
struct Cli {
    /// Act as this user instead of `SHOPCART_USER_ID`
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the server cart and print it
    Show {
        /// Print the saved local state without contacting the backend
        #[arg(long)]
        offline: bool,
    },
    /// Add a line to the cart
    Add {
        /// Product identifier
        #[arg(short, long)]
        product: String,

        /// Display title
        #[arg(short, long)]
        title: String,

        /// Unit price
        #[arg(long)]
        price: Decimal,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Size label
        #[arg(short, long)]
        size: Option<String>,

        /// Selected color (repeatable, at most one per unit)
        #[arg(short, long = "color")]
        colors: Vec<String>,

        /// Image URL
        #[arg(long)]
        image: Option<String>,

        /// Stock was already reserved; skip the reservation call
        #[arg(long)]
        reserved: bool,
    },
    /// Remove a persisted cart line
    Remove {
        /// Server-assigned cart line identifier
        cart_item_id: String,
    },
    /// Empty the cart
    Clear,
    /// Stock lookups
    Stock {
        #[command(subcommand)]
        action: StockAction,
    },
    /// Delete the locally saved cart
    Purge,
}

#[derive(Subcommand)]
enum StockAction {
    /// Availability of one product, counting your own reservations
    Product { id: String },
    /// Availability of one accessory
    Accessory { id: String },
    /// Merge a fresh stock snapshot for every product
    Refresh,
    /// Fetch stock for cart products with no cached figure
    Missing,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StoreConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

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

fn init_tracing(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopcart=info,shopcart_store=info".into());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter));

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match StoreConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(cli.json);
            tracing::error!("Configuration error: {e}");
            std::process::exit(2);
        }
    };
    if let Some(user) = cli.user.clone() {
        config.user_id = Some(user.into());
    }

    // Sentry must be initialized before the subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing(cli.json);

    if let Err(e) = run(cli.command, &config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &StoreConfig) -> Result<(), commands::CliError> {
    let mut ctx = commands::Context::new(config)?;

    match command {
        Commands::Show { offline } => commands::cart::show(&mut ctx, offline).await,
        Commands::Add {
            product,
            title,
            price,
            quantity,
            size,
            colors,
            image,
            reserved,
        } => {
            let mut line =
                shopcart_store::CartLine::new(product, title, price, quantity).with_colors(colors);
            if let Some(size) = size {
                line = line.with_size(size);
            }
            if let Some(image) = image {
                line = line.with_image(image);
            }
            if reserved {
                line = line.reserved();
            }
            commands::cart::add(&mut ctx, line).await
        }
        Commands::Remove { cart_item_id } => {
            commands::cart::remove(&mut ctx, cart_item_id.into()).await
        }
        Commands::Clear => commands::cart::clear(&mut ctx).await,
        Commands::Stock { action } => match action {
            StockAction::Product { id } => commands::stock::product(&mut ctx, id.into()).await,
            StockAction::Accessory { id } => commands::stock::accessory(&mut ctx, id.into()).await,
            StockAction::Refresh => commands::stock::refresh(&mut ctx).await,
            StockAction::Missing => commands::stock::missing(&mut ctx).await,
        },
        Commands::Purge => commands::cart::purge(&ctx),
    }
}
