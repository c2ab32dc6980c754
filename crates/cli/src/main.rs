//! Trolley CLI - Database migrations and record management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! trolley migrate
//!
//! # Create a user with arbitrary fields
//! trolley user create -f email=ada@example.com -f 'tags=["beta"]'
//!
//! # Create a product and a cart, then add the product to the cart
//! trolley product create -n "Dried pineapple" -p 8.99 -c USD
//! trolley cart create
//! trolley cart add <CART_ID> <PRODUCT_ID> -q 2
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user` - Create, list, show, update and delete users
//! - `product` - Create and list products
//! - `cart` - Create carts and manage their items

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trolley_core::{CartId, CurrencyCode, ProductId, UserId};
use trolley_store::config::StoreConfig;
use trolley_store::db;
use trolley_store::state::AppState;

mod commands;

use commands::Field;

#[derive(Parser)]
#[command(name = "trolley")]
#[command(author, version, about = "Trolley CLI tools")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage products
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Manage carts and their items
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user from `key=value` fields (values may be JSON)
    Create {
        /// Field to store on the user
        #[arg(short, long = "field", value_parser = commands::parse_field)]
        fields: Vec<Field>,
    },
    /// List users, optionally filtered by `key=value` equalities
    List {
        /// Field the users must match
        #[arg(short, long = "field", value_parser = commands::parse_field)]
        fields: Vec<Field>,
    },
    /// Show one user
    Get {
        /// User ID
        id: UserId,
    },
    /// Set fields on a user
    Update {
        /// User ID
        id: UserId,
        /// Field to set
        #[arg(short, long = "set", value_parser = commands::parse_field, required = true)]
        fields: Vec<Field>,
    },
    /// Delete a user
    Delete {
        /// User ID
        id: UserId,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// Create a product
    Create {
        /// Product name
        #[arg(short, long)]
        name: String,

        /// Unit price (e.g., 8.99)
        #[arg(short, long)]
        price: rust_decimal::Decimal,

        /// ISO 4217 currency code
        #[arg(short, long, default_value = "USD")]
        currency: CurrencyCode,
    },
    /// List all products
    List,
}

#[derive(Subcommand)]
enum CartAction {
    /// Create an empty cart
    Create {
        /// Owning user ID
        #[arg(short, long)]
        user: Option<UserId>,
    },
    /// Add a product to a cart (increments the quantity if already present)
    Add {
        /// Cart ID
        cart: CartId,
        /// Product ID
        product: ProductId,
        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Show the items in a cart
    Show {
        /// Cart ID
        cart: CartId,
    },
    /// Remove a product from a cart
    Remove {
        /// Cart ID
        cart: CartId,
        /// Product ID
        product: ProductId,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StoreConfig) -> Option<sentry::ClientInitGuard> {
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

/// Initialize tracing with `EnvFilter` and the Sentry layer.
fn init_tracing(json_logs: bool) {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "trolley_store=info,trolley_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Configuration comes first so Sentry is up before the subscriber
    let config = StoreConfig::from_env();
    let sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing(cli.json_logs);

    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pool = db::create_pool(config).await?;
    tracing::debug!("Database pool created");

    let state = AppState::postgres(&pool);

    match cli.command {
        Commands::Migrate => commands::migrate::run(&pool).await?,
        Commands::User { action } => match action {
            UserAction::Create { fields } => commands::users::create(&state, fields).await?,
            UserAction::List { fields } => commands::users::list(&state, fields).await?,
            UserAction::Get { id } => commands::users::get(&state, id).await?,
            UserAction::Update { id, fields } => {
                commands::users::update(&state, id, fields).await?;
            }
            UserAction::Delete { id } => commands::users::delete(&state, id).await?,
        },
        Commands::Product { action } => match action {
            ProductAction::Create {
                name,
                price,
                currency,
            } => commands::products::create(&state, name, price, currency).await?,
            ProductAction::List => commands::products::list(&state).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Create { user } => commands::carts::create(&state, user).await?,
            CartAction::Add {
                cart,
                product,
                quantity,
            } => commands::carts::add(&state, cart, product, quantity).await?,
            CartAction::Show { cart } => commands::carts::show(&state, cart).await?,
            CartAction::Remove { cart, product } => {
                commands::carts::remove(&state, cart, product).await?;
            }
        },
    }

    pool.close().await;
    Ok(())
}
