//! VoltCart CLI - a terminal front end over the storefront and back office.
//!
//! # Usage
//!
//! ```bash
//! # Size a breaker for a room
//! vc load --bulbs 10 --fans 2 --ac 1
//!
//! # Sign in (password from VOLTCART_PASSWORD or --password)
//! vc login -e asha@example.com
//!
//! # Browse and shop
//! vc products --keyword fan --page 2
//! vc cart add 65f1c2d3e4a5b6c7d8e9f0a1 -q 2
//! vc cart show
//!
//! # Poll notifications until Ctrl-C or sign-out
//! vc notifications watch
//!
//! # Back office
//! vc admin stats
//! ```
//!
//! # Environment Variables
//!
//! See `voltcart_storefront::config` for the client settings. `RUST_LOG`
//! overrides the default log filter.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voltcart_storefront::ClientConfig;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "vc")]
#[command(author, version, about = "VoltCart storefront from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate electrical load and the breaker it needs
    Load {
        #[arg(long, default_value_t = 0)]
        bulbs: i64,
        #[arg(long, default_value_t = 0)]
        fans: i64,
        #[arg(long, default_value_t = 0)]
        ac: i64,
    },
    /// Sign in and store the credential
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(long, env = "VOLTCART_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the credential
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Browse the catalog
    Products {
        #[arg(short, long)]
        keyword: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Inspect or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// List your orders
    Orders,
    /// Notification inbox
    Notifications {
        #[command(subcommand)]
        action: NotificationAction,
    },
    /// Back-office tools (admins only)
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// List cart lines and the total
    Show,
    /// Add a product
    Add {
        product_id: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: i64,
    },
    /// Set a line's quantity (values below 1 become 1)
    Set { item_id: String, quantity: i64 },
    /// Remove a line
    Remove { item_id: String },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum NotificationAction {
    /// Poll the unread count while signed in
    Watch,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Dashboard headline figures
    Stats,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
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
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "voltcart_storefront=info,voltcart_admin=info,voltcart_cli=info".into()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    match run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), commands::CliError> {
    // The load estimator is offline; everything else talks to the API.
    if let Commands::Load { bulbs, fans, ac } = cli.command {
        commands::load::estimate(bulbs, fans, ac);
        return Ok(());
    }

    let ctx = Context::open(config)?;
    match cli.command {
        Commands::Load { .. } => {}
        Commands::Login { email, password } => {
            commands::account::login(&ctx, &email, password).await?;
        }
        Commands::Logout => commands::account::logout(&ctx),
        Commands::Whoami => commands::account::whoami(&ctx).await?,
        Commands::Products {
            keyword,
            category,
            page,
        } => commands::catalog::list(&ctx, keyword, category, page).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx).await?,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(&ctx, &product_id, quantity).await?,
            CartAction::Set { item_id, quantity } => {
                commands::cart::set(&ctx, &item_id, quantity).await?;
            }
            CartAction::Remove { item_id } => commands::cart::remove(&ctx, &item_id).await?,
            CartAction::Clear => commands::cart::clear(&ctx).await?,
        },
        Commands::Orders => commands::orders::list(&ctx).await?,
        Commands::Notifications { action } => match action {
            NotificationAction::Watch => commands::notifications::watch(&ctx).await?,
        },
        Commands::Admin { action } => match action {
            AdminAction::Stats => commands::admin::stats(&ctx).await?,
        },
    }
    Ok(())
}
