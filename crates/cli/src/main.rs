//! LabMarket CLI - Moderation tools for the hosted marketplace backend.
//!
//! # Usage
//!
//! ```bash
//! # List pending buy listings
//! lm-cli products list --kind buy --status pending
//!
//! # Publish a listing
//! lm-cli products status 7f1c... active
//!
//! # Approve a donation request and email the requester
//! lm-cli requests approve 3a9e... --notify
//!
//! # Suspend a seller
//! lm-cli sellers status 51b0... suspended
//!
//! # Search products, sellers and requests
//! lm-cli search "centrifuge"
//! ```
//!
//! # Environment Variables
//!
//! - `BACKEND_URL`, `BACKEND_ANON_KEY` - hosted backend (required)
//! - `BACKEND_SERVICE_KEY` - privileged key for moderation writes
//! - `EMAIL_*` - email relay used by `--notify`
//! - `SENTRY_DSN` - error reporting

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use labmarket_client::Marketplace;
use labmarket_client::config::MarketConfig;
use labmarket_core::{
    ProductId, ProductStatus, RequestId, RequestKind, RequestStatus, SellerId, SellerStatus,
};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "lm-cli")]
#[command(author, version, about = "LabMarket operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Moderate product listings
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Review buy and donate requests
    Requests {
        #[command(subcommand)]
        action: RequestAction,
    },
    /// Manage seller accounts
    Sellers {
        #[command(subcommand)]
        action: SellerAction,
    },
    /// Search products, sellers and requests
    Search {
        /// Text to look for
        query: String,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List live (not deleted) products, newest first
    List {
        /// Only `buy` or `donate` listings
        #[arg(short, long)]
        kind: Option<RequestKind>,

        /// Only listings in this status (`pending`, `active`, `inactive`)
        #[arg(short, long)]
        status: Option<ProductStatus>,

        /// Only listings in this category
        #[arg(short, long)]
        category: Option<String>,

        /// 1-indexed page
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Set a listing's status
    Status { id: ProductId, status: ProductStatus },
    /// Soft-delete a listing
    Delete { id: ProductId },
}

#[derive(Subcommand)]
enum RequestAction {
    /// List requests of one kind, newest first
    List {
        /// `buy` or `donate`
        kind: RequestKind,

        /// Only requests in this status
        #[arg(short, long)]
        status: Option<RequestStatus>,

        /// 1-indexed page
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Show a request with its line items
    Show { id: RequestId },
    /// Approve a pending request
    Approve {
        id: RequestId,

        /// Email the requester about the decision
        #[arg(long)]
        notify: bool,
    },
    /// Reject a pending request
    Reject {
        id: RequestId,

        /// Email the requester about the decision
        #[arg(long)]
        notify: bool,
    },
}

#[derive(Subcommand)]
enum SellerAction {
    /// List sellers, newest first
    List {
        /// Only sellers in this status
        #[arg(short, long)]
        status: Option<SellerStatus>,

        /// 1-indexed page
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Set a seller's account status
    Status { id: SellerId, status: SellerStatus },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &MarketConfig) -> Option<sentry::ClientInitGuard> {
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

fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "labmarket_client=info,labmarket_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = MarketConfig::from_env()?;
    let _sentry_guard = init_sentry(&config);
    let market = Marketplace::connect(config)?;

    match cli.command {
        Commands::Products { action } => match action {
            ProductAction::List {
                kind,
                status,
                category,
                page,
            } => commands::products::list(&market, kind, status, category, page).await?,
            ProductAction::Status { id, status } => {
                commands::products::set_status(&market, id, status).await?;
            }
            ProductAction::Delete { id } => commands::products::delete(&market, id).await?,
        },
        Commands::Requests { action } => match action {
            RequestAction::List { kind, status, page } => {
                commands::requests::list(&market, kind, status, page).await?;
            }
            RequestAction::Show { id } => commands::requests::show(&market, id).await?,
            RequestAction::Approve { id, notify } => {
                commands::requests::decide(&market, id, RequestStatus::Approved, notify).await?;
            }
            RequestAction::Reject { id, notify } => {
                commands::requests::decide(&market, id, RequestStatus::Rejected, notify).await?;
            }
        },
        Commands::Sellers { action } => match action {
            SellerAction::List { status, page } => {
                commands::sellers::list(&market, status, page).await?;
            }
            SellerAction::Status { id, status } => {
                commands::sellers::set_status(&market, id, status).await?;
            }
        },
        Commands::Search { query } => commands::search::run(&market, &query).await?,
    }
    Ok(())
}
