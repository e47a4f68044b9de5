mod app;
mod build_info;
mod cache;
mod config;
mod stitch;
mod storage;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use shipledger_core::cache::RegionStats;
use shipledger_core::order::{association_by_name, OrderAssociation, ASSOCIATION_NAMES};
use shipledger_core::storage::PageRequest;

use crate::{app::App, config::Config};

/// ShipLedger - Orders, shipments and invoices behind a distributed cache
#[derive(Parser, Debug)]
#[command(name = "shipledger")]
#[command(version, about, long_about = None)]
#[command(long_version = build_info::version_string())]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect to the cache and provision every region
    Provision {
        /// Keep running and log region clears broadcast by other processes
        #[arg(long)]
        watch: bool,
    },

    /// Print cache region statistics as JSON
    Stats,

    /// Clear one cache region for every deployment sharing the cache
    Clear {
        /// Region name, e.g. orders.items
        region: String,
    },

    /// List a page of orders as JSON, newest first
    Orders {
        /// Zero-based page number
        #[arg(long, default_value = "0")]
        page: u32,

        /// Orders per page (1-1000)
        #[arg(long, default_value = "20")]
        size: u32,

        /// Associations to resolve, comma-separated (items, shipments, invoices)
        #[arg(long = "with", value_delimiter = ',', value_parser = parse_association)]
        with: Vec<OrderAssociation>,

        /// Also log cache statistics
        #[arg(long)]
        stats: bool,
    },

    /// Print a single order as JSON
    Show {
        /// Order ID
        id: Uuid,

        /// Associations to resolve, comma-separated (items, shipments, invoices)
        #[arg(long = "with", value_delimiter = ',', value_parser = parse_association)]
        with: Vec<OrderAssociation>,
    },

    /// Insert demo orders into the database
    Seed {
        /// Number of orders to create
        #[arg(long, default_value = "25")]
        orders: u32,
    },
}

fn parse_association(value: &str) -> std::result::Result<OrderAssociation, String> {
    association_by_name(value.trim()).ok_or_else(|| {
        format!(
            "unknown association '{value}', expected one of: {}",
            ASSOCIATION_NAMES.join(", ")
        )
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_json);

    let config = Config::from_env();
    tracing::debug!(?config, version = %build_info::version_string(), "Loaded configuration");

    // Startup without a reachable cache is not supported.
    let app = App::init(&config).await?;

    match cli.command {
        Command::Provision { watch } => {
            log_stats(&app.stats().await?);
            if watch {
                app.watch_invalidations().await?;
            }
        }
        Command::Stats => {
            print_json(&app.stats().await?)?;
        }
        Command::Clear { region } => {
            app.clear_region(&region).await?;
        }
        Command::Orders {
            page,
            size,
            with,
            stats,
        } => {
            let request = PageRequest::new(page, size)?;
            let orders = app.list_orders(request, &with).await?;
            print_json(&orders)?;
            if stats {
                log_stats(&app.stats().await?);
            }
        }
        Command::Show { id, with } => {
            let order = app
                .show_order(id, &with)
                .await?
                .with_context(|| format!("Order {id} not found"))?;
            print_json(&order)?;
        }
        Command::Seed { orders } => {
            let ids = app.seed(orders).await?;
            println!("Seeded {} orders into {}", ids.len(), config.sqlite_path);
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shipledger=info".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn log_stats(stats: &[RegionStats]) {
    for region in stats {
        tracing::info!(
            region = %region.region,
            entries = region.entry_count,
            hits = region.hits,
            misses = region.misses,
            hit_ratio = ?region.hit_ratio(),
            prefix = %region.key_prefix,
            "Cache region statistics"
        );
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_association() {
        assert_eq!(parse_association("items"), Ok(OrderAssociation::Items));
        assert_eq!(parse_association(" invoices"), Ok(OrderAssociation::Invoices));
        assert!(parse_association("payments")
            .unwrap_err()
            .contains("items, shipments, invoices"));
    }

    #[test]
    fn test_cli_parses_orders_with_associations() {
        let cli = Cli::try_parse_from([
            "shipledger",
            "orders",
            "--page",
            "2",
            "--with",
            "items,shipments",
        ])
        .unwrap();

        match cli.command {
            Command::Orders {
                page, size, with, ..
            } => {
                assert_eq!((page, size), (2, 20));
                assert_eq!(
                    with,
                    vec![OrderAssociation::Items, OrderAssociation::Shipments]
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_association() {
        let result = Cli::try_parse_from(["shipledger", "orders", "--with", "payments"]);
        assert!(result.is_err());
    }
}
