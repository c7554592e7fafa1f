// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shopbot - a Telegram sales assistant.
//!
//! This is the binary entry point: the long-running bot plus a few
//! maintenance commands for the catalog and order ledger.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod admin;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shopbot_config::{RuntimeFlavor, ShopbotConfig};

/// Shopbot - a Telegram sales assistant.
#[derive(Parser, Debug)]
#[command(name = "shopbot", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bot until interrupted.
    Serve,
    /// Manage the product catalog.
    Catalog {
        #[command(subcommand)]
        action: CatalogCommand,
    },
    /// List the orders a user has placed.
    Orders {
        /// Telegram user id.
        #[arg(long)]
        user: i64,
    },
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Add a product, or update it if the name exists.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        price: f64,
    },
    /// Print every product.
    List,
}

fn main() {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("shopbot: use --help for available commands");
        return;
    };

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            shopbot_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let runtime = match build_runtime(config.dispatch.runtime) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(async move {
        match command {
            Commands::Serve => serve::run_serve(config).await,
            Commands::Catalog {
                action:
                    CatalogCommand::Add {
                        name,
                        description,
                        price,
                    },
            } => admin::add_product(&config, name, description, price).await,
            Commands::Catalog {
                action: CatalogCommand::List,
            } => admin::list_products(&config).await,
            Commands::Orders { user } => admin::list_orders(&config, user).await,
        }
    });

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn load_config(
    path: Option<&std::path::Path>,
) -> Result<ShopbotConfig, Vec<shopbot_config::ConfigError>> {
    match path {
        Some(path) => shopbot_config::load_and_validate_path(path),
        None => shopbot_config::load_and_validate(),
    }
}

fn build_runtime(flavor: RuntimeFlavor) -> std::io::Result<tokio::runtime::Runtime> {
    let mut builder = match flavor {
        RuntimeFlavor::MultiThread => tokio::runtime::Builder::new_multi_thread(),
        RuntimeFlavor::CurrentThread => tokio::runtime::Builder::new_current_thread(),
    };
    builder.enable_all().thread_name("shopbot-worker").build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn parses_catalog_add() {
        let cli = Cli::try_parse_from([
            "shopbot",
            "catalog",
            "add",
            "--name",
            "Widget",
            "--description",
            "A widget",
            "--price",
            "9.99",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Catalog {
                action: CatalogCommand::Add { name, price, .. },
            }) => {
                assert_eq!(name, "Widget");
                assert!((price - 9.99).abs() < f64::EPSILON);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_global_config_flag() {
        let cli = Cli::try_parse_from(["shopbot", "orders", "--user", "42", "--config", "a.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("a.toml")));
        assert!(matches!(cli.command, Some(Commands::Orders { user: 42 })));
    }

    #[test]
    fn orders_requires_user() {
        assert!(Cli::try_parse_from(["shopbot", "orders"]).is_err());
    }

    #[test]
    fn both_runtime_flavors_build() {
        for flavor in [RuntimeFlavor::MultiThread, RuntimeFlavor::CurrentThread] {
            let runtime = build_runtime(flavor).unwrap();
            assert_eq!(runtime.block_on(async { 1 + 1 }), 2);
        }
    }
}
