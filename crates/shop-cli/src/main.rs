use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use shop_config::ShopConfig;
use shop_links::{ActionLinkBuilder, LinkOptions, ResponseFormat};
use shop_token::ActionTokenAuthority;
use shop_workflow::{next_status_for_action, Action};

#[derive(Parser)]
#[command(name = "shopctl")]
#[command(about = "Storefront back-office CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env overrides ...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Print the action link for one order, as the daemon would build it
    Link {
        /// Order id
        #[arg(long)]
        order: String,

        /// accept | deny | dispatch_or_ready | complete
        #[arg(long)]
        action: String,

        /// Where the endpoint should redirect afterwards
        #[arg(long)]
        redirect: Option<String>,

        /// Response format hint carried by the link (html | json)
        #[arg(long)]
        format: Option<String>,

        /// Layered config paths; defaults to SHOP_CONFIG or config/base.yaml
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Print a JSON object instead of the bare URL
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Action token utilities
    Token {
        #[command(subcommand)]
        cmd: TokenCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum TokenCmd {
    /// Verify a token against the configured secret and print its claims
    Verify {
        token: String,

        /// Layered config paths; defaults to SHOP_CONFIG or config/base.yaml
        #[arg(long = "config")]
        config_paths: Vec<String>,
    },
}

#[derive(Serialize)]
struct LinkOutput {
    order_id: Uuid,
    action: Action,
    target_status: String,
    mode: &'static str,
    url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = shop_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = shop_db::status(&pool).await?;
                    println!("db_ok={} has_orders_table={}", s.ok, s.has_orders_table);
                }
                DbCmd::Migrate => {
                    shop_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = shop_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Link {
            order,
            action,
            redirect,
            format,
            config_paths,
            json,
        } => {
            let order_id = Uuid::parse_str(&order).context("--order must be a uuid")?;
            let action: Action = action.parse()?;
            let cfg = load_shop_config(&config_paths)?;
            let builder = ActionLinkBuilder::from_config(&cfg)?;

            let opts = LinkOptions {
                redirect,
                response_format: format.as_deref().map(|f| ResponseFormat::from_hint(Some(f))),
            };
            let url = builder.build_action_link(order_id, action, &opts)?;

            if json {
                let out = LinkOutput {
                    order_id,
                    action,
                    target_status: next_status_for_action(action).to_string(),
                    mode: cfg.link_mode.as_str(),
                    url,
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{url}");
            }
        }

        Commands::Token { cmd } => match cmd {
            TokenCmd::Verify {
                token,
                config_paths,
            } => {
                let cfg = load_shop_config(&config_paths)?;
                let authority = ActionTokenAuthority::from_config(&cfg)
                    .context("token verify needs a signing secret")?;
                let now = Utc::now();
                let claims = authority
                    .verify_at(&token, now)
                    .context("TOKEN_REJECTED")?;

                println!("order_id={}", claims.order_id);
                println!("action={}", claims.action);
                println!("issued_at={}", claims.issued_at.to_rfc3339());
                println!("expires_at={}", claims.expires_at.to_rfc3339());
                println!(
                    "remaining_secs={}",
                    shop_token::remaining(&claims, now).num_seconds()
                );
            }
        },
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_shop_config(paths: &[String]) -> Result<ShopConfig> {
    let paths = if paths.is_empty() {
        shop_config::config_paths_from_env()
    } else {
        paths.to_vec()
    };
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = shop_config::load_layered_yaml(&path_refs)?;
    tracing::debug!(config_hash = %loaded.config_hash, "config loaded");
    ShopConfig::from_loaded(&loaded)
}
