//! # delivery-quote
//!
//! Command-line access to the delivery service.
//!
//! ## Usage
//! ```bash
//! # Options for a postcode and basket, as JSON
//! delivery-quote quote "CF10 1AA" 50.00
//!
//! # Re-quote after the basket changed, keeping the selected option
//! delivery-quote requote "CF10 1AA" 150.00 zone_1
//!
//! # Replace the tiers of zone 1
//! delivery-quote tiers 1 0:100:20 100.01:999999.99:10
//!
//! # Excluded prefixes, zones, legacy import
//! delivery-quote exclude "AB, BT"
//! delivery-quote zones
//! delivery-quote migrate-legacy
//! ```
//!
//! Output goes to stdout as JSON; logs go to stderr (`RUST_LOG`).
//! Failures print `{"code": ..., "message": ..., "retryable": ...}` and
//! exit with status 1.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use delivery_core::{Money, ProposedTier, ValidationError, ZoneId};
use delivery_service::{DeliveryService, ServiceConfig, ServiceError, ServiceResult};

enum Command {
    Quote { postcode: String, subtotal: String },
    Requote { postcode: String, subtotal: String, option_id: String },
    Tiers { zone_id: String, tiers: Vec<String> },
    Exclude { list: String },
    Zones,
    MigrateLegacy,
}

struct Args {
    config_path: Option<PathBuf>,
    db_path: Option<PathBuf>,
    command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let Some(args) = parse_args(env::args().skip(1).collect()) else {
        print_help();
        return ExitCode::from(2);
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let body = err.body();
            match serde_json::to_string_pretty(&body) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", err),
            }
            ExitCode::FAILURE
        }
    }
}

/// Logs to stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,delivery=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> ServiceResult<()> {
    let mut config = match &args.config_path {
        Some(path) => ServiceConfig::load_from(Some(path.as_path()), |key| env::var(key).ok())?,
        None => ServiceConfig::load()?,
    };
    if let Some(path) = args.db_path {
        config.database_path = path;
    }
    if matches!(args.command, Command::MigrateLegacy) {
        config.run_legacy_migration = false;
    }

    info!(path = %config.database_path.display(), "Configuration loaded");
    let service = DeliveryService::connect(&config).await?;

    match args.command {
        Command::Quote { postcode, subtotal } => {
            let quote = service.resolve_delivery_options(&postcode, parse_subtotal(&subtotal)?).await;
            info!("{}", quote.summary());
            print_json(&quote)
        }
        Command::Requote {
            postcode,
            subtotal,
            option_id,
        } => {
            let requote = service
                .requote(&postcode, parse_subtotal(&subtotal)?, Some(&option_id))
                .await;
            print_json(&requote)
        }
        Command::Tiers { zone_id, tiers } => {
            let zone_id: ZoneId = zone_id.parse()?;
            let proposed = tiers
                .iter()
                .map(|entry| entry.parse::<ProposedTier>())
                .collect::<Result<Vec<_>, _>>()?;
            let saved = service.validate_and_save_tiers(zone_id, &proposed).await?;
            print_json(&service.zone_details(zone_id).await?.tiers)?;
            info!(zone_id = %zone_id, saved, "Tiers replaced");
            Ok(())
        }
        Command::Exclude { list } => {
            let excluded = service.set_excluded_postcodes(&list).await?;
            print_json(&excluded.prefixes())
        }
        Command::Zones => print_json(&service.list_zones().await?),
        Command::MigrateLegacy => print_json(&service.migrate_legacy().await?),
    }
}

fn parse_subtotal(text: &str) -> ServiceResult<Money> {
    let subtotal: Money = text.parse()?;
    if subtotal.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "subtotal".to_string(),
            min: 0,
            max: i64::MAX,
        }
        .into());
    }
    Ok(subtotal)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> ServiceResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ServiceError::Persistence {
        message: format!("Could not render output: {}", e),
        retryable: false,
    })?;
    println!("{}", json);
    Ok(())
}

fn parse_args(args: Vec<String>) -> Option<Args> {
    let mut config_path = None;
    let mut db_path = None;
    let mut positional: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                config_path = Some(PathBuf::from(args.get(i + 1)?));
                i += 1;
            }
            "--db" | "-d" => {
                db_path = Some(PathBuf::from(args.get(i + 1)?));
                i += 1;
            }
            "--help" | "-h" => return None,
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let (name, rest) = positional.split_first()?;
    let command = match (name.as_str(), rest) {
        ("quote", [postcode, subtotal]) => Command::Quote {
            postcode: postcode.clone(),
            subtotal: subtotal.clone(),
        },
        ("requote", [postcode, subtotal, option_id]) => Command::Requote {
            postcode: postcode.clone(),
            subtotal: subtotal.clone(),
            option_id: option_id.clone(),
        },
        ("tiers", [zone_id, tiers @ ..]) => Command::Tiers {
            zone_id: zone_id.clone(),
            tiers: tiers.to_vec(),
        },
        ("exclude", [list]) => Command::Exclude { list: list.clone() },
        ("zones", []) => Command::Zones,
        ("migrate-legacy", []) => Command::MigrateLegacy,
        _ => return None,
    };

    Some(Args {
        config_path,
        db_path,
        command,
    })
}

fn print_help() {
    println!("Delivery Quote");
    println!();
    println!("Usage: delivery-quote [OPTIONS] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  quote <POSTCODE> <SUBTOTAL>                 Delivery options as JSON");
    println!("  requote <POSTCODE> <SUBTOTAL> <OPTION_ID>   Refresh options, keep selection");
    println!("  tiers <ZONE_ID> <MIN:MAX:COST>...           Validate and replace zone tiers");
    println!("  exclude <LIST>                              Save excluded prefixes (comma-separated)");
    println!("  zones                                       List zones with patterns and tiers");
    println!("  migrate-legacy                              Import the old zone settings blob");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>    Config file (default: platform config dir/delivery.toml)");
    println!("  -d, --db <PATH>        Database file path (overrides config)");
    println!("  -h, --help             Show this help message");
}
