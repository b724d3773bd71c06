//! # Seed Data
//!
//! Creates the default delivery configuration for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./delivery_dev.db
//! cargo run -p delivery-db --bin seed
//!
//! # Specify database path
//! cargo run -p delivery-db --bin seed -- --db ./data/delivery.db
//! ```
//!
//! ## Seeded Zones
//! | Zone              | Patterns | Tiers                                   |
//! |-------------------|----------|-----------------------------------------|
//! | Zone 1 - Local    | CF       | £0-£100 → £20, £100.01-£999999.99 → £10 |
//! | Zone 2 - Regional | B, M     | £0-£200 → £30, £200.01-£999999.99 → £15 |

use std::env;

use delivery_core::validation::validate_tiers;
use delivery_core::{ProposedTier, ZoneDraft};
use delivery_db::{Database, DbConfig};

struct SeedZone {
    name: &'static str,
    delivery_time: &'static str,
    description: &'static str,
    patterns: &'static [&'static str],
    tiers: &'static [&'static str],
}

const ZONES: &[SeedZone] = &[
    SeedZone {
        name: "Zone 1 - Local",
        delivery_time: "1-2 working days",
        description: "Local delivery area",
        patterns: &["CF"],
        tiers: &["0:100:20", "100.01:999999.99:10"],
    },
    SeedZone {
        name: "Zone 2 - Regional",
        delivery_time: "2-3 working days",
        description: "Regional delivery area",
        patterns: &["B", "M"],
        tiers: &["0:200:30", "200.01:999999.99:15"],
    },
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./delivery_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Delivery Seed Data");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./delivery_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Delivery Seed Data");
    println!("=====================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.zones().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} zones", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    for seed in ZONES {
        let mut draft = ZoneDraft::new(seed.name, seed.patterns.iter().map(|p| p.to_string()).collect());
        draft.delivery_time = seed.delivery_time.to_string();
        draft.description = seed.description.to_string();

        let proposed = seed
            .tiers
            .iter()
            .map(|entry| entry.parse::<ProposedTier>())
            .collect::<Result<Vec<_>, _>>()?;
        let tiers = validate_tiers(&proposed)?;

        let zone_id = db.zones().save(None, &draft).await?;
        db.tiers().replace_for_zone(zone_id, &tiers).await?;

        println!(
            "  + {} (#{}) patterns {:?}, {} tiers",
            seed.name,
            zone_id,
            seed.patterns,
            tiers.len()
        );
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
