//! # Seed Data Generator
//!
//! Populates the partition files with workers, tools and consumables for
//! development.
//!
//! ## Usage
//! ```bash
//! # 20 workers, 50 tools, 30 consumables (defaults)
//! cargo run -p toolcrib-db --bin seed
//!
//! # Custom amounts and data directory
//! cargo run -p toolcrib-db --bin seed -- --dir ./data --workers 40 --tools 120 --consumables 60
//! ```
//!
//! ## Generated Data
//! - Workers spread over departments, barcodes `W-0001`...
//! - Tools from woodworking, metalworking and electrical catalogs, barcodes
//!   `T-0001`...; every seventh tool starts defective
//! - Consumables with realistic units and minimum stocks, some already
//!   below their minimum, barcodes `C-0001`...
//!
//! Values are derived from the index, so two runs produce the same data.

use chrono::Utc;
use std::env;
use toolcrib_core::{plan_transition, NewConsumable, NewTool, NewWorker, ToolStatus};
use toolcrib_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

const FIRST_NAMES: &[&str] = &[
    "Alexander", "Benjamin", "Clara", "Daniel", "Erik", "Florian", "Greta", "Hannah",
    "Isabel", "Jonas", "Katharina", "Lukas", "Marie", "Nina", "Oskar", "Paula",
];

const LAST_NAMES: &[&str] = &[
    "Becker", "Fischer", "Hoffmann", "Klein", "Koch", "Meyer", "Richter", "Schmidt",
    "Schneider", "Schulz", "Wagner", "Weber", "Wolf", "Zimmermann",
];

/// Department with its relative weight.
const DEPARTMENTS: &[(&str, usize)] = &[
    ("Engineering", 40),
    ("Commercial", 15),
    ("Administration", 15),
    ("Media", 10),
    ("Service", 10),
    ("Apprentices", 10),
];

/// (description, location, category)
const TOOLS: &[(&str, &str, &str)] = &[
    ("Cordless screwdriver Bosch", "Wood shop", "Power tools"),
    ("Circular saw Makita", "Wood shop", "Power tools"),
    ("Jigsaw DeWalt", "Wood shop", "Power tools"),
    ("Hand plane", "Wood shop", "Hand tools"),
    ("Orbital sander Festool", "Wood shop", "Power tools"),
    ("Chisel set", "Wood shop", "Hand tools"),
    ("Mallet", "Wood shop", "Hand tools"),
    ("Router Festool", "Wood shop", "Power tools"),
    ("Welding machine", "Metal shop", "Power tools"),
    ("Angle grinder Bosch", "Metal shop", "Power tools"),
    ("Hacksaw", "Metal shop", "Hand tools"),
    ("File set", "Metal shop", "Hand tools"),
    ("Tin snips", "Metal shop", "Hand tools"),
    ("Plasma cutter", "Metal shop", "Power tools"),
    ("Drill bit set HSS", "Metal shop", "Accessories"),
    ("Multimeter Fluke", "Electrical", "Measuring"),
    ("Voltage tester", "Electrical", "Measuring"),
    ("Crimping pliers", "Electrical", "Hand tools"),
    ("Wire stripper", "Electrical", "Hand tools"),
    ("Soldering station Weller", "Electrical", "Power tools"),
];

/// (description, category, initial stock, minimum stock, unit)
const CONSUMABLES: &[(&str, &str, i64, i64, &str)] = &[
    ("Safety glasses", "PPE", 50, 20, "piece"),
    ("Work gloves size L", "PPE", 100, 30, "pair"),
    ("Work gloves size M", "PPE", 100, 30, "pair"),
    ("Ear protection", "PPE", 30, 10, "piece"),
    ("Dust mask FFP2", "PPE", 200, 50, "piece"),
    ("Sandpaper grit 80", "Wood", 100, 30, "sheet"),
    ("Sandpaper grit 120", "Wood", 100, 30, "sheet"),
    ("Wood glue", "Wood", 20, 5, "bottle"),
    ("Wood screws 4x30", "Wood", 1000, 200, "piece"),
    ("Welding wire 1.0mm", "Metal", 20, 5, "roll"),
    ("Cutting disc 125mm", "Metal", 50, 15, "piece"),
    ("Coolant", "Metal", 10, 3, "litre"),
    ("Cable ties 200mm", "Electrical", 500, 100, "piece"),
    ("Insulating tape", "Electrical", 40, 10, "roll"),
    ("Wire end ferrules 1.5mm", "Electrical", 1000, 250, "piece"),
];

struct Args {
    dir: String,
    workers: usize,
    tools: usize,
    consumables: usize,
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = env::args().collect();

    let mut parsed = Args {
        dir: String::from("./data"),
        workers: 20,
        tools: 50,
        consumables: 30,
    };

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--dir" | "-d", Some(v)) => {
                parsed.dir = v.clone();
                i += 1;
            }
            ("--workers" | "-w", Some(v)) => {
                parsed.workers = v.parse().unwrap_or(parsed.workers);
                i += 1;
            }
            ("--tools" | "-t", Some(v)) => {
                parsed.tools = v.parse().unwrap_or(parsed.tools);
                i += 1;
            }
            ("--consumables" | "-c", Some(v)) => {
                parsed.consumables = v.parse().unwrap_or(parsed.consumables);
                i += 1;
            }
            ("--help" | "-h", _) => {
                println!("Toolcrib Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --dir <PATH>          Data directory (default: ./data)");
                println!("  -w, --workers <N>         Workers to generate (default: 20)");
                println!("  -t, --tools <N>           Tools to generate (default: 50)");
                println!("  -c, --consumables <N>     Consumables to generate (default: 30)");
                println!("  -h, --help                Show this help message");
                return None;
            }
            _ => {}
        }
        i += 1;
    }

    Some(parsed)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,toolcrib=debug,sqlx=warn")),
        )
        .init();

    let Some(args) = parse_args() else {
        return Ok(());
    };

    println!("🌱 Toolcrib Seed Data Generator");
    println!("===============================");
    println!("Data dir:    {}", args.dir);
    println!("Workers:     {}", args.workers);
    println!("Tools:       {}", args.tools);
    println!("Consumables: {}", args.consumables);
    println!();

    let db = Database::new(DbConfig::new(&args.dir)).await?;
    println!("✓ Partitions opened, migrations applied");

    let existing = db.workers().count().await? + db.tools().count().await?;
    if existing > 0 {
        println!("⚠ Data directory already has {} workers/tools", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the partition files to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    let mut workers = 0;
    for i in 0..args.workers {
        let worker = generate_worker(i);
        match db.workers().insert(&worker, "seed").await {
            Ok(_) => workers += 1,
            Err(e) => eprintln!("Failed to insert {}: {}", worker.barcode, e),
        }
    }
    println!("✓ {} workers", workers);

    let mut tools = 0;
    for i in 0..args.tools {
        let (tool, location) = generate_tool(i);
        if let Err(e) = db.tools().insert(&tool, location, "seed").await {
            eprintln!("Failed to insert {}: {}", tool.barcode, e);
            continue;
        }
        tools += 1;

        if i % 7 == 6 {
            if let Some(plan) = plan_transition(ToolStatus::Available, ToolStatus::Defective, Utc::now()) {
                db.tools()
                    .compare_and_set_status(&tool.barcode, &plan, Some("seeded as defective"), "seed")
                    .await?;
            }
        }
    }
    println!("✓ {} tools", tools);

    let mut consumables = 0;
    for i in 0..args.consumables {
        let (consumable, location, unit) = generate_consumable(i);
        match db.consumables().insert(&consumable, location, unit).await {
            Ok(_) => consumables += 1,
            Err(e) => eprintln!("Failed to insert {}: {}", consumable.barcode, e),
        }
    }
    println!("✓ {} consumables", consumables);

    println!();
    println!("✓ Seed complete in {:?}", start.elapsed());

    Ok(())
}

fn generate_worker(i: usize) -> NewWorker {
    let name = FIRST_NAMES[i % FIRST_NAMES.len()];
    let lastname = LAST_NAMES[(i * 7 + i / LAST_NAMES.len()) % LAST_NAMES.len()];

    NewWorker {
        barcode: format!("W-{:04}", i + 1),
        name: name.to_string(),
        lastname: lastname.to_string(),
        department: Some(pick_department(i).to_string()),
        email: Some(format!(
            "{}.{}{}@example.com",
            name.to_lowercase(),
            lastname.to_lowercase(),
            i + 1
        )),
    }
}

/// Weighted pick, cycling through 100 slots.
fn pick_department(i: usize) -> &'static str {
    let mut slot = (i * 37) % 100;
    for (department, weight) in DEPARTMENTS {
        if slot < *weight {
            return department;
        }
        slot -= weight;
    }
    DEPARTMENTS[0].0
}

fn generate_tool(i: usize) -> (NewTool, &'static str) {
    let (description, location, category) = TOOLS[i % TOOLS.len()];
    let copy = i / TOOLS.len();

    let description = if copy == 0 {
        description.to_string()
    } else {
        format!("{} #{}", description, copy + 1)
    };

    let tool = NewTool {
        barcode: format!("T-{:04}", i + 1),
        description,
        location: Some(location.to_string()),
        category: Some(category.to_string()),
        image_ref: None,
    };
    (tool, location)
}

fn generate_consumable(i: usize) -> (NewConsumable, &'static str, &'static str) {
    let (description, category, stock, minimum, unit) = CONSUMABLES[i % CONSUMABLES.len()];
    let copy = i / CONSUMABLES.len();

    // Every fourth item starts at or below its minimum
    let initial_stock = if i % 4 == 3 { minimum / 2 } else { stock };

    let consumable = NewConsumable {
        barcode: format!("C-{:04}", i + 1),
        description: if copy == 0 {
            description.to_string()
        } else {
            format!("{} ({})", description, copy + 1)
        },
        location: Some("Store room".to_string()),
        category: Some(category.to_string()),
        unit: Some(unit.to_string()),
        minimum_stock: minimum,
        initial_stock,
    };
    (consumable, "Store room", unit)
}
