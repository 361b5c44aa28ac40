//! # Catalog Seeder
//!
//! Signs in and writes sample products to the remote catalog for development.
//!
//! ## Usage
//! ```bash
//! # Write 20 products (default) as an existing account
//! VITRINA_SEED_EMAIL=dev@example.com VITRINA_SEED_PASSWORD=secret1 \
//!     cargo run -p vitrina-sync --bin seed
//!
//! # Create the account first, write 50 products
//! cargo run -p vitrina-sync --bin seed -- --register -c 50 \
//!     --email dev@example.com --password secret1
//!
//! # Against the local emulators
//! FIREBASE_AUTH_EMULATOR_HOST=127.0.0.1:9099 FIRESTORE_EMULATOR_HOST=127.0.0.1:8080 \
//!     cargo run -p vitrina-sync --bin seed -- --config ./vitrina.toml
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use vitrina_core::Product;
use vitrina_sync::{
    DocumentStore, FirebaseAuth, FirestoreStore, SessionManager, VitrinaConfig,
};

/// Sample items: (name, description, base price)
const ITEMS: &[(&str, &str, f64)] = &[
    ("Bolígrafo", "Tinta azul, punta fina", 1.5),
    ("Cuaderno", "Tapa dura, 100 hojas", 4.25),
    ("Taza", "Cerámica blanca", 6.0),
    ("Mochila", "Impermeable, 20 litros", 34.9),
    ("Lámpara", "LED de escritorio", 22.5),
    ("Botella", "Acero inoxidable, 750 ml", 12.0),
    ("Auriculares", "Inalámbricos", 49.99),
    ("Agenda", "Semanal", 9.5),
    ("Calculadora", "Científica", 18.75),
    ("Regla", "30 cm", 0.99),
];

/// Variants appended to the item name, with a price addon.
const VARIANTS: &[(&str, f64)] = &[("", 0.0), ("Pro", 5.0), ("Mini", -0.5), ("XL", 3.0)];

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_help() {
    println!("Vitrina Catalog Seeder");
    println!();
    println!("Usage: seed [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --count <N>        Number of products to write (default: 20)");
    println!("      --config <PATH>    Config file (default: platform config dir)");
    println!("      --email <EMAIL>    Account email (or VITRINA_SEED_EMAIL)");
    println!("      --password <PASS>  Account password (or VITRINA_SEED_PASSWORD)");
    println!("      --register         Create the account before writing");
    println!("  -h, --help             Show this help message");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 20;
    let mut config_path: Option<PathBuf> = None;
    let mut email = env::var("VITRINA_SEED_EMAIL").ok();
    let mut password = env::var("VITRINA_SEED_PASSWORD").ok();
    let mut register = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--email" => {
                if i + 1 < args.len() {
                    email = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--password" => {
                if i + 1 < args.len() {
                    password = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--register" => register = true,
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    let (Some(email), Some(password)) = (email, password) else {
        eprintln!("An account is required: pass --email and --password");
        eprintln!("or set VITRINA_SEED_EMAIL and VITRINA_SEED_PASSWORD.");
        std::process::exit(2);
    };

    let config = match VitrinaConfig::load(config_path) {
        Ok(config) => config,
        Err(e) if e.is_config_error() => {
            eprintln!("✗ {}", e);
            eprintln!("Check the [firebase] section of the config file.");
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    println!("Vitrina Catalog Seeder");
    println!("======================");
    println!("Project:    {}", config.firebase.project_id);
    println!("Collection: {}", config.catalog.collection);
    println!("Products:   {}", count);
    println!();

    let auth = Arc::new(FirebaseAuth::from_config(&config)?);
    let session = SessionManager::new(auth.clone());

    let signed_in = if register {
        session.register(&email, &password).await
    } else {
        session.login(&email, &password).await
    };
    let identity = match signed_in {
        Ok(identity) => identity,
        Err(e) => {
            eprintln!("✗ {}", e.user_message());
            std::process::exit(1);
        }
    };
    println!("✓ Signed in as {}", identity.email);

    let store = FirestoreStore::from_config(&config, Some(auth))?;
    let collection = &config.catalog.collection;

    let start = std::time::Instant::now();
    let mut written = 0;
    let mut failed = 0;

    for n in 0..count {
        let product = sample_product(n);
        match store.add(collection, product.to_fields()).await {
            Ok(id) => {
                written += 1;
                println!("  + {} ({:.2}) → {}", product.name, product.price, id);
            }
            Err(e) if e.invalidates_session() => {
                eprintln!("  ✗ {}: {}", product.name, e);
                eprintln!("Session ended by the provider; sign in again.");
                std::process::exit(1);
            }
            Err(e) => {
                failed += 1;
                eprintln!("  ✗ {}: {}", product.name, e);
            }
        }
    }

    println!();
    println!("✓ Wrote {} products in {:?}", written, start.elapsed());
    if failed > 0 {
        println!("⚠ {} products failed", failed);
    }

    let listed = store.list(collection).await?;
    println!("  Collection now holds {} documents", listed.len());

    session.logout();
    Ok(())
}

/// Builds the `n`th sample product, cycling items then variants.
fn sample_product(n: usize) -> Product {
    let (name, description, base) = ITEMS[n % ITEMS.len()];
    let (variant, addon) = VARIANTS[(n / ITEMS.len()) % VARIANTS.len()];

    let name = if variant.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", name, variant)
    };
    let price = ((base + addon).max(0.0) * 100.0).round() / 100.0;
    let image_url = if n % 3 == 2 {
        String::new()
    } else {
        format!("https://picsum.photos/seed/vitrina-{}/400", n)
    };

    Product::new(name, price, description, image_url)
}
