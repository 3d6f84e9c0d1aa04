//! # Seed Data Generator
//!
//! Populates a shop with a product catalogue and a few suppliers for
//! development.
//!
//! ## Usage
//! ```bash
//! # Create a "Seed Store" shop and give it 500 products (default)
//! cargo run -p tillbook-db --bin seed
//!
//! # Seed an existing shop
//! cargo run -p tillbook-db --bin seed -- --shop <SHOP_ID> --count 2000
//!
//! # Specify database path
//! cargo run -p tillbook-db --bin seed -- --db ./data/tillbook.db
//! ```
//!
//! A shop created here has a locked password hash, so nobody can log in to
//! it; seed an account you signed up through the API to use the data.
//!
//! Each product has:
//! - SKU: `{CATEGORY}-{NAME}-{INDEX}`
//! - Name with pack size
//! - Price: ₹19.00 - ₹99.00 plus a pack-size addon
//! - Cost: 60-80% of price
//! - Stock: 0 - 100

use std::env;

use chrono::Utc;
use tillbook_core::catalog::{NewProduct, NewSupplier};
use tillbook_core::tenant::ShopRegistration;
use tillbook_db::{Database, DbConfig};

/// Product categories for realistic test data
const CATEGORIES: &[(&str, &str, &[&str])] = &[
    (
        "BEV",
        "Beverages",
        &[
            "Masala Chai", "Filter Coffee", "Mango Drink", "Lemon Soda", "Buttermilk",
            "Coconut Water", "Cola", "Orange Juice", "Mineral Water", "Green Tea",
        ],
    ),
    (
        "SNK",
        "Snacks",
        &[
            "Potato Chips", "Banana Chips", "Bhujia", "Peanut Chikki", "Khakhra",
            "Cream Biscuits", "Glucose Biscuits", "Namkeen Mix", "Popcorn", "Rusk",
        ],
    ),
    (
        "DRY",
        "Dairy",
        &[
            "Toned Milk", "Full Cream Milk", "Curd", "Paneer", "Butter",
            "Ghee", "Cheese Slices", "Lassi", "Cream", "Khoa",
        ],
    ),
    (
        "GRO",
        "Grocery",
        &[
            "Basmati Rice", "Toor Dal", "Moong Dal", "Wheat Atta", "Besan",
            "Sugar", "Salt", "Mustard Oil", "Sunflower Oil", "Poha",
        ],
    ),
];

/// Pack sizes with their price addon in cents
const SIZES: &[(&str, i64)] = &[
    ("200g", 0),
    ("500g", 2_000),
    ("1kg", 4_500),
    ("5kg", 20_000),
    ("Family Pack", 8_000),
];

const SUPPLIERS: &[(&str, &str)] = &[
    ("Sharma Distributors", "Rakesh Sharma"),
    ("Deccan Dairy Co-op", "Lakshmi Rao"),
    ("Metro Wholesale", "Imran Qureshi"),
];

const BATCH_SIZE: usize = 250;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 500;
    let mut db_path = String::from("./tillbook.db");
    let mut shop_id: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(500);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--shop" | "-s" => {
                if i + 1 < args.len() {
                    shop_id = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tillbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 500)");
                println!("  -d, --db <PATH>    Database file path (default: ./tillbook.db)");
                println!("  -s, --shop <ID>    Seed an existing shop instead of creating one");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tillbook Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let shop = match shop_id {
        Some(id) => db.shops().get(&id).await?,
        None => create_seed_shop(&db).await?,
    };
    println!("✓ Seeding shop {} ({})", shop.name, shop.id);

    let existing = db.products().list(&shop.id).await?.len();
    if existing > 0 {
        println!("⚠ Shop already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Reset the shop's data to regenerate.");
        return Ok(());
    }

    for (name, contact) in SUPPLIERS {
        let supplier = NewSupplier {
            name: name.to_string(),
            contact_person: Some(contact.to_string()),
            ..Default::default()
        };
        db.suppliers().create(&shop.id, &supplier, Utc::now()).await?;
    }
    println!("✓ Created {} suppliers", SUPPLIERS.len());

    println!();
    println!("Generating products...");
    let start = std::time::Instant::now();

    let products = catalogue(count);
    let mut generated = 0;
    for batch in products.chunks(BATCH_SIZE) {
        match db.products().bulk_create(&shop.id, batch, None, &Utc::now()).await {
            Ok(created) => generated += created.len(),
            Err(e) => eprintln!("Failed to insert batch: {}", e),
        }
        println!("  Generated {} products...", generated);
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);
    println!(
        "  Rate: {:.0} products/second",
        generated as f64 / elapsed.as_secs_f64()
    );
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

async fn create_seed_shop(db: &Database) -> Result<tillbook_core::Shop, Box<dyn std::error::Error>> {
    let registration = ShopRegistration {
        shop_name: "Seed Store".to_string(),
        owner_name: "Seed Owner".to_string(),
        email: format!("seed+{}@tillbook.local", Utc::now().timestamp_millis()),
        password: "unused-password".to_string(),
        country: "IN".to_string(),
        ..Default::default()
    };
    // "!" is not a PHC string, so password verification always fails.
    let (shop, _owner) = db.shops().register(&registration, "!", false, Utc::now()).await?;
    Ok(shop)
}

/// Builds up to `count` products across categories and pack sizes.
fn catalogue(count: usize) -> Vec<NewProduct> {
    let mut products = Vec::with_capacity(count);

    'outer: for (category_idx, (code, category, names)) in CATEGORIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, addon)) in SIZES.iter().enumerate() {
                if products.len() >= count {
                    break 'outer;
                }
                let seed = category_idx * 1000 + name_idx * 20 + size_idx;
                products.push(generate_product(code, category, name, size, *addon, seed));
            }
        }
    }

    products
}

/// Generates a single product with realistic data.
fn generate_product(code: &str, category: &str, name: &str, size: &str, price_addon: i64, seed: usize) -> NewProduct {
    let short: String = name.chars().filter(|c| !c.is_whitespace()).take(3).collect();
    let sku = format!("{}-{}-{:03}", code, short.to_uppercase(), seed);

    // base ₹19.00 - ₹99.00 + size addon
    let price_cents = 1_900 + ((seed * 17) % 8_000) as i64 + price_addon;
    let cost_pct = 60 + (seed % 20) as i64;

    NewProduct {
        name: format!("{} {}", name, size),
        category: Some(category.to_string()),
        description: None,
        price_cents,
        cost_price_cents: price_cents * cost_pct / 100,
        stock: (seed % 101) as i64,
        sku: Some(sku),
        barcode: Some(format!("890{:010}", seed)),
    }
}
