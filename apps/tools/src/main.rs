use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use shared::domain::{
    CategoryCode, Dispensary, DispensaryCode, PostalAddress, MAX_DISPENSARY_CODE_CHARS,
};
use storage::{NewMedicine, SeedOutcome, Storage};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/pharmacy.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the demo catalog into an empty database.
    Seed,
    AddCategory {
        label: String,
        #[arg(long)]
        description: Option<String>,
    },
    AddMedicine {
        category: i64,
        name: String,
        #[arg(long, default_value_t = 0)]
        stock: i64,
        #[arg(long, default_value_t = 0)]
        reorder_level: i64,
        #[arg(long)]
        unit_price: Option<f64>,
    },
    AddDispensary {
        code: String,
        name: String,
        #[arg(long)]
        city: Option<String>,
    },
    ListCategories,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::Seed => match storage.seed_demo_data().await? {
            SeedOutcome::Seeded {
                categories,
                medicines,
            } => println!("seeded {categories} categories and {medicines} medicines"),
            SeedOutcome::AlreadyPopulated => println!("catalog already populated, nothing to do"),
        },
        Command::AddCategory { label, description } => {
            let code = storage
                .create_category(&label, description.as_deref())
                .await?;
            println!("created category code={}", code.0);
        }
        Command::AddMedicine {
            category,
            name,
            stock,
            reorder_level,
            unit_price,
        } => {
            let mut medicine =
                NewMedicine::new(name, CategoryCode(category)).with_stock(stock, reorder_level);
            medicine.unit_price = unit_price;
            let reference = storage.create_medicine(&medicine).await?;
            println!("created medicine reference={}", reference.0);
        }
        Command::AddDispensary { code, name, city } => {
            if code.is_empty() || code.chars().count() > MAX_DISPENSARY_CODE_CHARS {
                bail!("dispensary code must be 1 to {MAX_DISPENSARY_CODE_CHARS} characters");
            }
            storage
                .create_dispensary(&Dispensary {
                    code: DispensaryCode::new(code.clone()),
                    name,
                    contact: None,
                    title: None,
                    address: PostalAddress {
                        city,
                        ..PostalAddress::default()
                    },
                    phone: None,
                    fax: None,
                })
                .await?;
            println!("created dispensary code={code}");
        }
        Command::ListCategories => {
            for category in storage.list_categories().await? {
                println!(
                    "{}\t{}\t{} medicines",
                    category.code.0,
                    category.label,
                    category.medicines.len()
                );
            }
        }
    }

    Ok(())
}
