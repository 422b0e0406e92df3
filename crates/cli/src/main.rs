use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use mcr_core::{
    CoreConfig, LocationService, PatientService, PharmacyService, QueueService, UserService,
};

#[derive(Parser)]
#[command(name = "mcr")]
#[command(about = "Mobile clinic record operator CLI")]
struct Cli {
    /// Database URL (defaults to $DATABASE_URL, then sqlite://mcr.db)
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply schema migrations
    Migrate,
    /// Add a clinic location
    AddLocation {
        /// Location name
        name: String,
    },
    /// List active locations
    Locations,
    /// Create or reactivate a staff account
    AddUser {
        /// Username (>= 3 characters)
        username: String,
    },
    /// List patients registered at a location
    Patients {
        /// Location id
        location_id: i64,
    },
    /// Show the walk-in queue for a location and date
    Queue {
        /// Location id
        location_id: i64,
        /// Visit date (YYYY-MM-DD)
        date: NaiveDate,
    },
    /// List pharmacy stock
    Stock,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let database_url = cli
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite://mcr.db".into());

    let cfg = CoreConfig::new(database_url)?;
    let pool = mcr_core::db::connect(&cfg).await?;
    mcr_core::db::migrate(&pool).await?;

    match cli.command {
        Commands::Migrate => {
            // Migrations already ran above; this subcommand just makes the
            // intent explicit for first-time setup.
            println!("schema is up to date");
        }
        Commands::AddLocation { name } => {
            let location = LocationService::new(pool.clone()).create(&name).await?;
            println!("created location {} (id {})", location.name, location.id);
        }
        Commands::Locations => {
            let locations = LocationService::new(pool.clone()).active().await?;
            if locations.is_empty() {
                println!("no active locations");
            } else {
                for location in locations {
                    println!("{}\t{}", location.id, location.name);
                }
            }
        }
        Commands::AddUser { username } => {
            let user = UserService::new(pool.clone()).login(&username).await?;
            println!("user {} (id {})", user.username, user.id);
        }
        Commands::Patients { location_id } => {
            let patients = PatientService::new(pool.clone())
                .by_location(location_id)
                .await?;
            for row in patients {
                println!(
                    "{}\t{}\t{}",
                    row.patient.id,
                    row.patient.english_name,
                    row.patient.queue_no.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Queue { location_id, date } => {
            let entries = QueueService::new(pool.clone())
                .by_location_and_date(location_id, date)
                .await?;
            for entry in entries {
                println!(
                    "{}\t{}\t{}",
                    entry.queue_no, entry.english_name, entry.arrived_at
                );
            }
        }
        Commands::Stock => {
            let items = PharmacyService::new(pool.clone()).list().await?;
            for item in items {
                println!("{}\t{}\t{}", item.id, item.name, item.stock_level);
            }
        }
    }

    pool.close().await;
    Ok(())
}
