use dotenvy::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vigolend::{
    config::{database, seed, settings::Settings},
    core::{location, team},
    errors::Result,
    storage::DocumentStore,
    web,
};

#[actix_web::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Resolve settings
    let settings = Settings::from_env()
        .inspect_err(|e| error!("Invalid settings: {}", e))?;

    // 4. Connect and ensure the schema
    let db = database::create_connection(&settings.database_url)
        .await
        .inspect(|_| info!("Database connection established."))
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    // 5. Seed reference data when a seed file is present
    if settings.seed_config.exists() {
        let seed_config = seed::load_config(&settings.seed_config)?;
        location::seed_locations(&db, &seed_config.countries)
            .await
            .inspect_err(|e| error!("Failed to seed locations: {}", e))?;
        team::seed_team_members(&db, &seed_config.team_members)
            .await
            .inspect_err(|e| error!("Failed to seed team members: {}", e))?;
    } else {
        warn!(
            "Seed file {} not found, skipping seeding",
            settings.seed_config.display()
        );
    }

    // 6. Serve
    let store = DocumentStore::new(settings.upload_root.clone());
    web::run_server(&settings, db, store).await
}
