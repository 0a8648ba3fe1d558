use drone_academy::{
    api::{self, AppState},
    cache::{CatalogCache, CatalogSnapshot},
    config::{self, bootstrap::BootstrapAdmin},
    errors::Result,
    services::{AssistantClient, StorageClient},
};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
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

    // 3. Load the main application configuration
    let app_config = config::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Connect and make sure the schema exists
    let db = config::database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    config::database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Ensure the administrator profile
    match BootstrapAdmin::from_env()? {
        Some(admin) => {
            config::bootstrap::ensure_admin(&db, &admin).await?;
        }
        None => info!("BOOTSTRAP_ADMIN_EMAIL not set; skipping admin bootstrap."),
    }

    // 6. Catalog cache, with the static snapshot if one is configured
    let mut catalog = CatalogCache::new(app_config.catalog.cache_ttl());
    if let Some(path) = &app_config.catalog.fallback_snapshot {
        match CatalogSnapshot::load(path) {
            Ok(snapshot) => catalog = catalog.with_fallback(snapshot),
            Err(e) => warn!("Ignoring catalog snapshot {}: {}", path.display(), e),
        }
    }

    // 7. Serve
    let state = Arc::new(AppState {
        db,
        catalog,
        assistant: AssistantClient::from_env(&app_config.assistant),
        storage: StorageClient::from_env(&app_config.storage),
    });
    api::serve(state, &app_config.server.bind_address).await
}
