use anyhow::Context;
use sagfo_api::{app, AppState, AuthConfig};
use sagfo_core::{Ports, Services};
use sagfo_store::app_config::Config;
use sagfo_store::{
    DbClient, HttpObjectStorage, StoreCartCache, StoreEquipmentRepository, StoreOrderRepository,
    StoreSiteConfigRepository, StoreUserRepository,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sagfo_api=debug,sagfo_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("failed to load configuration")?;
    tracing::info!("Starting SAGFO API on port {}", config.server.port);

    let ports = build_ports(&config).await?;
    let services = Services::new(ports, config.business_rules.rules(), config.auth.bcrypt_cost);

    if let Some(admin) = &config.auth.bootstrap_admin {
        let profile = services
            .accounts
            .ensure_admin(&admin.name, &admin.email, &admin.password)
            .await
            .context("failed to create the bootstrap administrator")?;
        tracing::info!(user_id = %profile.id, "Bootstrap administrator ready");
    }

    let app_state = AppState {
        services,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn build_ports(config: &Config) -> anyhow::Result<Ports> {
    let mut ports = Ports::in_memory();

    match &config.database.url {
        Some(url) => {
            let db = DbClient::connect(url, config.database.max_connections)
                .await
                .context("failed to connect to PostgreSQL")?;
            db.migrate().await.context("failed to run migrations")?;

            ports.equipment = Arc::new(StoreEquipmentRepository::new(db.pool.clone()));
            ports.orders = Arc::new(StoreOrderRepository::new(db.pool.clone()));
            ports.users = Arc::new(StoreUserRepository::new(db.pool.clone()));
            ports.site = Arc::new(StoreSiteConfigRepository::new(db.pool.clone()));
            ports.carts = Arc::new(StoreCartCache::new(db.pool.clone()));
        }
        None => tracing::warn!("database.url is not set; data lives in memory and is lost on restart"),
    }

    match &config.storage.base_url {
        Some(base_url) => {
            let storage = HttpObjectStorage::new(
                base_url,
                config.storage.public_base_url.as_deref(),
                config.storage.token.clone(),
            )
            .context("failed to build the object storage client")?;
            ports.storage = Arc::new(storage);
        }
        None => tracing::warn!("storage.base_url is not set; uploads are kept in memory"),
    }

    Ok(ports)
}
