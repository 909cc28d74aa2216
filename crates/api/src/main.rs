use hirewire_core::catalog::seed_default_plans;
use hirewire_core::clock::SystemClock;
use hirewire_core::config::Settings;
use hirewire_core::store::PlanCatalog;
use hirewire_db::PgStore;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

mod error;
mod middleware;
mod routes;
mod state;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let settings = Settings::from_env()
        .map_err(|err| anyhow::anyhow!("DATABASE_URL and HIREWIRE_SERVICE_TOKEN must be set: {err}"))?;

    let db = PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .connect(&settings.database_url)
        .await?;

    hirewire_db::MIGRATOR.run(&db).await?;
    info!("migrations applied");

    let store = Arc::new(PgStore::new(db));
    if settings.seed_plans {
        let catalog: Arc<dyn PlanCatalog> = store.clone();
        seed_default_plans(&catalog).await?;
    }

    let addr: SocketAddr = settings.api_bind.parse()?;
    let env = settings.hirewire_env.clone();
    let production = settings.is_production();

    let state = AppState::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store,
        Arc::new(SystemClock),
        settings,
    );
    let app = routes::app(state);

    info!(%addr, env = %env, production, "starting api");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
