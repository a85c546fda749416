pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

use std::sync::Arc;

// Export API types
pub use api::{Bound, BindingRouter};

pub use error::{BindResult, BindingError};

// Export the binding engine
pub use logic::{
    BindingEngine, BindingRegistry, BoundArgs, BoundValue, HandlerId, ResolvedBinding,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{MemoryStore, ModelStore, PostgresStore};

use crate::config::{AppConfig, StoreBackend};

/// Build the blog application on top of any store
pub fn build_app(store: Arc<dyn ModelStore>, verify: bool) -> anyhow::Result<axum::Router> {
    let registry = Arc::new(api::routes::blog_registry()?);
    let engine = Arc::new(BindingEngine::new(registry, store));
    Ok(api::routes::create_router(engine, verify)?)
}

/// Connect the configured store, seeding it when asked to
pub async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ModelStore>> {
    match config.database.backend {
        StoreBackend::Memory => {
            log::info!("Using in-memory store");
            let store = MemoryStore::new();
            if config.binding.seed {
                seed::load_seed_data(&store).await?;
            }
            Ok(Arc::new(store))
        }
        StoreBackend::Postgres => {
            log::info!("Connecting to PostgreSQL...");
            let store =
                PostgresStore::new(&config.database_url(), config.max_connections()).await?;
            store.migrate().await?;
            if config.binding.seed {
                seed::load_seed_data(&store).await?;
            }
            Ok(Arc::new(store))
        }
    }
}
