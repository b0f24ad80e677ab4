pub mod memory;
pub mod store;
pub mod supabase;

use std::sync::Arc;

use tracing::info;

use shared_config::{AppConfig, StoreBackend};

pub use memory::MemoryStore;
pub use store::{Document, DocumentStore, StoreError, StoreResult};
pub use supabase::{SupabaseClient, SupabaseDocumentStore};

/// Builds the document store selected by `STORE_BACKEND`.
pub fn connect(config: &AppConfig) -> Arc<dyn DocumentStore> {
    match config.store_backend {
        StoreBackend::Supabase => {
            info!("Using Supabase document store at {}", config.supabase_url);
            Arc::new(SupabaseDocumentStore::new(config))
        }
        StoreBackend::Memory => {
            info!("Using in-memory document store");
            Arc::new(MemoryStore::new())
        }
    }
}
