/// Database layer for Folio
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: Embedded schema migrations
/// - `store`: The persistence interface (`Store`, `StoreError`)
/// - `postgres`: `PgStore`, the production store
/// - `memory`: `MemoryStore`, an in-process store with identical constraints
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use folio_shared::db::pool::{create_pool, DatabaseConfig};
/// use folio_shared::db::migrations::run_migrations;
/// use folio_shared::db::postgres::PgStore;
/// use folio_shared::db::store::Store;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     run_migrations(&pool).await?;
///
///     let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
///     Ok(())
/// }
/// ```

pub mod memory;
pub mod migrations;
pub mod pool;
pub mod postgres;
pub mod store;
