/// Authentication for Folio
///
/// Folio delegates accounts and credentials to an external identity provider.
/// This module verifies the provider's session tokens and maps them onto local
/// user records.
///
/// # Modules
///
/// - `jwt`: Session token claims and HS256 validation
/// - `provider`: The `IdentityProvider` interface
/// - `supabase`: GoTrue-backed provider implementation
/// - `session`: `IdentityResolver`, the gate in front of every mutation
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use folio_shared::auth::session::IdentityResolver;
/// use folio_shared::auth::supabase::{SupabaseConfig, SupabaseProvider};
/// use folio_shared::db::memory::MemoryStore;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = SupabaseProvider::new(SupabaseConfig {
///     url: "https://project.supabase.co".to_string(),
///     anon_key: "anon-key".to_string(),
///     jwt_secret: "project-jwt-secret".to_string(),
///     request_timeout_seconds: 10,
/// })?;
///
/// let resolver = IdentityResolver::new(
///     Arc::new(provider),
///     Arc::new(MemoryStore::new()),
///     "sb-access-token",
/// );
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod provider;
pub mod session;
pub mod supabase;
