/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use folio_api::{app::{build_router, AppState}, config::Config};
/// use folio_shared::auth::supabase::{SupabaseConfig, SupabaseProvider};
/// use folio_shared::db::memory::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let provider = SupabaseProvider::new(SupabaseConfig {
///     url: config.auth.supabase_url.clone(),
///     anon_key: config.auth.anon_key.clone(),
///     jwt_secret: config.auth.jwt_secret.clone(),
///     request_timeout_seconds: 10,
/// })?;
///
/// let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(provider), config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use folio_shared::{
    auth::{provider::IdentityProvider, session::IdentityResolver},
    db::store::Store,
    services::article::ArticleService,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is reference-counted, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend
    pub store: Arc<dyn Store>,

    /// External identity provider
    pub provider: Arc<dyn IdentityProvider>,

    /// Session gate
    pub identity: IdentityResolver,

    /// Article operations
    pub articles: ArticleService,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Arc<dyn Store>, provider: Arc<dyn IdentityProvider>, config: Config) -> Self {
        let identity = IdentityResolver::new(
            provider.clone(),
            store.clone(),
            config.auth.cookie_name.clone(),
        );

        Self {
            articles: ArticleService::new(store.clone()),
            store,
            provider,
            identity,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health                   # Health check (public)
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /signup          # public
///     │   ├── POST /login           # public, sets session cookie
///     │   ├── POST /logout          # session required
///     │   └── GET  /me              # session required
///     ├── /articles/
///     │   ├── GET    /              # public, ?search=&filter=
///     │   ├── POST   /              # session required
///     │   ├── GET    /:id           # public
///     │   ├── PUT    /:id           # session required
///     │   └── DELETE /:id           # session required
///     └── /editor/
///         └── GET /tree             # session required
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Session gate (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let require_session = from_fn_with_state(state.clone(), session_layer);

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route("/me", get(routes::auth::me))
        .route_layer(require_session.clone())
        .route("/signup", post(routes::auth::signup))
        .route("/login", post(routes::auth::login));

    // Reads are public; writes pass through the session gate
    let article_routes = Router::new()
        .route(
            "/",
            get(routes::articles::list_articles)
                .merge(post(routes::articles::create_article).route_layer(require_session.clone())),
        )
        .route(
            "/:id",
            get(routes::articles::get_article).merge(
                put(routes::articles::update_article)
                    .delete(routes::articles::delete_article)
                    .route_layer(require_session.clone()),
            ),
        );

    let editor_routes = Router::new()
        .route("/tree", get(routes::editor::tree))
        .route_layer(require_session);

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/articles", article_routes)
        .nest("/editor", editor_routes);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// CORS policy from configuration
///
/// With no configured origins any origin may read, but credentials (the
/// session cookie) are only honoured for explicitly listed origins.
fn cors_layer(config: &Config) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    if config.api.cors_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Session gate middleware
///
/// Resolves the caller's session from the session cookie or bearer token,
/// then injects the `Session` into request extensions. Requests without a
/// valid session are answered with 401 before reaching the handler.
async fn session_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = state.identity.require_session(req.headers()).await?;

    tracing::debug!(user_id = %session.user.id, "Session resolved");
    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}
