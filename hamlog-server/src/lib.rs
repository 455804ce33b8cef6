//! hamlog-server library
//!
//! Personal amateur radio logbook service: accounts, QSO log, ADIF export,
//! cached callsign lookup and free-text QSO extraction.

use axum::Router;
use chrono::{DateTime, Utc};
use hamlog_common::config::TomlConfig;
use sqlx::SqlitePool;
use std::sync::Arc;

pub mod api;
pub mod db;
pub mod error;
pub mod services;

use api::rate_limit::{client_rate_limiter, ClientRateLimiter};
use services::{
    AnthropicClient, CallsignLookupService, CompletionModel, DirectoryApi, DirectorySession,
    HamQthClient, QsoExtractor,
};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub callsigns: CallsignLookupService,
    pub extractor: QsoExtractor,
    /// Lifetime of newly issued bearer tokens
    pub token_lifetime: chrono::Duration,
    /// `None` disables rate limiting
    pub rate_limiter: Option<Arc<ClientRateLimiter>>,
    pub cors_origins: Vec<String>,
    /// Service start, for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// State with default limits around the given upstreams
    pub fn new(
        db: SqlitePool,
        directory: Arc<dyn DirectoryApi>,
        model: Option<Arc<dyn CompletionModel>>,
    ) -> Self {
        let defaults = TomlConfig::default();
        let session = Arc::new(DirectorySession::new(directory));

        Self {
            callsigns: CallsignLookupService::new(db.clone(), session),
            extractor: QsoExtractor::new(model),
            db,
            token_lifetime: chrono::Duration::seconds(defaults.auth.token_lifetime_seconds),
            rate_limiter: client_rate_limiter(defaults.server.rate_limit_per_minute),
            cors_origins: defaults.server.cors_origins,
            startup_time: Utc::now(),
        }
    }

    /// Build state with real upstream clients from configuration
    pub fn from_config(db: SqlitePool, config: &TomlConfig) -> anyhow::Result<Self> {
        let directory = HamQthClient::new(&config.hamqth.base_url, config.hamqth_credentials())?;

        let model: Option<Arc<dyn CompletionModel>> = match config.llm_api_key() {
            Some(key) => Some(Arc::new(AnthropicClient::new(
                key,
                &config.llm.model,
                config.llm.max_tokens,
                &config.llm.base_url,
            )?)),
            None => None,
        };

        Ok(Self::new(db, Arc::new(directory), model)
            .with_token_lifetime(config.auth.token_lifetime_seconds)
            .with_rate_limit(config.server.rate_limit_per_minute)
            .with_cors_origins(config.server.cors_origins.clone()))
    }

    pub fn with_token_lifetime(mut self, seconds: i64) -> Self {
        self.token_lifetime = chrono::Duration::seconds(seconds);
        self
    }

    /// Requests per minute per client IP; 0 disables limiting
    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limiter = client_rate_limiter(per_minute);
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }
}

/// Build application router
///
/// `/health` is public and not rate limited. `/auth/register` and
/// `/auth/login` are public; everything else requires a bearer token.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};
    use tower_http::trace::TraceLayer;

    let protected = Router::new()
        .route("/auth/logout", post(api::auth::logout))
        .route("/users/me", get(api::auth::me))
        .route("/qso", post(api::qso::create_qso).get(api::qso::list_qsos))
        .route("/qso/export", get(api::export::export_adif))
        .route(
            "/qso/:id",
            get(api::qso::get_qso)
                .put(api::qso::replace_qso)
                .delete(api::qso::delete_qso),
        )
        .route("/parse", post(api::parse::parse_text))
        .route("/callsign/:callsign", get(api::callsign::lookup_callsign))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::require_user,
        ));

    let public = Router::new()
        .route("/auth/register", post(api::auth::register))
        .route("/auth/login", post(api::auth::login));

    let limited = Router::new()
        .merge(protected)
        .merge(public)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::rate_limit::rate_limit_middleware,
        ));

    Router::new()
        .merge(limited)
        .merge(api::health::health_routes())
        .layer(api::cors_layer(&state.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
