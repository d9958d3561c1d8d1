//! Wiring: shared state from config, and the HTTP router around it.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method},
    routing::get,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::auth::{self, Credentials, PasswordHasher, TokenService};
use crate::catalog;
use crate::config::{Config, Cors, Server};
use crate::db::Database;
use crate::handler::{AccessPolicy, AppState, healthcheck};
use crate::transfer;

/// Opens storage, prepares the token service and seeds the admin account.
/// Fails when no signing secret is configured.
pub async fn build_state(cfg: &Config) -> Result<AppState> {
    let secret = cfg
        .auth
        .jwt_secret()
        .context("no token signing secret configured (set auth.jwt_secret or LINKDECK_JWT_SECRET)")?;
    let tokens = TokenService::new(secret, cfg.auth.token_ttl())?;
    let passwords = PasswordHasher::new(cfg.auth.password_hash)?;

    let db = Database::new(cfg).await.context("failed to setup database")?;
    {
        let conn = db.connect().await?;
        Credentials::new(&conn, &passwords)
            .ensure_admin(&cfg.auth.admin_username, cfg.auth.admin_password())
            .await?;
    }

    Ok(AppState {
        db: Arc::new(db),
        tokens: Arc::new(tokens),
        passwords,
        access: AccessPolicy {
            public_links: cfg.auth.public_links,
            empty_list_on_missing_auth: cfg.auth.empty_list_on_missing_auth,
        },
    })
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(healthcheck))
        .merge(auth::routes())
        .merge(catalog::routes())
        .merge(transfer::routes())
}

/// The full service. Unknown paths fall through to the built UI when a
/// static directory is present and `dev` is off.
pub fn router(state: AppState, server: &Server, dev: bool) -> Result<Router> {
    let mut app = Router::new().nest("/api", api_routes());

    if !dev {
        if let Some(dir) = server.static_dir.as_deref().map(Path::new).filter(|d| d.is_dir()) {
            tracing::info!(dir = %dir.display(), "serving static files");
            let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
            app = app.fallback_service(spa);
        }
    }

    Ok(app
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&server.cors)?),
        )
        .with_state(state))
}

fn cors_layer(cors: &Cors) -> Result<CorsLayer> {
    let origin = if cors.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins = cors
            .allowed_origins
            .iter()
            .map(|o| HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin '{o}'")))
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    let methods = cors
        .allowed_methods
        .iter()
        .map(|m| Method::from_bytes(m.as_bytes()).with_context(|| format!("invalid CORS method '{m}'")))
        .collect::<Result<Vec<_>>>()?;

    let headers = if cors.allowed_headers.iter().any(|h| h == "*") {
        AllowHeaders::any()
    } else {
        let headers = cors
            .allowed_headers
            .iter()
            .map(|h| HeaderName::from_bytes(h.as_bytes()).with_context(|| format!("invalid CORS header '{h}'")))
            .collect::<Result<Vec<_>>>()?;
        AllowHeaders::list(headers)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(methods)
        .allow_headers(headers))
}
