use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{any, get},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, warn, Span};
use ulid::Ulid;

pub mod handlers;
pub mod password;
pub mod properties;
pub mod security;
pub mod tokens;
pub mod users;

mod openapi;
pub use openapi::openapi;

use self::{
    password::{Argon2PasswordEncoder, PasswordEncoder},
    properties::{
        SecurityProperties, DEFAULT_UNAUTHENTICATION_URL, HEALTH_URL, OPENAPI_URL, USER_ME_URL,
    },
    security::{CodeValidators, SecurityState},
    tokens::PgTokenRepository,
    users::{DemoUserDetailsService, PgUserDetailsService, UserDetailsService, UserStore},
};

/// Startup choices that are not part of the security configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub user_store: UserStore,
    pub create_token_table: bool,
}

/// Build the application router around `state`.
///
/// Everything except `/health` and `/openapi.json` sits behind the security
/// chain, including the fallback, so unknown paths are challenged too.
pub fn router(state: Arc<SecurityState>) -> Router {
    let login_page = state.properties().browser().login_page().to_string();

    let secured = Router::new()
        .route(
            DEFAULT_UNAUTHENTICATION_URL,
            any(handlers::require_authentication),
        )
        .route(USER_ME_URL, get(handlers::me))
        .route(&login_page, get(handlers::sign_in));

    security::apply(secured, state.clone())
        .route(HEALTH_URL, get(handlers::health).options(handlers::health))
        .route(OPENAPI_URL, get(handlers::openapi_json))
        .layer(Extension(state))
}

/// Start the server
/// # Errors
/// Return error if the database is unreachable or the server fails to start
pub async fn new(
    port: u16,
    dsn: String,
    properties: SecurityProperties,
    options: Options,
) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let tokens = PgTokenRepository::new(pool.clone());
    if options.create_token_table {
        tokens.create_table().await?;
        info!("Remember-me token table ready");
    }

    let encoder: Arc<dyn PasswordEncoder> = Arc::new(Argon2PasswordEncoder);

    let users: Arc<dyn UserDetailsService> = match options.user_store {
        UserStore::Database => Arc::new(PgUserDetailsService::new(pool.clone())),
        UserStore::Demo => {
            warn!("Demo user store enabled: any username signs in with the demo password");
            Arc::new(DemoUserDetailsService::new(&encoder)?)
        }
    };

    let state = Arc::new(SecurityState::new(
        properties,
        users,
        encoder,
        Arc::new(tokens),
        CodeValidators::new(),
    )?);

    let app = router(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(Extension(pool)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
