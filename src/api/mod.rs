//! HTTP server bootstrap: pool, middleware stack, routes, and shutdown.

use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{AuthConfig, AuthFlow};
use crate::cache::VerificationStore;
use crate::mail::Mailer;

pub(crate) mod envelope;
pub(crate) mod handlers;
mod openapi;
pub(crate) mod session;

/// HTTP-level settings: CORS origin and rate limiting.
#[derive(Clone, Debug)]
pub struct HttpConfig {
    frontend_base_url: String,
    rate_limit_replenish_seconds: u64,
    rate_limit_burst: u32,
}

impl HttpConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            frontend_base_url: "http://localhost:8080".to_string(),
            // One token per 4 seconds with burst 15 ~= 15 requests/minute.
            rate_limit_replenish_seconds: 4,
            rate_limit_burst: 15,
        }
    }

    #[must_use]
    pub fn with_frontend_base_url(mut self, url: String) -> Self {
        self.frontend_base_url = url;
        self
    }

    #[must_use]
    pub fn with_rate_limit_replenish_seconds(mut self, seconds: u64) -> Self {
        self.rate_limit_replenish_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_rate_limit_burst(mut self, burst: u32) -> Self {
        self.rate_limit_burst = burst;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    auth_config: AuthConfig,
    mailer: Arc<dyn Mailer>,
    http_config: HttpConfig,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let store = VerificationStore::new(auth_config.verification_cache_capacity());
    let flow = Arc::new(AuthFlow::new(auth_config, store, mailer, pool.clone()));

    let app = router(flow, pool, &http_config)?;

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Gracefully shutdown");
    })
    .await?;

    Ok(())
}

/// Build the full application router with its middleware stack.
///
/// # Errors
/// Returns an error on an invalid frontend origin or rate limit settings.
pub fn router(flow: Arc<AuthFlow>, pool: sqlx::PgPool, http_config: &HttpConfig) -> Result<Router> {
    let frontend_origin = frontend_origin(http_config.frontend_base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(SmartIpKeyExtractor)
            .per_second(http_config.rate_limit_replenish_seconds)
            .burst_size(http_config.rate_limit_burst)
            .finish()
            .ok_or_else(|| anyhow!("Invalid rate limit configuration"))?,
    );
    let rate_limit = GovernorLayer {
        config: governor_config,
    };

    // Session-guarded routes; everything else under /api/v1 is public.
    let protected = Router::new()
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route(
            "/users",
            post(handlers::users::create_user).get(handlers::users::list_users),
        )
        .route(
            "/users/:id",
            get(handlers::users::get_user)
                .patch(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route_layer(middleware::from_fn(session::require_session));

    let api = Router::new()
        .route("/auth/request-code", post(handlers::auth::request_code))
        .route("/auth/confirm-code", post(handlers::auth::confirm_code))
        .merge(protected)
        .layer(rate_limit);

    Ok(Router::new()
        .nest("/api/v1", api)
        .route("/health", get(handlers::health::health))
        .merge(
            SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(flow))
                .layer(Extension(pool)),
        ))
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

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
