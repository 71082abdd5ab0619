use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{Router, extract::DefaultBodyLimit, middleware, routing::get};
use idm_auth::{
    AuthorizationCodeStorage, AuthorizationConfig, AuthorizationService, BearerVerifier,
    InMemoryAuthorizationCodeStorage, InMemoryClientStorage, InMemoryUserDirectory, OAuthState,
    SessionCookieResolver, TokenIssuer, VerifierState, require_bearer,
};
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::AppConfig, handlers};

/// How often expired authorization codes are dropped from memory.
const CODE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared services wired from configuration.
#[derive(Clone)]
pub struct AppState {
    pub oauth: OAuthState,
    pub verifier: VerifierState,
    pub codes: Arc<InMemoryAuthorizationCodeStorage>,
}

pub fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let auth = &cfg.auth;
    auth.validate()?;

    let token_issuer = Arc::new(TokenIssuer::new(
        auth.signing.secret.as_bytes(),
        auth.signing.key_id.clone(),
        auth.issuer.clone(),
        auth.oauth.access_token_lifetime,
    )?);

    let clients = Arc::new(InMemoryClientStorage::with_clients(auth.clients.clone()));
    let users = Arc::new(InMemoryUserDirectory::with_users(auth.users.clone()));
    let codes = Arc::new(InMemoryAuthorizationCodeStorage::new());

    let service = AuthorizationService::new(
        clients,
        codes.clone(),
        token_issuer.clone(),
        AuthorizationConfig::from(auth),
    );
    let sessions = SessionCookieResolver::new(users, auth.signing.secret.as_bytes())?;
    let oauth = OAuthState::new(Arc::new(service), Arc::new(sessions), auth);

    let verifier = BearerVerifier::from_config(auth, token_issuer)?;

    tracing::info!(
        issuer = %auth.issuer,
        clients = auth.clients.len(),
        users = auth.users.len(),
        "auth services initialized"
    );

    Ok(AppState {
        oauth,
        verifier: VerifierState::new(Arc::new(verifier)),
        codes,
    })
}

pub fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let state = build_state(cfg)?;
    Ok(router(&state, cfg.server.body_limit_bytes))
}

fn router(state: &AppState, body_limit: usize) -> Router {
    let protected = Router::new()
        .route("/api/v1/me", get(handlers::me))
        .layer(middleware::from_fn_with_state(
            state.verifier.clone(),
            require_bearer,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(idm_auth::router(state.oauth.clone()))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = tracing::field::Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub fn build(self) -> anyhow::Result<IdmServer> {
        let state = build_state(&self.config)?;
        let app = router(&state, self.config.server.body_limit_bytes);

        Ok(IdmServer {
            addr: self.addr,
            app,
            codes: state.codes,
        })
    }
}

pub struct IdmServer {
    addr: SocketAddr,
    app: Router,
    codes: Arc<InMemoryAuthorizationCodeStorage>,
}

impl IdmServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);

        let sweeper = spawn_code_sweeper(self.codes);
        let result = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;
        sweeper.abort();

        result?;
        Ok(())
    }
}

fn spawn_code_sweeper(codes: Arc<InMemoryAuthorizationCodeStorage>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CODE_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            match codes.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "expired authorization codes purged"),
                Err(e) => tracing::warn!(error = %e, "authorization code purge failed"),
            }
        }
    })
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
