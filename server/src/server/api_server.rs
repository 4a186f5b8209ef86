use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use hyper::server::conn::Http;
use k8s_openapi::api::core::v1::{Node, Pod, Service};
use k8s_openapi::List;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::{net::TcpListener, signal, sync::Notify, task::JoinSet};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};
use virtlens_config::Config;

use super::tls;
use crate::context::Context;
use crate::enrich;
use crate::metrics::Metrics;
use crate::{Error, Result};

#[derive(Clone)]
pub struct AppState {
    context: Arc<Context>,
    api_key: Arc<str>,
    metrics: Metrics,
    registry: Registry,
}

pub async fn start(config: &Config, context: Context, shutdown: Arc<Notify>) -> anyhow::Result<()> {
    let registry = Registry::default();
    let state = AppState {
        context: Arc::new(context),
        api_key: config.api_key.as_str().into(),
        metrics: Metrics::default().register(&registry)?,
        registry,
    };

    let acceptor = tls::acceptor(&config.tls_cert_file, &config.tls_key_file)?;
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("listening on port {}", config.port);

    serve(listener, acceptor, app(state), shutdown).await;
    Ok(())
}

async fn serve(listener: TcpListener, acceptor: TlsAcceptor, app: Router, shutdown: Arc<Notify>) {
    let shutdown = shutdown_signal(shutdown);
    tokio::pin!(shutdown);

    let mut connections = JoinSet::new();

    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            Some(_) = connections.join_next(), if !connections.is_empty() => continue,
            _ = &mut shutdown => break,
        };

        let (stream, peer) = match accepted {
            Ok(accepted) => accepted,
            Err(error) => {
                warn!("failed to accept connection: {error}");
                continue;
            }
        };

        let acceptor = acceptor.clone();
        let app = app.clone();

        connections.spawn(async move {
            match acceptor.accept(stream).await {
                Ok(stream) => {
                    if let Err(error) = Http::new().serve_connection(stream, app).await {
                        debug!("connection from {peer} ended: {error}");
                    }
                }
                Err(error) => debug!("TLS handshake with {peer} failed: {error}"),
            }
        });
    }

    // connections accepted before the signal still get served to completion
    while connections.join_next().await.is_some() {}
    info!("server stopped");
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/pods", get(pods))
        .route("/api/v1/services", get(services))
        .route("/api/v1/nodes", get(nodes))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn require_bearer<B>(
    State(state): State<AppState>,
    request: Request<B>,
    next: Next<B>,
) -> Result<Response> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if bearer_token(header) != Some(state.api_key.as_ref()) {
        // this layer only wraps the /api/v1 routes, so the label stays bounded
        let resource = request.uri().path().rsplit('/').next().unwrap_or_default();
        state.metrics.request_failure(resource, &Error::Unauthorized);
        return Err(Error::Unauthorized);
    }

    Ok(next.run(request).await)
}

/// Token from a `bearer` authorization header value. The scheme is matched
/// case insensitively, the token is returned as is.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token)
}

async fn pods(State(state): State<AppState>) -> Result<Json<List<Pod>>> {
    state.metrics.count_request("pods");
    let mut pods = state.context.pods().await.map_err(|error| {
        error!("failed to list pods: {error}");
        state.metrics.request_failure("pods", &error);
        error
    })?;

    let instances = match state.context.virtual_machine_instances().await {
        Ok(instances) => Some(instances),
        Err(error) => {
            warn!("failed to list virtual machine instances, skipping enrichment: {error}");
            state.metrics.vmi_list_failures.inc();
            None
        }
    };

    {
        let _timer = state.metrics.measure_enrich();
        enrich::enrich_pod_list(&mut pods.items, instances.as_deref());
    }

    Ok(Json(pods))
}

async fn services(State(state): State<AppState>) -> Result<Json<List<Service>>> {
    state.metrics.count_request("services");
    let services = state.context.services().await.map_err(|error| {
        error!("failed to list services: {error}");
        state.metrics.request_failure("services", &error);
        error
    })?;

    Ok(Json(services))
}

async fn nodes(State(state): State<AppState>) -> Result<Json<List<Node>>> {
    state.metrics.count_request("nodes");
    let nodes = state.context.nodes().await.map_err(|error| {
        error!("failed to list nodes: {error}");
        state.metrics.request_failure("nodes", &error);
        error
    })?;

    Ok(Json(nodes))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn metrics(State(state): State<AppState>) -> Result<String, StatusCode> {
    let families = state.registry.gather();
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&families, &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn shutdown_signal(shutdown: Arc<Notify>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = shutdown.notified() => {}
    }
}
