//! HTTP server.
//!
//! Builds the axum router and runs it until ctrl-c.

use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue};
use axum::routing::get;
use axum::Router;
use log::{info, warn};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::cache::ModelCache;
use crate::config::DaemonConfig;
use crate::models::ModelSource;

use super::handlers::{generate_midi_handler, health_handler, instruments_handler, root_handler};
use super::types::{PATTERN_ID_HEADER, SEED_HEADER};

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Loaded models, shared by every request.
    pub cache: Arc<ModelCache>,
}

impl AppState {
    /// Creates state around an existing cache.
    pub fn new(cache: Arc<ModelCache>) -> Self {
        Self { cache }
    }

    /// Creates state with an empty cache backed by `source`.
    pub fn with_source(source: Arc<dyn ModelSource>) -> Self {
        Self::new(Arc::new(ModelCache::new(source)))
    }
}

/// Builds the router for all endpoints, allowing `cors_origins` from browsers.
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/instruments", get(instruments_handler))
        .route("/generate-midi", get(generate_midi_handler))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// CORS for an explicit origin list, with credentials.
///
/// Pattern headers are exposed so browser clients can read the seed and
/// download name.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            // A wildcard cannot be combined with credentials.
            Ok(value) if origin != "*" => Some(value),
            _ => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([
            header::CONTENT_DISPOSITION,
            HeaderName::from_static(SEED_HEADER),
            HeaderName::from_static(PATTERN_ID_HEADER),
        ])
}

/// Serves `router` on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("HTTP server listening on http://{}", addr);
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("HTTP server stopped");
    Ok(())
}

/// Binds the configured address and serves until ctrl-c.
pub async fn run_server(config: &DaemonConfig, state: AppState) -> io::Result<()> {
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Allowed CORS origins: {:?}", config.cors_origins);
    serve(listener, create_router(state, &config.cors_origins), shutdown_signal()).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => log::error!("Failed to listen for ctrl-c: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CORS_ORIGINS;
    use crate::models::BuiltinModelSource;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn raw_get(addr: std::net::SocketAddr, path: &str) -> Vec<u8> {
        raw_request(addr, "GET", path, "").await
    }

    async fn raw_request(
        addr: std::net::SocketAddr,
        method: &str,
        path: &str,
        extra_headers: &str,
    ) -> Vec<u8> {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "{} {} HTTP/1.1\r\nHost: localhost\r\n{}Connection: close\r\n\r\n",
            method, path, extra_headers
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        response
    }

    fn head(response: &[u8]) -> String {
        let end = response
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .unwrap_or(response.len());
        String::from_utf8_lossy(&response[..end]).to_lowercase()
    }

    fn default_origins() -> Vec<String> {
        DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect()
    }

    #[tokio::test]
    async fn serves_routes_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let state = AppState::with_source(Arc::new(BuiltinModelSource));
        let router = create_router(state, &default_origins());
        let server = tokio::spawn(serve(listener, router, async move {
            let _ = stop_rx.await;
        }));

        let health = raw_get(addr, "/health").await;
        assert!(head(&health).starts_with("http/1.1 200"));

        let midi = raw_get(addr, "/generate-midi?instrument=kick&seed=42").await;
        let midi_head = head(&midi);
        assert!(midi_head.starts_with("http/1.1 200"));
        assert!(midi_head.contains("content-type: audio/midi"));
        assert!(midi_head.contains("x-pattern-seed: 42"));

        let bad = raw_get(addr, "/generate-midi?instrument=trumpet").await;
        assert!(head(&bad).starts_with("http/1.1 400"));

        let no_drums = raw_get(addr, "/generate-midi?instrument=kick&genre=cinematic").await;
        assert!(head(&no_drums).starts_with("http/1.1 400"));

        let missing = raw_get(addr, "/nope").await;
        assert!(head(&missing).starts_with("http/1.1 404"));

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn cors_allows_listed_origins_only() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let state = AppState::with_source(Arc::new(BuiltinModelSource));
        let router = create_router(state, &default_origins());
        let server = tokio::spawn(serve(listener, router, async move {
            let _ = stop_rx.await;
        }));

        let preflight = raw_request(
            addr,
            "OPTIONS",
            "/generate-midi",
            "Origin: http://localhost:3000\r\nAccess-Control-Request-Method: GET\r\n",
        )
        .await;
        let preflight_head = head(&preflight);
        assert!(preflight_head.starts_with("http/1.1 200"));
        assert!(preflight_head.contains("access-control-allow-origin: http://localhost:3000"));
        assert!(preflight_head.contains("access-control-allow-credentials: true"));

        let allowed = raw_request(
            addr,
            "GET",
            "/generate-midi?instrument=kick&seed=42",
            "Origin: http://localhost:3000\r\n",
        )
        .await;
        let allowed_head = head(&allowed);
        assert!(allowed_head.contains("access-control-allow-origin: http://localhost:3000"));
        assert!(allowed_head.contains("access-control-expose-headers"));
        assert!(allowed_head.contains("x-pattern-seed"));

        let foreign = raw_request(addr, "GET", "/health", "Origin: http://evil.example\r\n").await;
        assert!(!head(&foreign).contains("access-control-allow-origin"));

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[test]
    fn wildcard_origin_is_dropped() {
        // Layering checks the rules; a wildcard with credentials would panic.
        let origins = ["*".to_string(), "http://localhost".to_string()];
        let _ = Router::<()>::new()
            .route("/", get(|| async { "ok" }))
            .layer(cors_layer(&origins));
    }
}
