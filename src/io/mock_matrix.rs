//! Mock Distance Matrix HTTP server
//!
//! Speaks the same JSON shape as the real provider so runs and client tests
//! work offline. Values are deterministic per (origin, destination) pair.
//!
//! Routes:
//! - GET <any path ending in /json>?origins=..&destinations=a|b|c[&key=..]
//! - GET /health

use crate::io::matrix::{WireElement, WireResponse, WireRow, WireValue};
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use rustc_hash::FxHasher;
use std::convert::Infallible;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info};

#[derive(Debug, Clone)]
pub struct MockMatrixConfig {
    /// Average travel speed used to derive durations
    pub speed_mps: f64,
    pub min_distance_m: f64,
    pub max_distance_m: f64,
    /// Requests carrying this key get REQUEST_DENIED
    pub deny_key: Option<String>,
}

impl Default for MockMatrixConfig {
    fn default() -> Self {
        Self {
            speed_mps: 50.0 / 3.6, // 50 km/h
            min_distance_m: 500.0,
            max_distance_m: 60_000.0,
            deny_key: Some("invalid".to_string()),
        }
    }
}

impl MockMatrixConfig {
    /// Deterministic (seconds, meters) for one origin/destination pair
    pub fn simulate(&self, origin: &str, destination: &str) -> (f64, f64) {
        let mut hasher = FxHasher::default();
        origin.hash(&mut hasher);
        destination.hash(&mut hasher);
        let fraction = (hasher.finish() % 10_000) as f64 / 10_000.0;

        let meters = (self.min_distance_m + fraction * (self.max_distance_m - self.min_distance_m)).round();
        let secs = (meters / self.speed_mps).round();
        (secs, meters)
    }

    /// Build the provider response for a raw query string
    pub fn respond(&self, query: Option<&str>) -> WireResponse {
        let mut origins = None;
        let mut destinations = None;
        let mut key = None;

        if let Some(query) = query {
            let url = format!("http://mock/?{}", query);
            if let Ok(url) = reqwest::Url::parse(&url) {
                for (name, value) in url.query_pairs() {
                    match name.as_ref() {
                        "origins" => origins = Some(value.into_owned()),
                        "destinations" => destinations = Some(value.into_owned()),
                        "key" => key = Some(value.into_owned()),
                        _ => {}
                    }
                }
            }
        }

        if key.is_some() && key == self.deny_key {
            return failure("REQUEST_DENIED", "The provided API key is invalid.");
        }

        let (Some(origin), Some(destinations)) = (origins, destinations) else {
            return failure("INVALID_REQUEST", "origins and destinations are required");
        };
        if origin.is_empty() || destinations.is_empty() {
            return failure("INVALID_REQUEST", "origins and destinations must not be empty");
        }

        let elements = destinations
            .split('|')
            .map(|destination| {
                let (secs, meters) = self.simulate(&origin, destination);
                WireElement {
                    status: "OK".to_string(),
                    duration: Some(WireValue { value: secs, text: format!("{} mins", (secs / 60.0).round()) }),
                    distance: Some(WireValue { value: meters, text: format!("{:.1} km", meters / 1000.0) }),
                }
            })
            .collect();

        WireResponse { status: "OK".to_string(), rows: vec![WireRow { elements }], error_message: None }
    }
}

fn failure(status: &str, message: &str) -> WireResponse {
    WireResponse {
        status: status.to_string(),
        rows: Vec::new(),
        error_message: Some(message.to_string()),
    }
}

fn reply(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Handle HTTP requests
async fn handle_request(
    req: Request<hyper::body::Incoming>,
    config: Arc<MockMatrixConfig>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/health") => Ok(reply(StatusCode::OK, "text/plain", "ok")),
        (&Method::GET, path) if path.ends_with("/json") => {
            let wire = config.respond(req.uri().query());
            debug!(status = %wire.status, "mock_matrix_request");
            let body = serde_json::to_string(&wire).unwrap_or_else(|_| {
                r#"{"status":"UNKNOWN_ERROR","rows":[]}"#.to_string()
            });
            Ok(reply(StatusCode::OK, "application/json", body))
        }
        _ => Ok(reply(StatusCode::NOT_FOUND, "text/plain", "Not Found")),
    }
}

/// Serve on an already-bound listener until shutdown flips to true
pub async fn serve(
    listener: TcpListener,
    config: MockMatrixConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Arc::new(config);
    info!(addr = %listener.local_addr()?, "mock_matrix_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let config = config.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let config = config.clone();
                                async move { handle_request(req, config).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "mock_matrix_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "mock_matrix_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("mock_matrix_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}
