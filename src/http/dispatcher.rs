//! Request forwarding to registered backends.
//!
//! # Responsibilities
//! - Ask the registry for the next backend
//! - Rewrite the request target and `Host` header for that backend
//! - Stream the request to the backend and its response back unchanged
//!
//! # Design Decisions
//! - One attempt per request: transport failures surface as 502, no retry
//! - Bodies are streamed in both directions, never buffered
//! - Outbound requests always go out as HTTP/1.1

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header::HOST, uri::Scheme, HeaderValue, Request, Response, Uri, Version},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::http::headers::{append_forwarded_for, strip_hop_by_hop};
use crate::http::request::request_id;
use crate::load_balancer::{Backend, BackendRegistry, RegistryError};
use crate::observability::metrics;

/// Pooled upstream client.
pub type HttpClient = Client<HttpConnector, Body>;

/// Build the upstream client with the given connect timeout.
pub fn build_client(connect_timeout: Duration) -> HttpClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    Client::builder(TokioExecutor::new()).build(connector)
}

/// Errors raised while forwarding a request.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The rewritten request could not be built.
    #[error("Invalid upstream target for {backend}: {source}")]
    InvalidTarget {
        backend: String,
        #[source]
        source: axum::http::Error,
    },

    /// Connecting to or exchanging with the backend failed.
    #[error("Upstream request to {backend} failed: {source}")]
    BackendUnreachable {
        backend: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },
}

/// Forwards proxied requests to backends chosen round-robin.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<BackendRegistry>,
    client: HttpClient,
}

impl Dispatcher {
    pub fn new(registry: Arc<BackendRegistry>, client: HttpClient) -> Self {
        Self { registry, client }
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    /// Forward `request` to the next backend and return its response.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let start = Instant::now();
        let method = request.method().clone();

        let backend = match self.registry.select_next() {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(
                    request_id = %request_id(&request),
                    path = %request.uri().path(),
                    "No backend to forward to"
                );
                metrics::record_request(method.as_str(), 500, "none", start);
                return Err(e.into());
            }
        };

        let result = self.forward_to(&backend, request).await;
        let status = match &result {
            Ok(response) => response.status().as_u16(),
            Err(ForwardError::BackendUnreachable { .. }) => 502,
            Err(_) => 500,
        };
        metrics::record_request(method.as_str(), status, &backend.authority(), start);
        result
    }

    async fn forward_to(
        &self,
        backend: &Backend,
        request: Request<Body>,
    ) -> Result<Response<Body>, ForwardError> {
        let request_id = request_id(&request).to_string();
        let client_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let outbound = rewrite_request(request, backend, client_ip).map_err(|source| {
            ForwardError::InvalidTarget {
                backend: backend.to_string(),
                source,
            }
        })?;

        tracing::debug!(
            request_id = %request_id,
            backend = %backend.id(),
            method = %outbound.method(),
            uri = %outbound.uri(),
            "Forwarding request"
        );

        let response = self.client.request(outbound).await.map_err(|source| {
            tracing::error!(
                request_id = %request_id,
                backend = %backend,
                error = %source,
                "Upstream error"
            );
            ForwardError::BackendUnreachable {
                backend: backend.to_string(),
                source,
            }
        })?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Point `request` at `backend`, keeping method, headers and body.
pub fn rewrite_request(
    request: Request<Body>,
    backend: &Backend,
    client_ip: Option<IpAddr>,
) -> Result<Request<Body>, axum::http::Error> {
    let (mut parts, body) = request.into_parts();

    parts.uri = rewrite_uri(backend, &parts.uri)?;
    parts.version = Version::HTTP_11;

    strip_hop_by_hop(&mut parts.headers);
    if let Some(ip) = client_ip {
        append_forwarded_for(&mut parts.headers, ip);
    }
    parts
        .headers
        .insert(HOST, HeaderValue::from_str(&backend.authority())?);

    Ok(Request::from_parts(parts, body))
}

/// Build the upstream URI: the backend's base path joined with the request
/// path, and the two query strings joined with `&`.
pub fn rewrite_uri(backend: &Backend, original: &Uri) -> Result<Uri, axum::http::Error> {
    let path = join_paths(backend.base_path(), original.path());
    let query = match (backend.base_query(), original.query().filter(|q| !q.is_empty())) {
        (Some(base), Some(extra)) => Some(format!("{}&{}", base, extra)),
        (Some(base), None) => Some(base.to_string()),
        (None, Some(extra)) => Some(extra.to_string()),
        (None, None) => None,
    };
    let path_and_query = match query {
        Some(q) => format!("{}?{}", path, q),
        None => path,
    };

    Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(backend.authority())
        .path_and_query(path_and_query)
        .build()
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}
