//! Round-robin reverse-proxy load balancer.
//!
//! Backends are registered at runtime through the admin API and every
//! request under `/api/` is forwarded to the next one in rotation.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use load_balancer::{Backend, BackendRegistry, RegistryError};
