//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, route table)
//!     → request.rs (request ID)
//!     → /api/* → dispatcher.rs (select backend, rewrite, forward)
//!              → headers.rs (hop-by-hop, X-Forwarded-For)
//!     → /add, /admin/* → admin handlers
//!     → response.rs (errors → status codes)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::{Dispatcher, ForwardError};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
