//! Error to response mapping.
//!
//! # Responsibilities
//! - Map registry and forwarding errors to HTTP status codes
//! - Carry the error message as a plain-text body
//!
//! # Design Decisions
//! - Invalid admin input is a client error (400)
//! - An empty registry is a server error (500), as is a bad rewrite
//! - Transport failures to the backend are 502 Bad Gateway
//! - Requests exceeding `timeouts.request_secs` are 504 Gateway Timeout
//!   (set by the timeout layer in server.rs)

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::http::dispatcher::ForwardError;
use crate::load_balancer::RegistryError;

impl RegistryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RegistryError::InvalidAddress { .. } => StatusCode::BAD_REQUEST,
            RegistryError::NoBackendsAvailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ForwardError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ForwardError::Registry(e) => e.status_code(),
            ForwardError::InvalidTarget { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ForwardError::BackendUnreachable { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_no_backends_is_500_with_message() {
        let response = ForwardError::from(RegistryError::NoBackendsAvailable).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"No backends configured");
    }

    #[test]
    fn test_invalid_address_is_400() {
        let err = RegistryError::InvalidAddress {
            address: "x y".into(),
            reason: "bad".into(),
        };
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
