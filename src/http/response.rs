//! Error responses.
//!
//! Every [`GatewayError`] becomes a status code and a small JSON body with a
//! stable tag. Internal details (upstream addresses, source errors) stay in
//! the logs.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::GatewayError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: &'static str,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            // Nobody is left to read a body.
            GatewayError::ClientDisconnected => status.into_response(),
            GatewayError::Internal(ref detail) => {
                tracing::error!(detail = %detail, "Internal gateway error");
                (status, Json(self.body())).into_response()
            }
            _ => (status, Json(self.body())).into_response(),
        }
    }
}

impl GatewayError {
    fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.tag(),
            message: self.public_message(),
        }
    }
}
