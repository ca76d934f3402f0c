use axum::http::StatusCode;
use serde::Serialize;

pub mod api;
pub mod settlement;

pub type Result<T> = std::result::Result<T, CheckoutErrorResponse>;

#[derive(Debug, Serialize)]
pub struct CheckoutErrorResponse {
    result: bool,
    error: String,
    #[serde(skip)]
    status: StatusCode,
}

impl CheckoutErrorResponse {
    pub fn not_found(text: impl Into<String>) -> Self {
        Self {
            result: false,
            error: text.into(),
            status: StatusCode::NOT_FOUND,
        }
    }

    pub fn internal(text: impl Into<String>) -> Self {
        Self {
            result: false,
            error: text.into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::error::Error for CheckoutErrorResponse {}

impl std::fmt::Display for CheckoutErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.error)
    }
}

impl axum::response::IntoResponse for CheckoutErrorResponse {
    fn into_response(self) -> axum::response::Response {
        tracing::debug!(error = %self.error, "Checkout API error response");
        (self.status, axum::Json(self)).into_response()
    }
}
