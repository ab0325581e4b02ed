use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")] Validation(String),

    #[error("Approval denied: {0}")] ApprovalDenied(String),

    #[error("No swap route found")]
    NoRouteFound,

    #[error("Spend limit exceeded")]
    LimitExceeded,

    #[error("Execution timed out: {0}")] ExecutionTimeout(String),

    #[error("Execution rejected: {0}")] ExecutionRejected(String),

    #[error("RPC error: {0}")] Rpc(String),

    #[error("Aggregator error: {0}")] Aggregator(String),

    #[error("Network error: {0}")] Network(#[from] reqwest::Error),

    #[error("Storage error: {0}")] Storage(String),

    #[error("Invalid address")]
    InvalidAddress,

    #[error("Invalid input: {0}")] InvalidInput(String),

    #[error("Configuration error: {0}")] Config(String),

    #[error("Internal error: {0}")] Internal(String),
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(serde::Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    pub fn to_error_response(&self) -> ErrorResponse {
        let (code, message, field) = match self {
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone(), None),
            AppError::ApprovalDenied(msg) => ("APPROVAL_DENIED", msg.clone(), None),
            AppError::NoRouteFound =>
                ("NO_ROUTE_FOUND", "No aggregator produced a usable route".to_string(), None),
            AppError::LimitExceeded =>
                ("LIMIT_EXCEEDED", "Swap would exceed configured spend caps".to_string(), None),
            AppError::ExecutionTimeout(msg) => ("EXECUTION_TIMEOUT", msg.clone(), None),
            AppError::ExecutionRejected(msg) => ("EXECUTION_REJECTED", msg.clone(), None),
            AppError::Rpc(msg) => ("RPC_ERROR", msg.clone(), None),
            AppError::Aggregator(msg) => ("AGGREGATOR_ERROR", msg.clone(), None),
            AppError::Network(e) => ("NETWORK_ERROR", e.to_string(), None),
            AppError::Storage(msg) => ("STORAGE_ERROR", msg.clone(), None),
            AppError::InvalidAddress =>
                (
                    "INVALID_ADDRESS",
                    "Invalid address format".to_string(),
                    Some("address".to_string()),
                ),
            AppError::InvalidInput(msg) => ("INVALID_INPUT", msg.clone(), None),
            AppError::Config(msg) => ("CONFIG_ERROR", msg.clone(), None),
            AppError::Internal(msg) => ("INTERNAL_ERROR", msg.clone(), None),
        };

        ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                field,
            },
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NoRouteFound => axum::http::StatusCode::NOT_FOUND,
            AppError::ApprovalDenied(_) => axum::http::StatusCode::FORBIDDEN,
            | AppError::Validation(_)
            | AppError::InvalidInput(_)
            | AppError::InvalidAddress
            | AppError::LimitExceeded => {
                axum::http::StatusCode::BAD_REQUEST
            }
            AppError::ExecutionTimeout(_) => axum::http::StatusCode::GATEWAY_TIMEOUT,
            _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        };

        let response = self.to_error_response();
        (status, axum::Json(response)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
