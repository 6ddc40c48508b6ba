use crate::library::{ErrorKind, WatchlistError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for WatchlistError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = match kind {
            ErrorKind::Internal => {
                error!("Internal error: {:#}", self);
                "Internal server error".to_string()
            }
            ErrorKind::Upstream => {
                warn!("{}", self);
                self.to_string()
            }
            _ => self.to_string(),
        };
        let body = ErrorBody {
            code: self.code(),
            message,
        };
        (status_for(kind), Json(body)).into_response()
    }
}
