use crate::api::responses::ErrorResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shared::{Error, ErrorCode};
use tracing::{debug, error};

/// Client closed the request before the server answered.
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Handler error: a workspace [`Error`] rendered as a JSON body with a matching status.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::Canceled => {
            StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::BAD_REQUEST)
        }
        ErrorCode::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status = status_for(code);

        if status.is_server_error() {
            error!(code = code.as_str(), error = %self.0, "request failed");
        } else {
            debug!(code = code.as_str(), error = %self.0, "request rejected");
        }

        (status, Json(ErrorResponse::new(code, self.0.to_string()))).into_response()
    }
}
