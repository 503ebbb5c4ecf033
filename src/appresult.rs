use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use crate::{membership::MembershipError, model::InvalidInput};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Membership(#[from] MembershipError),
}

impl AppError {
    /// Status and caller-facing message. Upstream diagnostics stay in the logs.
    fn public(&self) -> (StatusCode, String) {
        use MembershipError::*;
        match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Membership(err) => match err {
                InvalidIdentityFormat(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                RoomNotFound(room_id) => (
                    StatusCode::NOT_FOUND,
                    format!("Room {room_id} not found. Please check the Room ID."),
                ),
                err if err.is_timeout() => (
                    StatusCode::GATEWAY_TIMEOUT,
                    "The communications platform did not respond in time".to_owned(),
                ),
                IdentityIssuanceFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate token".to_owned()),
                RoomCreationFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create room".to_owned()),
                JoinFailed { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to join room".to_owned()),
                Upstream(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Communications platform unavailable".to_owned(),
                ),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.public();
        if status.is_server_error() {
            let report = anyhow::Error::new(self);
            error!(%status, "request failed: {report:#}");
        } else {
            debug!(%status, "request rejected: {self}");
        }

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

impl From<InvalidInput> for AppError {
    fn from(err: InvalidInput) -> Self {
        Self::InvalidInput(err.0)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

/// `Json` whose rejections come back as a 400 in the usual error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    success: bool,
    data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Envelope {
            success: true,
            data,
        })
    }
}
