pub mod acs;
pub mod appresult;
pub mod auth;
pub mod config;
pub mod health;
pub mod identity;
pub mod membership;
pub mod model;
pub mod registry;
pub mod rooms;
pub mod sessions;

#[cfg(test)]
mod testing;

use axum::{Router, extract::FromRef};
use serde_json::Value;

pub use appresult::{ApiJson, AppError, AppResult, Envelope};
use acs::PlatformError;
use membership::Membership;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub membership: Membership,
}

/// Every `/api` route, ready for middleware.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::router())
        .nest("/rooms", rooms::router())
        .merge(sessions::router())
        .merge(health::router());

    Router::new().nest("/api", api).with_state(state)
}

/// Field access on loosely-typed platform payloads.
pub trait GetField {
    fn get_str_field(&self, field: &str) -> Result<String, PlatformError>;
    fn get_obj_field(&self, field: &str) -> Result<&Value, PlatformError>;
}

impl GetField for serde_json::Value {
    fn get_str_field(&self, field: &str) -> Result<String, PlatformError> {
        Ok(
            self.get(field)
            .ok_or(PlatformError::Malformed(format!("expected {field} in {self}")))?
            .as_str()
            .ok_or(PlatformError::Malformed(format!("expected {field} in {self} to be string")))?
            .to_owned()
        )
    }

    fn get_obj_field(&self, field: &str) -> Result<&Value, PlatformError> {
        self.get(field)
        .filter(|v| v.is_object())
        .ok_or(PlatformError::Malformed(format!("expected object {field} in {self}")))
    }
}
