use axum::{Json, Router, routing::get};
use serde::Serialize;
use time::OffsetDateTime;

use crate::AppState;

const SERVICE: &str = "ACS Backend";

#[derive(Debug, Serialize)]
pub struct Health {
    status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    service: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "healthy",
        timestamp: OffsetDateTime::now_utc(),
        service: SERVICE,
    })
}
