use axum::{Router, routing::post};

use crate::AppState;

mod token;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/token", post(token::token))
}
