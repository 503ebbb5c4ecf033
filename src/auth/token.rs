use axum::{Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;

use crate::{
    ApiJson, AppResult, AppState, Envelope,
    membership::Membership,
    model::{CommunicationUserId, DisplayName},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenRequest {
    display_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenResponse {
    user_id: CommunicationUserId,
    token: String,
    #[serde(with = "time::serde::rfc3339")]
    expires_on: OffsetDateTime,
    display_name: DisplayName,
}

#[debug_handler(state = AppState)]
pub(crate) async fn token(
    State(membership): State<Membership>,
    ApiJson(TokenRequest { display_name }): ApiJson<TokenRequest>,
) -> AppResult<Json<Envelope<TokenResponse>>> {
    let display_name = DisplayName::parse(&display_name)?;
    info!(%display_name, "token requested");

    let issued = membership.issue_token(&display_name).await?;
    Ok(Envelope::ok(TokenResponse {
        user_id: issued.user_id,
        token: issued.token,
        expires_on: issued.expires_on,
        display_name,
    }))
}
