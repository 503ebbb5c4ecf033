use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::info;

use crate::{
    GetField,
    acs::{AcsHttp, IDENTITY_API_VERSION, PlatformError},
    model::{CommunicationUserId, DisplayName, IssuedIdentity},
};

/// Token scope handed to every new identity: voice and video calling only.
pub const CALLING_SCOPE: &str = "voip";

/// Mints a fresh platform identity with a scoped access token.
///
/// Every call allocates a new identity; identities are never reused.
#[async_trait]
pub trait IdentityIssuer: Send + Sync {
    async fn issue_identity(&self, display_name: &DisplayName) -> Result<IssuedIdentity, PlatformError>;
}

pub struct AcsIdentityClient {
    http: AcsHttp,
}

impl AcsIdentityClient {
    pub fn new(http: AcsHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl IdentityIssuer for AcsIdentityClient {
    async fn issue_identity(&self, display_name: &DisplayName) -> Result<IssuedIdentity, PlatformError> {
        let url = self.http.url(&["identities"], IDENTITY_API_VERSION)?;
        let body: Value = self
            .http
            .write(
                Method::POST,
                url,
                "application/json",
                &json!({ "createTokenFor": [CALLING_SCOPE] }),
            )
            .await?;

        let issued = parse_issued(&body)?;
        info!(user_id = %issued.user_id, %display_name, "issued identity");
        Ok(issued)
    }
}

/// Reduces the platform's create-identity response to [`IssuedIdentity`].
fn parse_issued(body: &Value) -> Result<IssuedIdentity, PlatformError> {
    let raw_id = body.get_obj_field("identity")?.get_str_field("id")?;
    let user_id = CommunicationUserId::parse(&raw_id)
        .map_err(|e| PlatformError::Malformed(format!("issued identity: {e}")))?;

    let access_token = body.get_obj_field("accessToken")?;
    let token = access_token.get_str_field("token")?;
    let expires_on = access_token.get_str_field("expiresOn")?;
    let expires_on = OffsetDateTime::parse(&expires_on, &Rfc3339)
        .map_err(|e| PlatformError::Malformed(format!("expiresOn {expires_on:?}: {e}")))?;

    Ok(IssuedIdentity {
        user_id,
        token,
        expires_on,
    })
}
