use std::time::Duration;

use reqwest::{
    Method, StatusCode, Url,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{GetField, config::UpstreamSettings};

use super::{ConnectionString, PlatformError, signing};

/// Upper bound on the pause between two read attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Signed HTTP access to the communications platform, shared by the identity
/// and rooms clients.
#[derive(Clone, Debug)]
pub struct AcsHttp {
    http: reqwest::Client,
    connection: ConnectionString,
    settings: UpstreamSettings,
}

impl AcsHttp {
    pub fn new(connection: ConnectionString, settings: UpstreamSettings) -> Result<Self, PlatformError> {
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| PlatformError::transport(e, settings.timeout))?;

        Ok(Self {
            http,
            connection,
            settings,
        })
    }

    pub(crate) fn url(&self, segments: &[&str], api_version: &str) -> Result<Url, PlatformError> {
        let mut url = self.connection.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| PlatformError::Malformed(format!("{} cannot be a base", self.connection.endpoint)))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    /// Idempotent GET. Transient failures are retried with exponential backoff.
    pub(crate) async fn read<T: DeserializeOwned>(&self, url: Url) -> Result<T, PlatformError> {
        let mut attempt = 0;
        loop {
            match self.execute(Method::GET, &url, None).await {
                Ok(body) => return decode(&body),
                Err(err) if err.is_transient() && attempt < self.settings.read_retries => {
                    let backoff = backoff(self.settings.retry_backoff, attempt);
                    warn!(%url, attempt, ?backoff, error = %err, "retrying platform read");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Single-shot mutation. Never retried.
    pub(crate) async fn write<B, T>(
        &self,
        method: Method,
        url: Url,
        content_type: &'static str,
        body: &B,
    ) -> Result<T, PlatformError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(body).map_err(|e| PlatformError::Malformed(e.to_string()))?;
        let response = self.execute(method, &url, Some((content_type, body))).await?;
        decode(&response)
    }

    async fn execute(
        &self,
        method: Method,
        url: &Url,
        body: Option<(&'static str, Vec<u8>)>,
    ) -> Result<Vec<u8>, PlatformError> {
        let payload = body.as_ref().map(|(_, bytes)| bytes.as_slice()).unwrap_or_default();
        let signature = signing::sign(
            &self.connection.access_key,
            &method,
            url,
            payload,
            OffsetDateTime::now_utc(),
        )?;

        let request_id = Uuid::now_v7();
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header("x-ms-date", signature.date)
            .header("x-ms-content-sha256", signature.content_hash)
            .header("x-ms-client-request-id", request_id.to_string())
            .header(AUTHORIZATION, signature.authorization);
        if let Some((content_type, bytes)) = body {
            request = request.header(CONTENT_TYPE, content_type).body(bytes);
        }

        debug!(%method, %url, %request_id, "platform request");
        let deadline = self.settings.timeout;
        let outcome = tokio::time::timeout(deadline, async {
            let response = request.send().await?;
            let status = response.status();
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, bytes.to_vec()))
        })
        .await;

        let (status, bytes) = match outcome {
            Err(_) => {
                warn!(%method, %url, %request_id, ?deadline, "platform request timed out");
                return Err(PlatformError::Timeout(deadline));
            }
            Ok(Err(e)) => return Err(PlatformError::transport(e, deadline)),
            Ok(Ok(response)) => response,
        };

        debug!(%method, %url, %request_id, %status, "platform response");
        if status.is_success() {
            return Ok(bytes);
        }
        Err(classify(status, &bytes))
    }
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt)).min(MAX_BACKOFF)
}

/// Maps a non-success platform response onto [`PlatformError`], keeping the
/// upstream message for diagnostics.
fn classify(status: StatusCode, body: &[u8]) -> PlatformError {
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|json| json.get_obj_field("error").and_then(|e| e.get_str_field("message")).ok())
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_owned());
    let message = if message.is_empty() {
        status.to_string()
    } else {
        message
    };

    match status {
        StatusCode::NOT_FOUND => PlatformError::NotFound(message),
        StatusCode::CONFLICT => PlatformError::AlreadyExists(message),
        _ if message.to_ascii_lowercase().contains("already exists") => {
            PlatformError::AlreadyExists(message)
        }
        _ => PlatformError::Unavailable {
            status: Some(status),
            message,
        },
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, PlatformError> {
    let result = if body.is_empty() {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_slice(body)
    };
    result.map_err(|e| PlatformError::Malformed(e.to_string()))
}
