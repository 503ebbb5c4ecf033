use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionStringError {
    #[error("connection string has no endpoint")]
    MissingEndpoint,
    #[error("connection string has no accesskey")]
    MissingAccessKey,
    #[error("connection string endpoint {0:?} is not a valid url")]
    InvalidEndpoint(String),
    #[error("connection string accesskey is not valid base64")]
    InvalidAccessKey,
}

/// Parsed `endpoint=...;accesskey=...` resource connection string.
#[derive(Clone)]
pub struct ConnectionString {
    pub endpoint: Url,
    pub(crate) access_key: Vec<u8>,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self, ConnectionStringError> {
        let mut endpoint = None;
        let mut access_key = None;

        for part in raw.split(';') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value.trim()),
                "accesskey" => access_key = Some(value.trim()),
                _ => {}
            }
        }

        let endpoint = endpoint
            .filter(|e| !e.is_empty())
            .ok_or(ConnectionStringError::MissingEndpoint)?;
        let access_key = access_key
            .filter(|k| !k.is_empty())
            .ok_or(ConnectionStringError::MissingAccessKey)?;

        let endpoint = Url::parse(endpoint)
            .ok()
            .filter(|url| !url.cannot_be_a_base() && url.host_str().is_some())
            .ok_or_else(|| ConnectionStringError::InvalidEndpoint(endpoint.to_owned()))?;
        let access_key = STANDARD
            .decode(access_key)
            .map_err(|_| ConnectionStringError::InvalidAccessKey)?;

        Ok(Self {
            endpoint,
            access_key,
        })
    }
}

// keeps the key out of logs
impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("endpoint", &self.endpoint.as_str())
            .field("access_key", &"<redacted>")
            .finish()
    }
}
