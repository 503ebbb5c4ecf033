use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use reqwest::{Method, Url};
use sha2::{Digest, Sha256};
use time::{OffsetDateTime, UtcOffset, macros::format_description};

use super::PlatformError;

type HmacSha256 = Hmac<Sha256>;

pub(crate) const SIGNED_HEADERS: &str = "x-ms-date;host;x-ms-content-sha256";

/// Header values for one HMAC-signed platform request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Signature {
    pub date: String,
    pub content_hash: String,
    pub authorization: String,
}

pub(crate) fn sign(
    key: &[u8],
    method: &Method,
    url: &Url,
    body: &[u8],
    now: OffsetDateTime,
) -> Result<Signature, PlatformError> {
    let content_hash = STANDARD.encode(Sha256::digest(body));
    let date = http_date(now)?;

    let host = url
        .host_str()
        .ok_or_else(|| PlatformError::Malformed(format!("{url} has no host")))?;
    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    };
    let path_and_query = match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_owned(),
    };

    let string_to_sign = format!(
        "{}\n{path_and_query}\n{date};{host};{content_hash}",
        method.as_str()
    );
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| PlatformError::Malformed(format!("access key: {e}")))?;
    mac.update(string_to_sign.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    Ok(Signature {
        authorization: format!("HMAC-SHA256 SignedHeaders={SIGNED_HEADERS}&Signature={signature}"),
        date,
        content_hash,
    })
}

/// RFC 1123 date, always in GMT.
fn http_date(now: OffsetDateTime) -> Result<String, PlatformError> {
    now.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
        ))
        .map_err(|e| PlatformError::Malformed(format!("date: {e}")))
}
