//! Request body helpers shared by the JSON endpoints.

use axum::http::{HeaderMap, header};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;

use crate::api::error::ApiError;

/// Accepts `application/json` with optional parameters such as charset.
pub fn parse_content_type(content_type: &str) -> Result<mime::Mime, ApiError> {
    let media_type: mime::Mime = content_type
        .parse()
        .map_err(|_| ApiError::InvalidPayload(format!("invalid Content-Type: {content_type}")))?;

    if media_type.type_() != mime::APPLICATION || media_type.subtype() != mime::JSON {
        return Err(ApiError::InvalidPayload(format!(
            "Content-Type must be application/json, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    Ok(media_type)
}

pub fn validate_body_size(data: &[u8], max_size: usize) -> Result<(), ApiError> {
    if data.len() > max_size {
        return Err(ApiError::PayloadTooLarge(data.len()));
    }
    Ok(())
}

/// Collect the (already decompressed) body, enforcing `max_size`.
pub async fn read_body(body: axum::body::Body, max_size: usize) -> Result<bytes::Bytes, ApiError> {
    let data = body
        .collect()
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .to_bytes();
    validate_body_size(&data, max_size)?;
    Ok(data)
}

fn decode<T: DeserializeOwned>(headers: &HeaderMap, data: &[u8]) -> Result<T, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;
    parse_content_type(content_type)?;
    Ok(serde_json::from_slice(data)?)
}

/// Content type check, bounded read, then JSON decode.
pub async fn read_json<T: DeserializeOwned>(
    headers: &HeaderMap,
    body: axum::body::Body,
    max_size: usize,
) -> Result<T, ApiError> {
    let data = read_body(body, max_size).await?;
    decode(headers, &data)
}

/// Like [`read_json`], but an empty body means `T::default()`.
pub async fn read_optional_json<T>(
    headers: &HeaderMap,
    body: axum::body::Body,
    max_size: usize,
) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    let data = read_body(body, max_size).await?;
    if data.is_empty() {
        return Ok(T::default());
    }
    decode(headers, &data)
}
