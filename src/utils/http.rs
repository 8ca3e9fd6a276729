// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::error::{AppError, Result};
use crate::models::NotionConfig;

/// Header Notion uses to pick the acting user for a `token_v2` session.
const ACTIVE_USER_HEADER: &str = "x-notion-active-user-header";

/// Create a configured asynchronous HTTP client for the content API.
///
/// Authentication headers are attached to every request when configured.
pub fn create_async_client(config: &NotionConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    if let Some(token) = config.auth_token.as_deref().filter(|t| !t.is_empty()) {
        headers.insert(header::COOKIE, header_value(&format!("token_v2={token}"))?);
    }
    if let Some(user) = config.active_user.as_deref().filter(|u| !u.is_empty()) {
        headers.insert(ACTIVE_USER_HEADER, header_value(user)?);
    }

    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// Create a client for downloading images from arbitrary hosts.
///
/// Carries no Notion credentials.
pub fn create_image_client(config: &NotionConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|e| AppError::config(format!("Invalid header value: {e}")))?;
    value.set_sensitive(true);
    Ok(value)
}
