// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::StatusCode;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Send a GET request and map non-success statuses onto crawler errors.
///
/// `404` becomes `NotFound`; any other failure status becomes `Fetch`.
pub async fn get(
    client: &reqwest::Client,
    url: url::Url,
    context: &str,
) -> Result<reqwest::Response> {
    let response = client
        .get(url)
        .header("X-Requested-With", "XMLHttpRequest")
        .send()
        .await
        .map_err(|e| AppError::fetch(context, e))?;

    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(AppError::not_found(context)),
        status => Err(AppError::fetch(context, format!("HTTP {status}"))),
    }
}
