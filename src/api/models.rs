//! Non-streaming model management endpoints.
//!
//! A connection failure on `/api/tags` is the canonical signal that the
//! server process is not running; callers surface it as guidance rather than
//! a generic network error.

use crate::api::{DeleteRequest, ModelInfo, TagsResponse};
use crate::core::error::ApiError;
use crate::utils::url::construct_api_url;

pub async fn fetch_models(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<Vec<ModelInfo>, ApiError> {
    let tags_url = construct_api_url(base_url, "api/tags");
    let response = client.get(tags_url).send().await.map_err(ApiError::from)?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(ApiError::Transport(format!(
            "listing models failed with status {status}: {error_text}"
        )));
    }

    let tags = response
        .json::<TagsResponse>()
        .await
        .map_err(|err| ApiError::Parse(err.to_string()))?;
    Ok(tags.models)
}

pub fn sort_models(models: &mut [ModelInfo]) {
    models.sort_by(|a, b| a.name.cmp(&b.name));
}

pub async fn delete_model(
    client: &reqwest::Client,
    base_url: &str,
    name: &str,
) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("empty model name".to_string()));
    }

    let delete_url = construct_api_url(base_url, "api/delete");
    let response = client
        .delete(delete_url)
        .json(&DeleteRequest {
            name: name.to_string(),
        })
        .send()
        .await
        .map_err(ApiError::from)?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(ApiError::Transport(format!(
            "deleting model failed with status {status}: {error_text}"
        )));
    }

    Ok(())
}
