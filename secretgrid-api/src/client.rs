//! Thin `reqwest` bindings for the `secretgridd` HTTP surface.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::{LoginRequest, LoginResponse, RowFilter, SecretRow, UpdateOutcome, UpdateRequest};

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("Invalid server url: {0}")]
    Url(#[from] url::ParseError),
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Server responded with {status}: {message}")]
    Status { status: StatusCode, message: String },
}

type Result<T> = core::result::Result<T, ClientError>;

/// Bind vault credentials on the server. The server verifies them before accepting
pub async fn login(url: &Url, credentials: &LoginRequest) -> Result<LoginResponse> {
    let response = reqwest::Client::new()
        .post(url.join("secrets")?)
        .json(credentials)
        .send()
        .await?;
    json(response).await
}

/// List the flattened rows, optionally narrowed down by `filter`
pub async fn list(url: &Url, filter: &RowFilter) -> Result<Vec<SecretRow>> {
    let response = reqwest::Client::new()
        .get(url.join("secrets")?)
        .query(filter)
        .send()
        .await?;
    json(response).await
}

/// Send a batch of updates. The returned outcomes have the same order as `batch`
pub async fn update(url: &Url, batch: &[UpdateRequest]) -> Result<Vec<UpdateOutcome>> {
    let response = reqwest::Client::new()
        .post(url.join("updateSecret")?)
        .json(batch)
        .send()
        .await?;
    json(response).await
}

async fn json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ClientError::Status { status, message });
    }
    Ok(response.json().await?)
}
