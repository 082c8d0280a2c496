//! Access to the secret storage service.
//!
//! A [`VaultConnector`] turns long lived credentials into a [`Vault`] after it verified
//! them. The [`Vault`] only knows about secret names and their raw string value,
//! everything JSON related happens in [`crate::sync`].

use std::sync::Arc;

use api::LoginRequest;
use async_trait::async_trait;

pub mod aws;
#[cfg(test)]
pub mod memory;

#[derive(thiserror::Error, Debug)]
pub enum VaultError {
    #[error("Invalid vault credentials: {0}")]
    Authentication(String),
    #[error("Vault request failed: {0}")]
    Unavailable(String),
    #[error("Secret {0} has no string value")]
    MissingValue(String),
}

type Result<T> = core::result::Result<T, VaultError>;

/// One page of secret names. `next_token` is set if there are more pages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretPage {
    pub names: Vec<String>,
    pub next_token: Option<String>,
}

#[async_trait]
pub trait Vault: Send + Sync {
    /// List a single page of secret names, starting at `next_token`
    async fn list_page(&self, next_token: Option<String>) -> Result<SecretPage>;

    /// The current string value of a secret
    async fn get_secret_string(&self, name: &str) -> Result<String>;

    /// Replace the string value of an existing secret
    async fn update_secret_string(&self, name: &str, value: String) -> Result<()>;
}

#[async_trait]
pub trait VaultConnector: Send + Sync {
    /// Bind `credentials` to a new vault client and check that they identify someone
    async fn connect(&self, credentials: &LoginRequest) -> Result<Arc<dyn Vault>>;
}

/// Follow the continuation tokens until every secret name is known
pub async fn all_secret_names(vault: &dyn Vault) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut next_token = None;
    loop {
        let page = vault.list_page(next_token).await?;
        names.extend(page.names);
        match page.next_token {
            Some(token) => next_token = Some(token),
            None => return Ok(names),
        }
    }
}
