use std::sync::Arc;

use api::{RowFilter, SecretRow, UpdateOutcome, UpdateRequest};
use jiff::Timestamp;
use serde_json::Value;

use crate::{
    cache::{CacheError, SecretCache},
    tree::{self, PathResolutionError, PathSyntaxError, SecretPath},
    vault::{self, Vault, VaultError},
};

#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Everything that can go wrong with a single [`UpdateRequest`]
#[derive(thiserror::Error, Debug)]
pub enum UpdateError {
    #[error("Got {paths} paths but {values} values")]
    LengthMismatch { paths: usize, values: usize },
    #[error("New value #{0} is not a primitive")]
    NotPrimitive(usize),
    #[error(transparent)]
    Syntax(#[from] PathSyntaxError),
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error("Secret {name} is not valid JSON: {source}")]
    Parse {
        name: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Resolution(#[from] PathResolutionError),
    #[error("Could not serialize the updated secret: {0}")]
    Serialize(serde_json::Error),
}

/// Serves listings from the cache and writes updates through to the vault
pub struct SecretSync {
    vault: Arc<dyn Vault>,
    cache: SecretCache,
}

impl SecretSync {
    pub fn new(vault: Arc<dyn Vault>, cache: SecretCache) -> Self {
        Self { vault, cache }
    }

    /// Cache every secret the cache does not know yet, then return the cached rows.
    ///
    /// Secrets without a JSON string value are skipped. Any other vault failure aborts.
    pub async fn list_secrets(&self, filter: &RowFilter) -> Result<Vec<SecretRow>, SyncError> {
        let names = vault::all_secret_names(self.vault.as_ref()).await?;
        let cached = self.cache.cached_names().await?;

        for name in names.iter().filter(|name| !cached.contains(*name)) {
            let Some(secret) = self.fetch_json(name).await? else {
                continue;
            };
            let leaves = tree::flatten(&secret);
            let inserted = self.cache.insert_rows(name, &leaves, Timestamp::now()).await?;
            log::debug!("Cached {inserted} rows of {name}");
        }

        Ok(self.cache.rows(filter).await?)
    }

    /// Apply every request independently and in order. One outcome per request
    pub async fn update_secrets(&self, batch: &[UpdateRequest]) -> Vec<UpdateOutcome> {
        let mut outcomes = Vec::with_capacity(batch.len());
        for request in batch {
            let outcome = match self.update_secret(request).await {
                Ok(()) => {
                    log::info!(
                        "Updated {} paths of {}",
                        request.paths.len(),
                        request.secret_name
                    );
                    UpdateOutcome::success()
                }
                Err(err) => {
                    log::error!("Error updating secret {}: {err}", request.secret_name);
                    UpdateOutcome::failure(err.to_string())
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn update_secret(&self, request: &UpdateRequest) -> Result<(), UpdateError> {
        let updates = parse_updates(request)?;
        let name = &request.secret_name;

        let raw = self.vault.get_secret_string(name).await?;
        let mut secret: Value = serde_json::from_str(&raw).map_err(|source| UpdateError::Parse {
            name: name.clone(),
            source,
        })?;
        tree::apply_updates(&mut secret, &updates)?;
        let serialized = serde_json::to_string(&secret).map_err(UpdateError::Serialize)?;
        self.vault.update_secret_string(name, serialized).await?;

        // the rows are stale now, the next listing fetches the secret again
        if let Err(err) = self.cache.remove_secret(name).await {
            log::warn!("Could not invalidate cached rows of {name}: {err}");
        }
        Ok(())
    }

    /// `Ok(None)` if the secret has no usable JSON value
    async fn fetch_json(&self, name: &str) -> Result<Option<Value>, VaultError> {
        let raw = match self.vault.get_secret_string(name).await {
            Ok(raw) => raw,
            Err(VaultError::MissingValue(_)) => {
                log::warn!("Skipping secret {name}: it has no string value");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        match serde_json::from_str(&raw) {
            Ok(secret) => Ok(Some(secret)),
            Err(err) => {
                log::warn!("Skipping secret {name}: not valid JSON ({err})");
                Ok(None)
            }
        }
    }
}

fn parse_updates(request: &UpdateRequest) -> Result<Vec<(SecretPath, Value)>, UpdateError> {
    if request.paths.len() != request.new_values.len() {
        return Err(UpdateError::LengthMismatch {
            paths: request.paths.len(),
            values: request.new_values.len(),
        });
    }
    request
        .paths
        .iter()
        .zip(&request.new_values)
        .enumerate()
        .map(|(index, (path, value))| {
            if value.is_object() || value.is_array() {
                return Err(UpdateError::NotPrimitive(index));
            }
            Ok((path.parse::<SecretPath>()?, value.clone()))
        })
        .collect()
}
