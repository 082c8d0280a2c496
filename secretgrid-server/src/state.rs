use std::{ops::Deref, sync::Arc};

use api::LoginRequest;
use tokio::sync::{OwnedRwLockReadGuard, RwLock};

use crate::{
    cache::SecretCache,
    error::ServerError,
    sync::SecretSync,
    vault::{Vault, VaultConnector, VaultError},
};

type Binding = Option<Arc<dyn Vault>>;

/// Shared by all handlers. Holds the vault bound by the last successful login
pub struct AppState {
    cache: SecretCache,
    connector: Arc<dyn VaultConnector>,
    vault: Arc<RwLock<Binding>>,
}

/// A [`SecretSync`] for the currently bound credentials.
///
/// A login waits until every `BoundSync` of the previous credentials is dropped,
/// so no request can write rows of the old account after the cache was cleared.
pub struct BoundSync {
    sync: SecretSync,
    _binding: OwnedRwLockReadGuard<Binding>,
}

impl Deref for BoundSync {
    type Target = SecretSync;

    fn deref(&self) -> &SecretSync {
        &self.sync
    }
}

impl AppState {
    pub fn new(cache: SecretCache, connector: Arc<dyn VaultConnector>) -> Self {
        Self {
            cache,
            connector,
            vault: Arc::new(RwLock::new(None)),
        }
    }

    /// Verify `credentials` and use them for all following requests.
    ///
    /// The cache is emptied since its rows may belong to a different account
    pub async fn login(&self, credentials: &LoginRequest) -> Result<(), ServerError> {
        let vault = self
            .connector
            .connect(credentials)
            .await
            .map_err(|err| match err {
                VaultError::Authentication(reason) => {
                    log::warn!("Invalid vault credentials: {reason}");
                    ServerError::Authentication
                }
                other => ServerError::Vault(other),
            })?;

        let mut binding = self.vault.write().await;
        let dropped = self.cache.clear().await?;
        log::debug!("Dropped {dropped} cached rows of the previous credentials");
        *binding = Some(vault);
        Ok(())
    }

    pub async fn sync(&self) -> Result<BoundSync, ServerError> {
        let binding = Arc::clone(&self.vault).read_owned().await;
        let vault = binding.clone().ok_or(ServerError::NotLoggedIn)?;
        Ok(BoundSync {
            sync: SecretSync::new(vault, self.cache.clone()),
            _binding: binding,
        })
    }
}
