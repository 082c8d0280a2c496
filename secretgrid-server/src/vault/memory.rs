use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use api::LoginRequest;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::vault::{SecretPage, Vault, VaultConnector, VaultError};

type Result<T> = core::result::Result<T, VaultError>;

/// In process vault with small pages so that pagination is exercised
#[derive(Default)]
pub struct MemoryVault {
    secrets: Mutex<BTreeMap<String, Option<String>>>,
    rejected: Mutex<HashSet<String>>,
    unavailable: Mutex<bool>,
    fetches: AtomicUsize,
    fetch_gate: tokio::sync::Mutex<()>,
}

impl MemoryVault {
    const PAGE_SIZE: usize = 2;

    pub fn with_secrets<'a, I: IntoIterator<Item = (&'a str, &'a str)>>(secrets: I) -> Self {
        let vault = Self::default();
        for (name, value) in secrets {
            vault.put(name, value);
        }
        vault
    }

    pub fn put(&self, name: &str, value: &str) {
        self.secrets
            .lock()
            .insert(name.to_owned(), Some(value.to_owned()));
    }

    /// Store a secret that has no string value (binary secret)
    pub fn put_binary(&self, name: &str) {
        self.secrets.lock().insert(name.to_owned(), None);
    }

    pub fn value(&self, name: &str) -> Option<String> {
        self.secrets.lock().get(name).cloned().flatten()
    }

    /// Every update of `name` fails
    pub fn reject_updates_of(&self, name: &str) {
        self.rejected.lock().insert(name.to_owned());
    }

    /// Every request fails
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock() = unavailable;
    }

    /// How often a secret value was read
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Reads of secret values block until the returned guard is dropped.
    /// [`Self::fetches`] already counts a blocked read
    pub async fn hold_fetches(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.fetch_gate.lock().await
    }

    fn check_available(&self) -> Result<()> {
        if *self.unavailable.lock() {
            return Err(VaultError::Unavailable("connection refused".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl Vault for MemoryVault {
    async fn list_page(&self, next_token: Option<String>) -> Result<SecretPage> {
        self.check_available()?;
        let start = next_token.map_or(0, |token| token.parse().unwrap_or(0));
        let secrets = self.secrets.lock();
        let names: Vec<String> = secrets
            .keys()
            .skip(start)
            .take(Self::PAGE_SIZE)
            .cloned()
            .collect();
        let end = start + names.len();
        Ok(SecretPage {
            names,
            next_token: (end < secrets.len()).then(|| end.to_string()),
        })
    }

    async fn get_secret_string(&self, name: &str) -> Result<String> {
        self.check_available()?;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        drop(self.fetch_gate.lock().await);
        match self.secrets.lock().get(name) {
            Some(Some(value)) => Ok(value.clone()),
            Some(None) => Err(VaultError::MissingValue(name.to_owned())),
            None => Err(VaultError::Unavailable(format!(
                "Secrets Manager can't find the specified secret {name}"
            ))),
        }
    }

    async fn update_secret_string(&self, name: &str, value: String) -> Result<()> {
        self.check_available()?;
        if self.rejected.lock().contains(name) {
            return Err(VaultError::Unavailable(format!("update of {name} denied")));
        }
        self.secrets.lock().insert(name.to_owned(), Some(value));
        Ok(())
    }
}

/// Hands out one [`MemoryVault`] per accepted access key
pub struct MemoryConnector {
    accounts: HashMap<String, Arc<MemoryVault>>,
}

impl MemoryConnector {
    /// Accepts only `AKIDEXAMPLE`, bound to `vault`
    pub fn new(vault: Arc<MemoryVault>) -> Self {
        Self {
            accounts: HashMap::from([("AKIDEXAMPLE".to_owned(), vault)]),
        }
    }

    /// Additionally accept `access_key_id` for a different account
    pub fn with_account(mut self, access_key_id: &str, vault: Arc<MemoryVault>) -> Self {
        self.accounts.insert(access_key_id.to_owned(), vault);
        self
    }
}

#[async_trait]
impl VaultConnector for MemoryConnector {
    async fn connect(&self, credentials: &LoginRequest) -> Result<Arc<dyn Vault>> {
        let Some(vault) = self.accounts.get(&credentials.access_key_id) else {
            return Err(VaultError::Authentication(
                "The security token included in the request is invalid".to_owned(),
            ));
        };
        let vault: Arc<dyn Vault> = Arc::clone(vault) as Arc<dyn Vault>;
        Ok(vault)
    }
}

#[cfg(test)]
mod test {
    use crate::vault::{all_secret_names, memory::MemoryVault};

    #[tokio::test]
    async fn follows_every_page() {
        let vault = MemoryVault::with_secrets([
            ("a", "{}"),
            ("b", "{}"),
            ("c", "{}"),
            ("d", "{}"),
            ("e", "{}"),
        ]);

        assert_eq!(
            all_secret_names(&vault).await.unwrap(),
            vec!["a", "b", "c", "d", "e"]
        );
    }

    #[tokio::test]
    async fn empty_vault_has_no_names() {
        assert!(all_secret_names(&MemoryVault::default()).await.unwrap().is_empty());
    }
}
