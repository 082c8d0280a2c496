use std::sync::Arc;

use api::LoginRequest;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_sts::error::{ProvideErrorMetadata as _, SdkError};

use crate::vault::{SecretPage, Vault, VaultConnector, VaultError};

type Result<T> = core::result::Result<T, VaultError>;

/// Connects to AWS Secrets Manager with static access keys
#[derive(Debug, Default, Clone, Copy)]
pub struct AwsConnector;

pub struct AwsVault {
    client: aws_sdk_secretsmanager::Client,
}

#[async_trait]
impl VaultConnector for AwsConnector {
    async fn connect(&self, credentials: &LoginRequest) -> Result<Arc<dyn Vault>> {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(credentials.region.clone()))
            .credentials_provider(Credentials::new(
                &credentials.access_key_id,
                &credentials.secret_access_key,
                None,
                None,
                "secretgrid",
            ))
            .load()
            .await;

        let identity = aws_sdk_sts::Client::new(&config)
            .get_caller_identity()
            .send()
            .await
            .map_err(|err| match err {
                SdkError::ServiceError(_) if is_credential_error(err.code()) => {
                    VaultError::Authentication(DisplayErrorContext(err).to_string())
                }
                other => unavailable(other),
            })?;
        log::info!(
            "Bound AWS credentials of {} in {}",
            identity.arn().unwrap_or("<unknown>"),
            credentials.region
        );

        Ok(Arc::new(AwsVault {
            client: aws_sdk_secretsmanager::Client::new(&config),
        }))
    }
}

#[async_trait]
impl Vault for AwsVault {
    async fn list_page(&self, next_token: Option<String>) -> Result<SecretPage> {
        let page = self
            .client
            .list_secrets()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(unavailable)?;
        Ok(SecretPage {
            names: page
                .secret_list()
                .iter()
                .filter_map(|entry| entry.name().map(str::to_owned))
                .collect(),
            next_token: page.next_token().map(str::to_owned),
        })
    }

    async fn get_secret_string(&self, name: &str) -> Result<String> {
        let secret = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(unavailable)?;
        secret
            .secret_string()
            .map(str::to_owned)
            .ok_or_else(|| VaultError::MissingValue(name.to_owned()))
    }

    async fn update_secret_string(&self, name: &str, value: String) -> Result<()> {
        self.client
            .update_secret()
            .secret_id(name)
            .secret_string(value)
            .send()
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

fn unavailable<E: std::error::Error>(err: E) -> VaultError {
    VaultError::Unavailable(DisplayErrorContext(err).to_string())
}

/// STS error codes caused by the access key pair itself. Others (e.g. throttling) are transient
fn is_credential_error(code: Option<&str>) -> bool {
    matches!(
        code,
        Some(
            "InvalidClientTokenId"
                | "SignatureDoesNotMatch"
                | "IncompleteSignature"
                | "ExpiredToken"
                | "AccessDenied"
                | "UnrecognizedClientException"
        )
    )
}
