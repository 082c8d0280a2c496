use api::UpdateOutcome;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{cache::CacheError, sync::SyncError, vault::VaultError};

/// Failures that abort a whole request. Per item failures of a batch update are
/// reported as [`UpdateOutcome`] instead
#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("No vault credentials bound, call `POST /secrets` first")]
    NotLoggedIn,
    #[error("Invalid vault credentials")]
    Authentication,
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl From<SyncError> for ServerError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Vault(err) => err.into(),
            SyncError::Cache(err) => err.into(),
        }
    }
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotLoggedIn | Self::Authentication | Self::Vault(VaultError::Authentication(_)) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Vault(_) => StatusCode::BAD_GATEWAY,
            Self::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Same shape as a failed batch item: `{"success": false, "error": "..."}`
impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{self}");
        }
        (status, Json(UpdateOutcome::failure(self.to_string()))).into_response()
    }
}
