//! Shared types between `secretgridd` and its clients.
//!
//! The server exposes a flattened, queryable view of JSON secrets stored in a vault.
//! Every leaf of a secret becomes one [`SecretRow`] addressed by a dotted path.

pub mod client;
mod group;
mod routes {
    pub mod secret;
}
mod secret;

pub use group::group_rows;
pub use routes::secret::*;
pub use secret::*;
