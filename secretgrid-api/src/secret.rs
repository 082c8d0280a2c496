use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One leaf of a flattened secret
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SecretRow {
    /// Name of the secret in the vault
    pub name: String,

    /// Dotted path of the leaf inside the secret. Keys containing `.` or `\`
    /// are escaped as `\.` and `\\`
    pub path: String,

    /// The leaf value. Always a primitive or null
    pub value: Value,
}

/// Narrow down the cached rows. Every field is a SQL `LIKE` pattern and all set
/// fields have to match. `value` is matched against the JSON encoding of the leaf,
/// so string values include their quotes.
///
/// Matching follows sqlite: ASCII letters match case-insensitively, `%` matches any
/// run of characters and `_` any single character, so `db_user` also selects `DB_USER`
/// and `dbXuser`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl RowFilter {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.path.is_none() && self.value.is_none()
    }
}
