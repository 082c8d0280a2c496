use indexmap::IndexMap;
use serde_json::Value;

use crate::{SecretRow, UpdateRequest};

/// Build one [`UpdateRequest`] per secret which sets every selected row to `new_value`.
/// Secrets keep the order in which they first appear in `rows`.
///
/// An empty string as `new_value` is treated as "nothing entered" and produces no requests.
pub fn group_rows<'a, I>(rows: I, new_value: &Value) -> Vec<UpdateRequest>
where
    I: IntoIterator<Item = &'a SecretRow>,
{
    if new_value.as_str().is_some_and(str::is_empty) {
        return Vec::new();
    }

    let mut grouped: IndexMap<&str, Vec<String>> = IndexMap::new();
    for row in rows {
        grouped
            .entry(row.name.as_str())
            .or_default()
            .push(row.path.clone());
    }

    grouped
        .into_iter()
        .map(|(name, paths)| UpdateRequest {
            secret_name: name.to_owned(),
            new_values: vec![new_value.clone(); paths.len()],
            paths,
        })
        .collect()
}
