use core::{fmt, str::FromStr};

use serde_json::Value;

/// A single leaf of a flattened secret
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedLeaf {
    pub path: String,
    pub value: Value,
}

/// Sequence of keys addressing a node inside a JSON value.
///
/// The textual form joins the keys with `.`. A key containing `.` or `\` is written
/// with `\.` and `\\` so that every path survives `to_string` followed by `parse`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecretPath(Vec<String>);

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PathSyntaxError {
    #[error("Path `{0}` ends with an unfinished escape")]
    DanglingEscape(String),
    #[error("Path `{path}` contains the unknown escape `\\{found}`")]
    UnknownEscape { path: String, found: char },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Could not resolve `{segment}` of path `{path}`: {reason}")]
pub struct PathResolutionError {
    pub path: String,
    pub segment: String,
    pub reason: Unresolved,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Unresolved {
    #[error("no such key")]
    MissingKey,
    #[error("not an array index")]
    NotAnIndex,
    #[error("index is out of bounds for an array of length {len}")]
    IndexOutOfBounds { len: usize },
    #[error("value is neither an object nor an array")]
    NotAContainer,
}

impl SecretPath {
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for SecretPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(".")?;
            }
            for c in segment.chars() {
                if matches!(c, '.' | '\\') {
                    f.write_str("\\")?;
                }
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for SecretPath {
    type Err = PathSyntaxError;

    /// Splits on unescaped `.`. Like a plain split the empty string is a single empty key
    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = path.chars();
        while let Some(c) = chars.next() {
            match c {
                '.' => segments.push(core::mem::take(&mut current)),
                '\\' => match chars.next() {
                    Some(escaped @ ('.' | '\\')) => current.push(escaped),
                    Some(found) => {
                        return Err(PathSyntaxError::UnknownEscape {
                            path: path.to_owned(),
                            found,
                        });
                    }
                    None => return Err(PathSyntaxError::DanglingEscape(path.to_owned())),
                },
                other => current.push(other),
            }
        }
        segments.push(current);
        Ok(Self(segments))
    }
}

/// Flatten `value` into its leaves in document order (depth first).
///
/// Primitives are leaves. Objects and arrays contribute their children, arrays using
/// the element index as key. Empty objects and arrays have no leaves.
pub fn flatten(value: &Value) -> Vec<FlattenedLeaf> {
    flatten_with_prefix(value, &[])
}

/// Same as [`flatten`] but every path starts with `prefix`
pub fn flatten_with_prefix(value: &Value, prefix: &[String]) -> Vec<FlattenedLeaf> {
    let mut leaves = Vec::new();
    // children are pushed in reverse so they are popped in document order
    let mut pending: Vec<(Vec<String>, &Value)> = vec![(prefix.to_vec(), value)];

    while let Some((path, value)) = pending.pop() {
        match value {
            Value::Object(map) => {
                for (key, child) in map.iter().rev() {
                    pending.push((child_path(&path, key.clone()), child));
                }
            }
            Value::Array(items) => {
                for (index, child) in items.iter().enumerate().rev() {
                    pending.push((child_path(&path, index.to_string()), child));
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                leaves.push(FlattenedLeaf {
                    path: SecretPath(path).to_string(),
                    value: value.clone(),
                });
            }
        }
    }
    leaves
}

fn child_path(parent: &[String], key: String) -> Vec<String> {
    let mut path = Vec::with_capacity(parent.len() + 1);
    path.extend_from_slice(parent);
    path.push(key);
    path
}

/// Assign each new value to the node addressed by its path, in order.
///
/// Every key but the last has to exist already. The last key is inserted into an object
/// or replaces / appends an array element. Either all updates are applied or, if any path
/// does not resolve, `root` is left untouched.
pub fn apply_updates(
    root: &mut Value,
    updates: &[(SecretPath, Value)],
) -> Result<(), PathResolutionError> {
    let mut working = root.clone();
    for (path, new_value) in updates {
        assign(&mut working, path, new_value.clone())?;
    }
    *root = working;
    Ok(())
}

fn assign(root: &mut Value, path: &SecretPath, new_value: Value) -> Result<(), PathResolutionError> {
    let Some((last, parents)) = path.segments().split_last() else {
        *root = new_value;
        return Ok(());
    };
    // a primitive root is listed under the empty path
    if parents.is_empty() && last.is_empty() && !root.is_object() && !root.is_array() {
        *root = new_value;
        return Ok(());
    }
    let unresolved = |segment: &String, reason: Unresolved| PathResolutionError {
        path: path.to_string(),
        segment: segment.clone(),
        reason,
    };

    let mut current = root;
    for segment in parents {
        current = child_mut(current, segment).map_err(|reason| unresolved(segment, reason))?;
    }

    match current {
        Value::Object(map) => {
            map.insert(last.clone(), new_value);
        }
        Value::Array(items) => {
            let index = array_index(last).ok_or_else(|| unresolved(last, Unresolved::NotAnIndex))?;
            let len = items.len();
            if index < len {
                items[index] = new_value;
            } else if index == len {
                items.push(new_value);
            } else {
                return Err(unresolved(last, Unresolved::IndexOutOfBounds { len }));
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            return Err(unresolved(last, Unresolved::NotAContainer));
        }
    }
    Ok(())
}

fn child_mut<'v>(value: &'v mut Value, segment: &str) -> Result<&'v mut Value, Unresolved> {
    match value {
        Value::Object(map) => map.get_mut(segment).ok_or(Unresolved::MissingKey),
        Value::Array(items) => {
            let index = array_index(segment).ok_or(Unresolved::NotAnIndex)?;
            let len = items.len();
            items
                .get_mut(index)
                .ok_or(Unresolved::IndexOutOfBounds { len })
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            Err(Unresolved::NotAContainer)
        }
    }
}

/// Only canonical decimal numbers address array elements (`"01"` does not)
fn array_index(segment: &str) -> Option<usize> {
    segment
        .parse::<usize>()
        .ok()
        .filter(|index| index.to_string() == segment)
}
