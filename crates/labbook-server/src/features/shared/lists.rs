//! Request fields that accept either arrays or comma-separated strings
//!
//! Legacy clients send `"filenames": "a,b,c"` where newer ones send
//! `"filenames": ["a", "b", "c"]`; both normalize to the same list.

use serde::{Deserialize, Serialize};

/// A list field deserializable from a JSON array or one comma-separated string
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    One(String),
    Many(Vec<String>),
}

impl Default for StringList {
    fn default() -> Self {
        StringList::Many(Vec::new())
    }
}

impl StringList {
    /// Normalize into trimmed, non-empty entries
    pub fn into_vec(self) -> Vec<String> {
        let raw = match self {
            StringList::One(s) => s.split(',').map(|s| s.to_string()).collect(),
            StringList::Many(v) => v,
        };
        raw.into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
