use serde::{Deserialize, Serialize};
use std::fmt;

/// Deterministic dataset hash (content hash of the price oracle).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn from_hash(hash: &str) -> Self {
        Self(hash.to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic run ID (canonical run parameters + dataset).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    /// Hash the canonical JSON of the run parameters together with the dataset hash.
    ///
    /// BLAKE3 keeps the id stable across builds and platforms.
    pub fn derive(params: &serde_json::Value, dataset_hash: &DatasetHash) -> Self {
        let canonical = serde_json::json!({
            "params": params,
            "dataset_hash": &dataset_hash.0,
        });
        let hash_bytes = blake3::hash(canonical.to_string().as_bytes());
        Self(hash_bytes.to_hex().to_string())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_id_deterministic() {
        let data = DatasetHash::from_hash("def456");
        let run1 = RunId::derive(&json!({"initial_capital": 100000.0}), &data);
        let run2 = RunId::derive(&json!({"initial_capital": 100000.0}), &data);
        assert_eq!(run1, run2);
    }

    #[test]
    fn test_run_id_changes_with_dataset() {
        let params = json!({"initial_capital": 100000.0});
        let run1 = RunId::derive(&params, &DatasetHash::from_hash("aaa"));
        let run2 = RunId::derive(&params, &DatasetHash::from_hash("bbb"));
        assert_ne!(run1, run2);
    }
}
