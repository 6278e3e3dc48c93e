use fnv::FnvHasher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Stable one-way rename of a name: FNV-1a 64-bit, rendered as 16 hex
/// characters. Deterministic so repeat runs over the same input produce
/// identical output.
pub fn hash(value: &str) -> String {
    let mut hasher = FnvHasher::default();
    hasher.write(value.as_bytes());
    format!("{:016x}", hasher.finish())
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingData {
    #[serde(rename = "Services")]
    pub services: BTreeMap<String, String>,
    #[serde(rename = "Operations")]
    pub operations: BTreeMap<String, String>,
}

/// Persistent service/operation → hash dictionary. Lookups insert on miss;
/// `save` snapshots the whole dictionary to disk.
pub struct Mapping {
    path: PathBuf,
    data: Mutex<MappingData>,
}

impl Mapping {
    /// Loads an existing mapping file or starts empty when none exists.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref().to_path_buf();
        let data = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => MappingData::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn service_hash(&self, service: &str) -> String {
        let mut data = self.data.lock().expect("mapping lock poisoned");
        data.services
            .entry(service.to_string())
            .or_insert_with(|| hash(service))
            .clone()
    }

    pub fn operation_hash(&self, service: &str, operation: &str) -> String {
        let key = format!("[{service}]:{operation}");
        let mut data = self.data.lock().expect("mapping lock poisoned");
        data.operations
            .entry(key)
            .or_insert_with(|| hash(operation))
            .clone()
    }

    pub fn save(&self) -> Result<(), anyhow::Error> {
        let snapshot = self.data.lock().expect("mapping lock poisoned").clone();
        let content = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn snapshot(&self) -> MappingData {
        self.data.lock().expect("mapping lock poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hash_is_stable_16_hex() {
        let first = hash("frontend");
        assert_eq!(first.len(), 16);
        assert_eq!(first, hash("frontend"));
        assert_ne!(first, hash("backend"));
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn lookups_insert_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        let mapping = Mapping::load_or_default(&path).unwrap();
        let service_hash = mapping.service_hash("frontend");
        let operation_hash = mapping.operation_hash("frontend", "op1");
        mapping.save().unwrap();

        let reloaded = Mapping::load_or_default(&path).unwrap();
        assert_eq!(reloaded.service_hash("frontend"), service_hash);
        assert_eq!(reloaded.operation_hash("frontend", "op1"), operation_hash);
        let snapshot = reloaded.snapshot();
        assert!(snapshot.operations.contains_key("[frontend]:op1"));
    }

    #[test]
    fn mapping_file_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        let mapping = Mapping::load_or_default(&path).unwrap();
        mapping.service_hash("svc");
        mapping.save().unwrap();

        let content: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(content.get("Services").is_some());
        assert!(content.get("Operations").is_some());
    }
}
