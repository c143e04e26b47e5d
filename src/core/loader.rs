// src/core/loader.rs
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use sha2::{Sha256, Digest};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{HierarchyError, Result};
use super::metadata::ProcessMetadata;
use super::subprocess_map::SubprocessMap;

/// One metadata document read from disk
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub path: PathBuf,
    /// SHA-256 of the raw document
    pub content_hash: String,
    pub metadata: ProcessMetadata,
}

/// Every metadata document of one run, in input order
#[derive(Debug, Clone, Default)]
pub struct MetadataSet {
    pub files: Vec<LoadedFile>,
}

impl MetadataSet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn metadata(&self) -> Vec<ProcessMetadata> {
        self.files.iter().map(|file| file.metadata.clone()).collect()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files
            .iter()
            .map(|file| file.metadata.file_name.clone())
            .collect()
    }

    /// Hash over every input that influences the built hierarchy.
    ///
    /// Equal fingerprints mean a cached graph can be reused.
    pub fn fingerprint(&self, map: Option<&SubprocessMap>) -> Result<String> {
        let mut hasher = Sha256::new();
        for file in &self.files {
            hasher.update(file.metadata.file_name.as_bytes());
            hasher.update([0u8]);
            hasher.update(file.content_hash.as_bytes());
            hasher.update([0u8]);
        }
        if let Some(map) = map {
            hasher.update(serde_json::to_vec(map)?);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Reads the JSON metadata documents emitted by the BPMN parser
pub struct MetadataLoader;

impl MetadataLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load every `*.json` document below `dir`, sorted by path
    pub fn load_directory<P: AsRef<Path>>(&self, dir: P) -> Result<MetadataSet> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(HierarchyError::Metadata(format!(
                "Metadata directory {} does not exist",
                dir.display()
            )));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = entry.map_err(|e| HierarchyError::Metadata(e.to_string()))?;
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                paths.push(path.to_path_buf());
            }
        }
        paths.sort();

        let set = self.load_files(&paths)?;
        info!("Loaded {} metadata files from {}", set.len(), dir.display());
        Ok(set)
    }

    /// Load the given documents in the given order
    pub fn load_files(&self, paths: &[PathBuf]) -> Result<MetadataSet> {
        let mut seen = HashSet::new();
        let mut files = Vec::with_capacity(paths.len());

        for path in paths {
            let file = self.load_file(path)?;
            if !seen.insert(file.metadata.file_name.clone()) {
                return Err(HierarchyError::Metadata(format!(
                    "File name {} is declared by more than one metadata document (last: {})",
                    file.metadata.file_name,
                    path.display()
                )));
            }
            files.push(file);
        }

        Ok(MetadataSet { files })
    }

    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<LoadedFile> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let metadata: ProcessMetadata = serde_json::from_str(&content).map_err(|e| {
            HierarchyError::Metadata(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        debug!(
            "Read {} ({} processes) from {}",
            metadata.file_name,
            metadata.processes.len(),
            path.display()
        );

        Ok(LoadedFile {
            path: path.to_path_buf(),
            content_hash: calculate_hash(&content),
            metadata,
        })
    }
}

impl Default for MetadataLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 of a document, lowercase hex
fn calculate_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use predicates::prelude::*;

    const APPLICATION: &str = r#"{
        "file_name": "mortgage-se-application.bpmn",
        "processes": [{
            "process_id": "mortgage-se-application",
            "name": "Application",
            "call_activities": [{ "id": "household", "name": "Household" }],
            "tasks": [{ "id": "register", "kind": "userTask" }],
            "sequence_flows": [{ "source_id": "register", "target_id": "household" }]
        }]
    }"#;

    const HOUSEHOLD: &str = r#"{
        "file_name": "mortgage-se-household.bpmn",
        "processes": [{ "process_id": "household", "name": "Household" }]
    }"#;

    #[test]
    fn test_load_directory_is_sorted_and_skips_other_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("b/household.json").write_str(HOUSEHOLD).unwrap();
        temp.child("a/application.json").write_str(APPLICATION).unwrap();
        temp.child("notes.txt").write_str("not metadata").unwrap();

        let set = MetadataLoader::new().load_directory(temp.path()).unwrap();
        assert_eq!(
            set.file_names(),
            vec![
                "mortgage-se-application.bpmn".to_string(),
                "mortgage-se-household.bpmn".to_string(),
            ]
        );

        let application = &set.files[0].metadata.processes[0];
        assert_eq!(application.call_activities[0].called_element_id, None);
        assert_eq!(application.tasks.len(), 1);
        assert!(predicate::str::is_match("^[0-9a-f]{64}$")
            .unwrap()
            .eval(&set.files[0].content_hash));
    }

    #[test]
    fn test_duplicate_file_names_are_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("one.json").write_str(HOUSEHOLD).unwrap();
        temp.child("two.json").write_str(HOUSEHOLD).unwrap();

        let err = MetadataLoader::new().load_directory(temp.path()).unwrap_err();
        assert!(predicate::str::contains("mortgage-se-household.bpmn").eval(&err.to_string()));
    }

    #[test]
    fn test_malformed_document_names_the_path() {
        let temp = assert_fs::TempDir::new().unwrap();
        let broken = temp.child("broken.json");
        broken.write_str("{ not json").unwrap();

        match MetadataLoader::new().load_file(broken.path()) {
            Err(HierarchyError::Metadata(message)) => assert!(message.contains("broken.json")),
            other => panic!("expected metadata error, got {:?}", other.map(|f| f.path)),
        }
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let missing = temp.child("nowhere");
        missing.assert(predicate::path::missing());
        assert!(MetadataLoader::new().load_directory(missing.path()).is_err());
    }

    #[test]
    fn test_fingerprint_tracks_content_and_map() {
        let temp = assert_fs::TempDir::new().unwrap();
        let household = temp.child("household.json");
        household.write_str(HOUSEHOLD).unwrap();

        let loader = MetadataLoader::new();
        let first = loader.load_directory(temp.path()).unwrap();
        let again = loader.load_directory(temp.path()).unwrap();
        assert_eq!(first.fingerprint(None).unwrap(), again.fingerprint(None).unwrap());

        let map = SubprocessMap::new();
        assert_ne!(first.fingerprint(None).unwrap(), first.fingerprint(Some(&map)).unwrap());

        household
            .write_str(&HOUSEHOLD.replace("Household\"", "Household economy\""))
            .unwrap();
        let changed = loader.load_directory(temp.path()).unwrap();
        assert_ne!(first.fingerprint(None).unwrap(), changed.fingerprint(None).unwrap());
    }
}
