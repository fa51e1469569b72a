//! Schema registry: loads `<name>.json` files from a directory, caches them
//! in memory for the life of the process.

use docflow_core::error::{DocflowError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub struct SchemaRegistry {
    root: PathBuf,
    cache: RwLock<HashMap<String, Value>>,
}

impl SchemaRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Load (or return cached) schema by version stem, e.g. `invoice_v1`.
    pub fn get_schema(&self, schema_version: &str) -> Result<Value> {
        if let Some(cached) = self.cache.read().unwrap().get(schema_version) {
            return Ok(cached.clone());
        }

        let path = self.root.join(format!("{schema_version}.json"));
        let schema = load_schema_file(&path, schema_version)?;

        self.cache
            .write()
            .unwrap()
            .insert(schema_version.to_string(), schema.clone());

        tracing::info!(schema_version, path = %path.display(), "loaded schema");
        Ok(schema)
    }

    /// Sorted list of schema version stems available in the registry directory.
    pub fn list_schemas(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let entries = std::fs::read_dir(&self.root)
            .map_err(|e| DocflowError::schema_registry(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| DocflowError::schema_registry(e.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn clear_cache(&self) {
        self.cache.write().unwrap().clear();
    }
}

fn load_schema_file(path: &Path, schema_version: &str) -> Result<Value> {
    if !path.exists() {
        return Err(DocflowError::schema_registry(format!(
            "schema not found: {schema_version}"
        ))
        .detail("schema_version", schema_version)
        .detail("path", path.display().to_string()));
    }

    let contents = std::fs::read_to_string(path).map_err(|e| {
        DocflowError::schema_registry(format!("failed to read schema: {schema_version}"))
            .detail("error", e.to_string())
    })?;

    let schema: Value = serde_json::from_str(&contents).map_err(|e| {
        DocflowError::schema_registry(format!("invalid JSON in schema: {schema_version}"))
            .detail("error", e.to_string())
    })?;

    if !schema.is_object() {
        return Err(DocflowError::schema_registry(format!(
            "invalid schema format: {schema_version}"
        )));
    }

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_schema_is_a_registry_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaRegistry::new(dir.path());
        let err = registry.get_schema("does_not_exist").unwrap_err();
        assert_eq!(err.kind(), docflow_core::error::ErrorKind::SchemaRegistry);
    }

    #[test]
    fn valid_schema_loads_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("invoice_v1.json"), r#"{"type":"object"}"#).unwrap();
        let registry = SchemaRegistry::new(dir.path());

        let first = registry.get_schema("invoice_v1").unwrap();
        assert_eq!(first, serde_json::json!({"type": "object"}));

        // Delete the file; a cached read must still succeed.
        fs::remove_file(dir.path().join("invoice_v1.json")).unwrap();
        let second = registry.get_schema("invoice_v1").unwrap();
        assert_eq!(second, first);
    }

    #[test]
    fn malformed_json_is_a_registry_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let registry = SchemaRegistry::new(dir.path());
        assert!(registry.get_schema("bad").is_err());
    }

    #[test]
    fn list_schemas_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        let registry = SchemaRegistry::new(dir.path());
        assert_eq!(registry.list_schemas().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn clear_cache_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("s.json"), r#"{"type":"object"}"#).unwrap();
        let registry = SchemaRegistry::new(dir.path());
        registry.get_schema("s").unwrap();
        registry.clear_cache();
        fs::remove_file(dir.path().join("s.json")).unwrap();
        assert!(registry.get_schema("s").is_err());
    }
}
