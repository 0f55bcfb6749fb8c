//! Local settings file store
//!
//! Reads and writes pulled settings under a [`LocalLayout`]. Writes go to a
//! temporary file in the destination directory and are renamed into place,
//! so readers never see a partially written file.

use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::descriptor::FileType;
use crate::domain::layout::LocalLayout;
use crate::error::StoreError;

const JS_PREFIX: &str = "module.exports = ";

#[derive(Debug, Clone)]
pub struct LocalStore {
    layout: LocalLayout,
}

impl LocalStore {
    pub fn new(layout: LocalLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &LocalLayout {
        &self.layout
    }

    /// Load the settings previously pulled for one endpoint
    pub fn load(&self, app_name: &str, command: &str) -> Result<Value, StoreError> {
        self.load_path(&self.layout.command_file(app_name, command, false))
    }

    pub fn load_path(&self, path: &Path) -> Result<Value, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.display().to_string(),
            source,
        })?;
        decode(&content, self.layout.file_type).map_err(|message| StoreError::Invalid {
            path: path.display().to_string(),
            message,
        })
    }

    /// Write a JSON document in the configured file type
    pub fn save(&self, path: &Path, value: &Value) -> Result<PathBuf, StoreError> {
        let content = encode(value, self.layout.file_type).map_err(|message| StoreError::Invalid {
            path: path.display().to_string(),
            message,
        })?;
        self.save_bytes(path, content.as_bytes())
    }

    /// Write raw bytes, creating parent directories
    pub fn save_bytes(&self, path: &Path, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let write_error = |source| StoreError::Write {
            path: path.display().to_string(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(write_error)?;

        let mut file = tempfile::NamedTempFile::new_in(&dir).map_err(write_error)?;
        file.write_all(bytes).map_err(write_error)?;
        file.persist(path).map_err(|e| write_error(e.error))?;
        Ok(path.to_path_buf())
    }
}

fn encode(value: &Value, file_type: FileType) -> Result<String, String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    Ok(match file_type {
        FileType::Json => format!("{}\n", json),
        FileType::Js => format!("{}{}\n", JS_PREFIX, json),
    })
}

fn decode(content: &str, file_type: FileType) -> Result<Value, String> {
    let body = match file_type {
        FileType::Json => content,
        FileType::Js => content
            .trim_start()
            .strip_prefix(JS_PREFIX)
            .ok_or_else(|| format!("expected '{}' module", JS_PREFIX.trim_end()))?
            .trim_end()
            .trim_end_matches(';'),
    };
    serde_json::from_str(body).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(root: &Path, file_type: FileType) -> LocalStore {
        LocalStore::new(LocalLayout {
            location: Some(root.to_path_buf()),
            env_location: None,
            environment: Some("dev".to_string()),
            file_type,
        })
    }

    #[test]
    fn test_save_creates_directories_and_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), FileType::Json);
        let path = store.layout().command_file("orders", "app/views.json", false);

        store.save(&path, &json!({ "views": {} })).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.ends_with("}\n"));
        assert_eq!(store.load("orders", "app/views.json").unwrap(), json!({ "views": {} }));
    }

    #[test]
    fn test_js_module_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), FileType::Js);
        let path = store.layout().command_file("orders", "app/views.json", false);
        assert!(path.to_string_lossy().ends_with("app_views.js"));

        store.save(&path, &json!({ "views": { "All": {} } })).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("module.exports = {"));
        assert_eq!(
            store.load("orders", "app/views.json").unwrap(),
            json!({ "views": { "All": {} } })
        );
    }

    #[test]
    fn test_load_missing_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), FileType::Json);
        assert!(matches!(
            store.load("orders", "app.json"),
            Err(StoreError::Read { .. })
        ));

        let path = store.layout().command_file("orders", "app.json", false);
        store.save_bytes(&path, b"not json").unwrap();
        assert!(matches!(
            store.load("orders", "app.json"),
            Err(StoreError::Invalid { .. })
        ));
    }
}
