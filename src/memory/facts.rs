//! Long-term facts: a small key/value map per user.
//!
//! Stored as pretty-printed JSON in `{facts_dir}/{user}_facts.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::{LucyError, Result};

use super::sanitize_user_id;

/// A user's facts, ordered by key.
pub type Facts = BTreeMap<String, String>;

/// Heading placed above the facts in the system prompt.
pub const FACTS_HEADING: &str = "**Hechos y Decisiones Recordadas**:";

/// Durable per-user key/value store.
pub trait FactStore: Send + Sync {
    /// All facts for `user_id`. Missing or unreadable records yield an
    /// empty map.
    fn get(&self, user_id: &str) -> Facts;

    /// Insert or overwrite one fact.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn set(&self, user_id: &str, key: &str, value: &str) -> Result<()>;

    /// Delete one fact. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn remove(&self, user_id: &str, key: &str) -> Result<()>;

    /// Render the facts for the system prompt, or an empty string if
    /// there are none.
    fn summary(&self, user_id: &str) -> String {
        render_summary(&self.get(user_id))
    }
}

/// Render facts as a heading followed by `- key: value` lines.
pub fn render_summary(facts: &Facts) -> String {
    if facts.is_empty() {
        return String::new();
    }
    let mut lines = vec![FACTS_HEADING.to_owned()];
    lines.extend(facts.iter().map(|(k, v)| format!("- {k}: {v}")));
    lines.join("\n")
}

/// JSON-file fact store.
#[derive(Debug)]
pub struct FileFactStore {
    root: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileFactStore {
    /// Open a store rooted at `root`, creating the directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// The directory holding fact files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        self.root
            .join(format!("{}_facts.json", sanitize_user_id(user_id)))
    }

    /// Read facts for reading only: an unreadable file is logged and
    /// treated as empty.
    fn load(&self, user_id: &str) -> Facts {
        self.try_load(user_id).unwrap_or_else(|e| {
            tracing::error!(user = user_id, error = %e, "failed to read facts");
            Facts::new()
        })
    }

    /// Read facts before a write. A missing file is empty; an unreadable
    /// or corrupt one is an error so it is never overwritten.
    fn try_load(&self, user_id: &str) -> Result<Facts> {
        let path = self.path_for(user_id);
        let body = match std::fs::read_to_string(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Facts::new()),
            Err(e) => {
                return Err(LucyError::Memory(format!(
                    "failed to read facts for {user_id}: {e}"
                )));
            }
        };
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&body)
            .map_err(|e| LucyError::Memory(format!("corrupt facts file for {user_id}: {e}")))?;
        Ok(map
            .into_iter()
            .map(|(k, v)| {
                let text = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, text)
            })
            .collect())
    }

    fn save(&self, user_id: &str, facts: &Facts) -> Result<()> {
        let body = serde_json::to_string_pretty(facts)
            .map_err(|e| LucyError::Memory(format!("failed to serialize facts: {e}")))?;
        let path = self.path_for(user_id);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, body)
            .and_then(|()| std::fs::rename(&tmp, &path))
            .map_err(|e| LucyError::Memory(format!("failed to save facts for {user_id}: {e}")))
    }
}

impl FactStore for FileFactStore {
    fn get(&self, user_id: &str) -> Facts {
        self.load(user_id)
    }

    fn set(&self, user_id: &str, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut facts = self.try_load(user_id)?;
        facts.insert(key.to_owned(), value.to_owned());
        self.save(user_id, &facts)?;
        tracing::debug!(user = user_id, key, "fact stored");
        Ok(())
    }

    fn remove(&self, user_id: &str, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut facts = self.try_load(user_id)?;
        if facts.remove(key).is_some() {
            self.save(user_id, &facts)?;
            tracing::debug!(user = user_id, key, "fact removed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn facts_survive_a_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        FileFactStore::new(dir.path())
            .unwrap()
            .set("u1", "k", "v")
            .unwrap();

        let reopened = FileFactStore::new(dir.path()).unwrap();
        let facts = reopened.get("u1");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts.get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn users_are_partitioned() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileFactStore::new(dir.path()).unwrap();
        store.set("a", "color", "azul").unwrap();
        assert!(store.get("b").is_empty());
    }

    #[test]
    fn remove_absent_key_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileFactStore::new(dir.path()).unwrap();
        store.remove("u", "nada").unwrap();
        store.set("u", "x", "1").unwrap();
        store.remove("u", "x").unwrap();
        assert!(store.get("u").is_empty());
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("u_facts.json"), "{not json").unwrap();
        let store = FileFactStore::new(dir.path()).unwrap();
        assert!(store.get("u").is_empty());
    }

    #[test]
    fn corrupt_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("u_facts.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileFactStore::new(dir.path()).unwrap();

        assert!(matches!(store.set("u", "k", "v"), Err(LucyError::Memory(_))));
        assert!(store.remove("u", "k").is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn non_string_values_are_stringified() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("u_facts.json"), r#"{"edad": 30}"#).unwrap();
        let store = FileFactStore::new(dir.path()).unwrap();
        assert_eq!(store.get("u").get("edad").map(String::as_str), Some("30"));
    }

    #[test]
    fn summary_lists_facts_under_heading() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileFactStore::new(dir.path()).unwrap();
        assert_eq!(store.summary("u"), "");
        store.set("u", "nombre", "Ana").unwrap();
        store.set("u", "color", "azul").unwrap();
        assert_eq!(
            store.summary("u"),
            "**Hechos y Decisiones Recordadas**:\n- color: azul\n- nombre: Ana"
        );
    }

    #[test]
    fn file_name_uses_sanitized_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileFactStore::new(dir.path()).unwrap();
        store.set("web:1/..", "k", "v").unwrap();
        assert!(dir.path().join("web:1_facts.json").exists());
    }
}
