use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::menu_planner::MenuRecord;
use crate::shopping_tracker::ShoppingListEntry;

/// Everything persisted per user. The core reads this once at the start of a
/// planning session and writes it back at the end; it never assumes a
/// specific backing store.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct UserData {
    #[serde(default)]
    pub available_ingredients: Vec<String>,
    #[serde(default)]
    pub menu_history: Vec<MenuRecord>,
    #[serde(default)]
    pub current_shopping_list: Vec<ShoppingListEntry>,
}

/// Uniform load/save contract over interchangeable persistence backends.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn load(&self, user_id: &str) -> Result<UserData>;
    async fn save(&self, user_id: &str, data: &UserData) -> Result<()>;
}

/// File-backed store: one pretty-printed JSON document per user under the
/// data directory. A missing file is an empty profile, not an error.
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        JsonFileStore {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    fn user_path(&self, user_id: &str) -> PathBuf {
        // Keep the file name predictable regardless of what the id contains.
        let safe: String = user_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.data_dir.join(format!("{}.json", safe))
    }
}

#[async_trait]
impl UserStore for JsonFileStore {
    async fn load(&self, user_id: &str) -> Result<UserData> {
        let path = self.user_path(user_id);
        match fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse user data at {:?}", path)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(UserData::default()),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to read user data at {:?}", path))
            }
        }
    }

    async fn save(&self, user_id: &str, data: &UserData) -> Result<()> {
        fs::create_dir_all(&self.data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {:?}", self.data_dir))?;
        let path = self.user_path(user_id);
        let contents =
            serde_json::to_string_pretty(data).context("Failed to serialize user data")?;
        fs::write(&path, contents)
            .await
            .with_context(|| format!("Failed to write user data to {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_loads_as_default() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        let data = store.load("nobody").await.unwrap();
        assert!(data.available_ingredients.is_empty());
        assert!(data.menu_history.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        let mut data = UserData::default();
        data.available_ingredients = vec!["rice".to_string(), "salt".to_string()];

        store.save("someone", &data).await.unwrap();
        let loaded = store.load("someone").await.unwrap();
        assert_eq!(loaded.available_ingredients, data.available_ingredients);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error_not_a_reset() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        tokio::fs::write(dir.path().join("broken.json"), "{not json")
            .await
            .unwrap();
        assert!(store.load("broken").await.is_err());
    }

    #[tokio::test]
    async fn user_ids_are_sanitized_into_file_names() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.save("user@example.com", &UserData::default()).await.unwrap();
        assert!(dir.path().join("user_example_com.json").exists());
    }
}
