use crate::{
    domain::{BoardConfig, Item, ItemId},
    error::{BoardError, Result},
    storage::{ItemPatch, ItemStore},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// File-based item store: one JSON file per item plus the board config
pub struct FileStorage {
    root_path: PathBuf,
}

impl FileStorage {
    const PIPELINE_DIR: &'static str = ".pipeline";
    const ITEMS_DIR: &'static str = "items";
    const BOARD_FILE: &'static str = "board.json";

    /// Creates a new FileStorage instance for the given project root
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            root_path: project_root.as_ref().join(Self::PIPELINE_DIR),
        }
    }

    fn items_dir(&self) -> PathBuf {
        self.root_path.join(Self::ITEMS_DIR)
    }

    fn board_file(&self) -> PathBuf {
        self.root_path.join(Self::BOARD_FILE)
    }

    /// File of an item; ids that are not plain file names are rejected
    fn item_file(&self, id: &ItemId) -> Result<PathBuf> {
        let name = id.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
            return Err(BoardError::StorageError(format!(
                "item id '{id}' cannot be used as a file name"
            )));
        }
        Ok(self.items_dir().join(format!("{name}.json")))
    }

    async fn ensure_directory_exists(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).await?;
        }
        Ok(())
    }

    /// Creates the directory layout and a default board config
    pub async fn initialize(&self) -> Result<()> {
        self.ensure_directory_exists(&self.root_path).await?;
        self.ensure_directory_exists(&self.items_dir()).await?;

        if !self.board_file().exists() {
            self.save_board(&BoardConfig::default()).await?;
        }

        Ok(())
    }

    pub async fn is_initialized(&self) -> bool {
        self.root_path.exists() && self.board_file().exists()
    }

    pub async fn save_item(&self, item: &Item) -> Result<()> {
        let file_path = self.item_file(&item.id)?;
        self.ensure_directory_exists(&self.items_dir()).await?;

        let json = serde_json::to_string_pretty(item)?;
        fs::write(file_path, json).await?;
        Ok(())
    }

    pub async fn load_item(&self, id: &ItemId) -> Result<Item> {
        let file_path = self.item_file(id)?;

        if !file_path.exists() {
            return Err(BoardError::ItemNotFound(id.to_string()));
        }

        let contents = fs::read_to_string(&file_path).await?;
        let item: Item = serde_json::from_str(&contents)?;
        Ok(item)
    }

    pub async fn delete_item(&self, id: &ItemId) -> Result<()> {
        let file_path = self.item_file(id)?;

        if !file_path.exists() {
            return Err(BoardError::ItemNotFound(id.to_string()));
        }

        fs::remove_file(file_path).await?;
        Ok(())
    }

    pub async fn save_board(&self, board: &BoardConfig) -> Result<()> {
        self.ensure_directory_exists(&self.root_path).await?;

        let json = serde_json::to_string_pretty(board)?;
        fs::write(self.board_file(), json).await?;
        Ok(())
    }

    pub async fn load_board(&self) -> Result<BoardConfig> {
        let board_file = self.board_file();

        if !board_file.exists() {
            return Err(BoardError::NotInitialized);
        }

        let contents = fs::read_to_string(&board_file).await?;
        let board: BoardConfig = serde_json::from_str(&contents)?;
        board.engine.validate()?;
        Ok(board)
    }
}

#[async_trait]
impl ItemStore for FileStorage {
    async fn update_one(&self, id: &ItemId, patch: &ItemPatch) -> Result<()> {
        let item = self.load_item(id).await?;
        self.save_item(&patch.apply(&item)).await
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        let items_dir = self.items_dir();

        if !items_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&items_dir).await?;
        let mut items = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let contents = fs::read_to_string(&path).await?;
            match serde_json::from_str::<Item>(&contents) {
                Ok(item) => items.push(item),
                Err(e) => {
                    tracing::warn!("Skipping unreadable item file {}: {e}", path.display());
                }
            }
        }

        // Highest order first, the way columns display
        items.sort_by(|a, b| {
            b.order
                .partial_cmp(&a.order)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ColumnId, OrderField};
    use chrono::Utc;
    use tempfile::TempDir;

    async fn storage() -> (TempDir, FileStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());
        storage.initialize().await.unwrap();
        (temp_dir, storage)
    }

    #[tokio::test]
    async fn test_storage_initialization() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        assert!(!storage.is_initialized().await);

        storage.initialize().await.unwrap();

        assert!(storage.is_initialized().await);
        assert!(storage.items_dir().exists());
        assert!(storage.board_file().exists());
    }

    #[tokio::test]
    async fn test_item_save_and_load() {
        let (_dir, storage) = storage().await;

        let item = Item::new("L1", Some(ColumnId::from("new")), 1000.0)
            .with_attribute("title", "Acme Corp");
        storage.save_item(&item).await.unwrap();

        let loaded = storage.load_item(&item.id).await.unwrap();
        assert_eq!(loaded, item);
    }

    #[tokio::test]
    async fn test_load_missing_item() {
        let (_dir, storage) = storage().await;
        let result = storage.load_item(&ItemId::from("nope")).await;
        assert!(matches!(result, Err(BoardError::ItemNotFound(_))));
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let (_dir, storage) = storage().await;
        let patch = ItemPatch {
            column_key: None,
            field: OrderField::Order,
            order: 1.0,
            status_updated_at: None,
        };

        for bad in ["../board", "", ".", "..", "a/b", "a\\b"] {
            let id = ItemId::from(bad);
            assert!(matches!(
                storage.save_item(&Item::new(bad, None, 1.0)).await,
                Err(BoardError::StorageError(_))
            ));
            assert!(matches!(
                storage.load_item(&id).await,
                Err(BoardError::StorageError(_))
            ));
            assert!(matches!(
                storage.delete_item(&id).await,
                Err(BoardError::StorageError(_))
            ));
            assert!(matches!(
                storage.update_one(&id, &patch).await,
                Err(BoardError::StorageError(_))
            ));
        }

        // The board config next to the items directory is untouched
        assert!(storage.is_initialized().await);
        assert!(storage.load_board().await.is_ok());
    }

    #[tokio::test]
    async fn test_update_one_moves_item() {
        let (_dir, storage) = storage().await;
        storage
            .save_item(&Item::new("L1", Some(ColumnId::from("new")), 10.0))
            .await
            .unwrap();

        let patch = ItemPatch {
            column_key: Some(ColumnId::from("won")),
            field: OrderField::Order,
            order: 1005.0,
            status_updated_at: Some(Utc::now()),
        };
        storage.update_one(&ItemId::from("L1"), &patch).await.unwrap();

        let loaded = storage.load_item(&ItemId::from("L1")).await.unwrap();
        assert_eq!(loaded.column_key, Some(ColumnId::from("won")));
        assert_eq!(loaded.order, 1005.0);
        assert!(loaded.status_updated_at.is_some());
    }

    #[tokio::test]
    async fn test_update_one_missing_item() {
        let (_dir, storage) = storage().await;
        let patch = ItemPatch {
            column_key: None,
            field: OrderField::Order,
            order: 1.0,
            status_updated_at: None,
        };
        assert!(storage
            .update_one(&ItemId::from("ghost"), &patch)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_list_items_highest_order_first() {
        let (_dir, storage) = storage().await;
        for (id, order) in [("L1", 10.0), ("L2", 30.0), ("L3", 20.0)] {
            storage
                .save_item(&Item::new(id, Some(ColumnId::from("new")), order))
                .await
                .unwrap();
        }

        let items = storage.list_items().await.unwrap();
        let ids: Vec<_> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["L2", "L3", "L1"]);
    }

    #[tokio::test]
    async fn test_list_items_skips_foreign_files() {
        let (_dir, storage) = storage().await;
        storage
            .save_item(&Item::new("L1", None, 1.0))
            .await
            .unwrap();
        fs::write(storage.items_dir().join("notes.txt"), "hello")
            .await
            .unwrap();
        fs::write(storage.items_dir().join("broken.json"), "{")
            .await
            .unwrap();

        let items = storage.list_items().await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_item() {
        let (_dir, storage) = storage().await;
        let item = Item::new("L1", None, 1.0);
        storage.save_item(&item).await.unwrap();

        storage.delete_item(&item.id).await.unwrap();
        assert!(storage.load_item(&item.id).await.is_err());
        assert!(storage.delete_item(&item.id).await.is_err());
    }

    #[tokio::test]
    async fn test_board_save_and_load() {
        let (_dir, storage) = storage().await;

        let loaded = storage.load_board().await.unwrap();
        assert_eq!(loaded, BoardConfig::default());

        let mut board = BoardConfig::default();
        board.name = "Partners".to_string();
        board.engine.overscan = 6;
        storage.save_board(&board).await.unwrap();

        let loaded = storage.load_board().await.unwrap();
        assert_eq!(loaded.name, "Partners");
        assert_eq!(loaded.engine.overscan, 6);
    }

    #[tokio::test]
    async fn test_load_board_uninitialized() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());
        assert!(matches!(
            storage.load_board().await,
            Err(BoardError::NotInitialized)
        ));
    }
}
