//! Where fitted pipelines are kept between training and forecasting

use crate::entity::EntityTags;
use crate::error::{ManyModelsError, Result};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Serialized pipelines addressed by entity tags.
///
/// Storing under tags that already hold a model replaces it.
pub trait ModelStore {
    fn put(&mut self, tags: &EntityTags, model: &[u8]) -> Result<()>;

    fn get(&self, tags: &EntityTags) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryModelStore {
    models: HashMap<EntityTags, Vec<u8>>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl ModelStore for InMemoryModelStore {
    fn put(&mut self, tags: &EntityTags, model: &[u8]) -> Result<()> {
        self.models.insert(tags.clone(), model.to_vec());
        Ok(())
    }

    fn get(&self, tags: &EntityTags) -> Result<Vec<u8>> {
        self.models
            .get(tags)
            .cloned()
            .ok_or_else(|| ManyModelsError::ModelNotFound(tags.to_string()))
    }
}

/// One `<tags>.json` file per stored pipeline
#[derive(Debug, Clone)]
pub struct DirectoryModelStore {
    root: PathBuf,
}

impl DirectoryModelStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, tags: &EntityTags) -> PathBuf {
        self.root.join(format!("{}.json", tags.file_stem()))
    }
}

impl ModelStore for DirectoryModelStore {
    fn put(&mut self, tags: &EntityTags, model: &[u8]) -> Result<()> {
        let path = self.path_for(tags);
        fs::write(&path, model)?;
        debug!(path = %path.display(), bytes = model.len(), "Stored model");
        Ok(())
    }

    fn get(&self, tags: &EntityTags) -> Result<Vec<u8>> {
        match fs::read(self.path_for(tags)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(ManyModelsError::ModelNotFound(tags.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(store: &str) -> EntityTags {
        let mut tags = EntityTags::new();
        tags.insert("Store", store);
        tags.insert("Brand", "tropicana");
        tags.with_model_type("lr")
    }

    fn check_store(store: &mut dyn ModelStore) {
        assert!(matches!(
            store.get(&tags("2")),
            Err(ManyModelsError::ModelNotFound(_))
        ));

        store.put(&tags("2"), b"{\"v\":1}").unwrap();
        store.put(&tags("5"), b"{\"v\":5}").unwrap();
        store.put(&tags("2"), b"{\"v\":2}").unwrap();

        assert_eq!(store.get(&tags("2")).unwrap(), b"{\"v\":2}".to_vec());
        assert_eq!(store.get(&tags("5")).unwrap(), b"{\"v\":5}".to_vec());
    }

    #[test]
    fn test_in_memory_store() {
        let mut store = InMemoryModelStore::new();
        check_store(&mut store);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_directory_store_keeps_similar_tags_apart() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryModelStore::new(dir.path()).unwrap();
        let brand = |name: &str| {
            let mut tags = EntityTags::new();
            tags.insert("Brand", name);
            tags.with_model_type("lr")
        };

        store.put(&brand("minute maid"), b"model-a").unwrap();
        store.put(&brand("minute_maid"), b"model-b").unwrap();
        store.put(&brand("minute/maid"), b"model-c").unwrap();

        assert_eq!(store.get(&brand("minute maid")).unwrap(), b"model-a".to_vec());
        assert_eq!(store.get(&brand("minute_maid")).unwrap(), b"model-b".to_vec());
        assert_eq!(store.get(&brand("minute/maid")).unwrap(), b"model-c".to_vec());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[test]
    fn test_directory_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryModelStore::new(dir.path().join("models")).unwrap();
        check_store(&mut store);

        let expected = store.root().join("Brand-tropicana__ModelType-lr__Store-2.json");
        assert_eq!(store.path_for(&tags("2")), expected);
        assert!(expected.is_file());
    }
}
