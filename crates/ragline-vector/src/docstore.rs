use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use ragline_core::traits::DocStore;
use ragline_core::types::{DocId, DocumentUnit};
use ragline_core::{Error, Result};

#[derive(Default)]
pub struct MemoryDocStore {
    units: RwLock<HashMap<DocId, DocumentUnit>>,
}

impl MemoryDocStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocStore for MemoryDocStore {
    async fn put(&self, unit: DocumentUnit) -> Result<()> {
        self.units.write().insert(unit.id.clone(), unit);
        Ok(())
    }

    async fn get(&self, doc_id: &str) -> Result<DocumentUnit> {
        self.units.read().get(doc_id).cloned().ok_or_else(|| Error::NotFound(doc_id.to_string()))
    }

    async fn remove(&self, doc_id: &str) -> Result<bool> {
        Ok(self.units.write().remove(doc_id).is_some())
    }

    async fn clear(&self) -> Result<()> {
        self.units.write().clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.units.read().len())
    }
}
