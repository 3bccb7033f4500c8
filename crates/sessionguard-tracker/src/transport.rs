use std::cell::RefCell;

use crate::{HitModel, TrackerError};

/// Final destination of transmitted hits
pub trait Transport {
    fn deliver(&self, model: &HitModel) -> Result<(), TrackerError>;
}

/// Transport that keeps every delivered hit in memory
#[derive(Debug, Default)]
pub struct MemoryTransport {
    hits: RefCell<Vec<HitModel>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of delivered hits, oldest first
    pub fn hits(&self) -> Vec<HitModel> {
        self.hits.borrow().clone()
    }

    /// Hit types of delivered hits, oldest first
    pub fn hit_types(&self) -> Vec<String> {
        self.hits
            .borrow()
            .iter()
            .map(|hit| hit.hit_type().unwrap_or_default().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.hits.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.hits.borrow_mut().clear();
    }
}

impl Transport for MemoryTransport {
    fn deliver(&self, model: &HitModel) -> Result<(), TrackerError> {
        self.hits.borrow_mut().push(model.clone());
        Ok(())
    }
}
