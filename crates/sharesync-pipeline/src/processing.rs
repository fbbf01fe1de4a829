// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-stage registry of items currently being processed.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sharesync_core::{QueueItemId, QueueKind, SyncError};

type Reservations = HashMap<QueueKind, HashSet<QueueItemId>>;

/// Tracks which queue items each stage is working on.
///
/// Clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct ProcessingRegistry {
    inner: Arc<Mutex<Reservations>>,
}

impl ProcessingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Reservations> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve `id` for `stage`. Fails if the stage is already processing it.
    pub fn reserve(
        &self,
        stage: QueueKind,
        id: &QueueItemId,
    ) -> Result<ProcessingGuard, SyncError> {
        let mut reservations = self.lock();
        if !reservations.entry(stage).or_default().insert(id.clone()) {
            return Err(SyncError::AlreadyProcessing {
                identifier: id.to_string(),
            });
        }
        Ok(ProcessingGuard {
            registry: self.clone(),
            stage,
            id: id.clone(),
        })
    }

    pub fn in_flight(&self, stage: QueueKind) -> usize {
        self.lock().get(&stage).map_or(0, HashSet::len)
    }

    pub fn is_processing(&self, stage: QueueKind, id: &QueueItemId) -> bool {
        self.lock().get(&stage).is_some_and(|ids| ids.contains(id))
    }

    fn release(&self, stage: QueueKind, id: &QueueItemId) {
        if let Some(ids) = self.lock().get_mut(&stage) {
            ids.remove(id);
        }
    }
}

/// Releases its reservation when dropped.
#[derive(Debug)]
pub struct ProcessingGuard {
    registry: ProcessingRegistry,
    stage: QueueKind,
    id: QueueItemId,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.registry.release(self.stage, &self.id);
    }
}
