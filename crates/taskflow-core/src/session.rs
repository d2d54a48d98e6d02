use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::TaskStore;
use crate::task::{Status, Task, TaskDraft};
use crate::view::{FilterState, View, derive};

/// Orchestrates user intents against the store and owns the last-known-good
/// snapshot. Every mutation is followed by a mandatory full re-fetch, so the
/// held snapshot never diverges from the server's truth; on any failure the
/// previous snapshot stays exactly as it was.
pub struct Session<S> {
    store: S,
    snapshot: Vec<Task>,
}

impl<S: TaskStore> Session<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            snapshot: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> &[Task] {
        &self.snapshot
    }

    /// Pure read over the held snapshot; call freely on every filter change.
    pub fn view(&self, filter: &FilterState) -> View {
        derive(&self.snapshot, filter)
    }

    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        let tasks = self.store.list_tasks().await?;
        debug!(count = tasks.len(), "snapshot refreshed");
        self.snapshot = tasks;
        Ok(())
    }

    /// Read-through for a single task; does not touch the snapshot.
    pub async fn fetch(&self, id: Uuid) -> Result<Task, StoreError> {
        self.store.get_task(id).await
    }

    #[instrument(skip(self, draft), fields(title_len = draft.title.len()))]
    pub async fn create(&mut self, draft: TaskDraft) -> Result<Task, StoreError> {
        validate_draft(&draft)?;
        let created = self.store.create_task(&draft).await?;
        self.refresh().await?;
        info!(id = %created.id, "create intent completed");
        Ok(created)
    }

    #[instrument(skip(self, draft), fields(id = %id))]
    pub async fn edit(&mut self, id: Uuid, draft: TaskDraft) -> Result<Task, StoreError> {
        validate_draft(&draft)?;
        let updated = self.store.update_task(id, &draft).await?;
        self.refresh().await?;
        info!(%id, "edit intent completed");
        Ok(updated)
    }

    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.store.delete_task(id).await?;
        self.refresh().await?;
        info!(%id, "delete intent completed");
        Ok(())
    }

    #[instrument(skip(self), fields(id = %id, status = %status))]
    pub async fn set_status(&mut self, id: Uuid, status: Status) -> Result<Task, StoreError> {
        let updated = self.store.set_status(id, status).await?;
        self.refresh().await?;
        info!(%id, %status, "status intent completed");
        Ok(updated)
    }
}

/// Title must be non-empty after trimming; checked before any store call.
pub fn validate_draft(draft: &TaskDraft) -> Result<(), StoreError> {
    if draft.title.trim().is_empty() {
        return Err(StoreError::Validation("task title must not be empty"));
    }
    Ok(())
}
