use std::sync::{Arc, Mutex};

use chrono::Utc;
use taskflow_core::error::StoreError;
use taskflow_core::session::Session;
use taskflow_core::store::TaskStore;
use taskflow_core::task::{Status, Task, TaskDraft};
use taskflow_core::view::{FilterState, StatusFilter};
use uuid::Uuid;

/// Server stand-in: the same contract as the HTTP store, held in memory.
#[derive(Clone, Default)]
struct MemStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    tasks: Mutex<Vec<Task>>,
    calls: Mutex<usize>,
    list_down: Mutex<bool>,
}

impl MemStore {
    fn seed(&self, title: &str, description: &str, status: Status) -> Uuid {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            status,
            deadline: None,
            created_at: now,
            updated_at: now,
        };
        let id = task.id;
        self.inner.tasks.lock().expect("lock").push(task);
        id
    }

    fn calls(&self) -> usize {
        *self.inner.calls.lock().expect("lock")
    }

    fn set_list_down(&self, down: bool) {
        *self.inner.list_down.lock().expect("lock") = down;
    }

    fn record_call(&self) {
        *self.inner.calls.lock().expect("lock") += 1;
    }
}

impl TaskStore for MemStore {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.record_call();
        if *self.inner.list_down.lock().expect("lock") {
            return Err(StoreError::Transport("simulated outage".to_string()));
        }
        Ok(self.inner.tasks.lock().expect("lock").clone())
    }

    async fn get_task(&self, id: Uuid) -> Result<Task, StoreError> {
        self.record_call();
        self.inner
            .tasks
            .lock()
            .expect("lock")
            .iter()
            .find(|task| task.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<Task, StoreError> {
        self.record_call();
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            status: draft.status,
            deadline: draft.deadline,
            created_at: now,
            updated_at: now,
        };
        self.inner.tasks.lock().expect("lock").push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: Uuid, draft: &TaskDraft) -> Result<Task, StoreError> {
        self.record_call();
        let mut tasks = self.inner.tasks.lock().expect("lock");
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or(StoreError::NotFound(id))?;

        task.title = draft.title.clone();
        task.description = draft.description.clone();
        task.status = draft.status;
        task.deadline = draft.deadline;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn delete_task(&self, id: Uuid) -> Result<(), StoreError> {
        self.record_call();
        let mut tasks = self.inner.tasks.lock().expect("lock");
        let idx = tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or(StoreError::NotFound(id))?;
        tasks.remove(idx);
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: Status) -> Result<Task, StoreError> {
        self.record_call();
        let mut tasks = self.inner.tasks.lock().expect("lock");
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or(StoreError::NotFound(id))?;

        task.status = status;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }
}

#[tokio::test]
async fn create_refetches_the_snapshot() {
    let store = MemStore::default();
    let mut session = Session::new(store.clone());

    let created = session
        .create(TaskDraft {
            title: "Buy milk".to_string(),
            ..TaskDraft::default()
        })
        .await
        .expect("create");

    assert_eq!(session.snapshot().len(), 1);
    assert_eq!(session.snapshot()[0].id, created.id);
    assert_eq!(session.snapshot()[0].status, Status::Pending);
}

#[tokio::test]
async fn blank_title_is_rejected_before_any_store_call() {
    let store = MemStore::default();
    let mut session = Session::new(store.clone());

    let err = session
        .create(TaskDraft {
            title: "   ".to_string(),
            ..TaskDraft::default()
        })
        .await
        .expect_err("blank title must fail");

    assert!(matches!(err, StoreError::Validation(_)));
    assert_eq!(store.calls(), 0);
    assert!(session.snapshot().is_empty());
}

#[tokio::test]
async fn deleting_a_missing_id_keeps_the_previous_view() {
    let store = MemStore::default();
    store.seed("Buy milk", "", Status::Pending);

    let mut session = Session::new(store.clone());
    session.refresh().await.expect("refresh");
    let before = session.snapshot().to_vec();

    let err = session
        .delete(Uuid::new_v4())
        .await
        .expect_err("missing id must fail");

    assert!(matches!(err, StoreError::NotFound(_)));
    assert_eq!(session.snapshot(), before.as_slice());
}

#[tokio::test]
async fn status_change_shows_up_after_the_refetch() {
    let store = MemStore::default();
    let id = store.seed("Buy milk", "", Status::Pending);

    let mut session = Session::new(store.clone());
    session.refresh().await.expect("refresh");

    session
        .set_status(id, Status::Completed)
        .await
        .expect("set status");

    let task = session
        .snapshot()
        .iter()
        .find(|task| task.id == id)
        .expect("task still listed");
    assert_eq!(task.status, Status::Completed);
}

#[tokio::test]
async fn transport_failure_leaves_the_last_known_snapshot() {
    let store = MemStore::default();
    store.seed("Buy milk", "", Status::Pending);

    let mut session = Session::new(store.clone());
    session.refresh().await.expect("refresh");
    let before = session.snapshot().to_vec();

    store.set_list_down(true);
    let err = session.refresh().await.expect_err("outage must surface");
    assert!(matches!(err, StoreError::Transport(_)));
    assert_eq!(session.snapshot(), before.as_slice());

    // A mutation whose mandatory refetch fails also reports the failure
    // and keeps the old view; the next successful refresh resyncs.
    let err = session
        .create(TaskDraft {
            title: "Write report".to_string(),
            ..TaskDraft::default()
        })
        .await
        .expect_err("refetch failure must surface");
    assert!(matches!(err, StoreError::Transport(_)));
    assert_eq!(session.snapshot(), before.as_slice());

    store.set_list_down(false);
    session.refresh().await.expect("refresh");
    assert_eq!(session.snapshot().len(), 2);
}

#[tokio::test]
async fn edit_replaces_mutable_fields() {
    let store = MemStore::default();
    let id = store.seed("Write report", "draft", Status::Pending);

    let mut session = Session::new(store.clone());
    session.refresh().await.expect("refresh");

    session
        .edit(
            id,
            TaskDraft {
                title: "Write quarterly report".to_string(),
                description: "final numbers".to_string(),
                status: Status::InProgress,
                deadline: None,
            },
        )
        .await
        .expect("edit");

    let task = &session.snapshot()[0];
    assert_eq!(task.title, "Write quarterly report");
    assert_eq!(task.description, "final numbers");
    assert_eq!(task.status, Status::InProgress);
}

#[tokio::test]
async fn views_over_the_snapshot_match_the_search_and_filter_contract() {
    let store = MemStore::default();
    store.seed("Buy milk", "", Status::Pending);
    store.seed("Write report", "quarterly", Status::Completed);

    let mut session = Session::new(store.clone());
    session.refresh().await.expect("refresh");

    let searched = session.view(&FilterState {
        query: "report".to_string(),
        status: StatusFilter::All,
    });
    assert_eq!(searched.visible.len(), 1);
    assert_eq!(searched.visible[0].title, "Write report");
    assert_eq!(searched.counts.total, 2);
    assert_eq!(searched.counts.pending, 1);
    assert_eq!(searched.counts.in_progress, 0);
    assert_eq!(searched.counts.completed, 1);

    let pending_only = session.view(&FilterState {
        query: String::new(),
        status: StatusFilter::Only(Status::Pending),
    });
    assert_eq!(pending_only.visible.len(), 1);
    assert_eq!(pending_only.visible[0].title, "Buy milk");
}
