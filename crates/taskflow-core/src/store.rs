use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::task::{Status, Task, TaskDraft};

/// The remote task collection. One implementation talks HTTP; tests
/// substitute an in-memory one. No caching here beyond what the caller
/// keeps; every call goes to the store.
#[allow(async_fn_in_trait)]
pub trait TaskStore {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;

    async fn get_task(&self, id: Uuid) -> Result<Task, StoreError>;

    async fn create_task(&self, draft: &TaskDraft) -> Result<Task, StoreError>;

    /// Full replace of the identified task's mutable fields.
    async fn update_task(&self, id: Uuid, draft: &TaskDraft) -> Result<Task, StoreError>;

    /// Deleting an id that is already gone fails with `NotFound`, never
    /// silent success.
    async fn delete_task(&self, id: Uuid) -> Result<(), StoreError>;

    /// Narrow update touching only `status`.
    async fn set_status(&self, id: Uuid, status: Status) -> Result<Task, StoreError>;
}

#[derive(Debug, Clone)]
pub struct HttpTaskStore {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct StatusBody {
    status: Status,
}

impl HttpTaskStore {
    /// `base_url` is the API root, e.g. `http://localhost:8000/api`.
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Maps the response status before decoding: 404 becomes `NotFound`
    /// for the id being addressed, anything else non-2xx is transport
    /// failure.
    async fn check(&self, response: Response, id: Option<Uuid>) -> Result<Response, StoreError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND
            && let Some(id) = id
        {
            warn!(%id, "task no longer exists server-side");
            return Err(StoreError::NotFound(id));
        }
        if !status.is_success() {
            return Err(StoreError::Transport(format!(
                "server returned {status} for {}",
                response.url()
            )));
        }
        Ok(response)
    }
}

impl TaskStore for HttpTaskStore {
    #[instrument(skip(self))]
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let response = self.client.get(self.url("/tasks")).send().await?;
        let tasks: Vec<Task> = self.check(response, None).await?.json().await?;
        debug!(count = tasks.len(), "fetched task list");
        Ok(tasks)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn get_task(&self, id: Uuid) -> Result<Task, StoreError> {
        let response = self
            .client
            .get(self.url(&format!("/tasks/{id}")))
            .send()
            .await?;
        let task = self.check(response, Some(id)).await?.json().await?;
        Ok(task)
    }

    #[instrument(skip(self, draft), fields(title_len = draft.title.len()))]
    async fn create_task(&self, draft: &TaskDraft) -> Result<Task, StoreError> {
        let response = self
            .client
            .post(self.url("/tasks"))
            .json(draft)
            .send()
            .await?;
        let task: Task = self.check(response, None).await?.json().await?;
        info!(id = %task.id, "task created");
        Ok(task)
    }

    #[instrument(skip(self, draft), fields(id = %id))]
    async fn update_task(&self, id: Uuid, draft: &TaskDraft) -> Result<Task, StoreError> {
        let response = self
            .client
            .put(self.url(&format!("/tasks/{id}")))
            .json(draft)
            .send()
            .await?;
        let task = self.check(response, Some(id)).await?.json().await?;
        info!(%id, "task updated");
        Ok(task)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete_task(&self, id: Uuid) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.url(&format!("/tasks/{id}")))
            .send()
            .await?;
        // The server answers with a confirmation body; nothing in it is
        // needed client-side.
        self.check(response, Some(id)).await?;
        info!(%id, "task deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(id = %id, status = %status))]
    async fn set_status(&self, id: Uuid, status: Status) -> Result<Task, StoreError> {
        let response = self
            .client
            .patch(self.url(&format!("/tasks/{id}/status")))
            .json(&StatusBody { status })
            .send()
            .await?;
        let task = self.check(response, Some(id)).await?.json().await?;
        info!(%id, %status, "task status changed");
        Ok(task)
    }
}
