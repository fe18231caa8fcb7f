//! Task collection endpoints. All of them require a session.

use chrono::{DateTime, Utc};
use reqwest::Method;
use taskflow_types::{NewTask, Receipt, Task};

use super::{ApiClient, ApiRequest, decode, decode_receipt};
use crate::error::ApiError;
use crate::store::CredentialStore;
use crate::validation;

fn task_request(method: Method, id: &str) -> ApiRequest {
    ApiRequest::new(method, "/task").segment(id)
}

impl<S: CredentialStore> ApiClient<S> {
    /// # Errors
    /// Returns the request error.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let response = self
            .send_authorized(&ApiRequest::new(Method::GET, "/task"))
            .await?;
        decode(response).await
    }

    /// Creates a task and returns it with its server-assigned id.
    ///
    /// # Errors
    /// [`ApiError::Validation`] (nothing sent) for a blank title or a due date
    /// that is not in the future, otherwise the request error.
    pub async fn add_task(&self, task: NewTask) -> Result<Task, ApiError> {
        self.add_task_at(task, Utc::now()).await
    }

    /// [`Self::add_task`] with an explicit submission time.
    ///
    /// # Errors
    /// See [`Self::add_task`].
    pub async fn add_task_at(&self, task: NewTask, now: DateTime<Utc>) -> Result<Task, ApiError> {
        validation::validate_new_task(&task, now)?;

        let request = ApiRequest::new(Method::POST, "/task").json(&Task::from(task))?;
        let response = self.send_authorized(&request).await?;
        decode(response).await
    }

    /// # Errors
    /// Returns the request error.
    pub async fn delete_task(&self, id: &str) -> Result<Receipt, ApiError> {
        let response = self
            .send_authorized(&task_request(Method::DELETE, id))
            .await?;
        decode_receipt(response).await
    }

    /// Flips `completed` on the server and returns the updated task.
    ///
    /// # Errors
    /// Returns the request error.
    pub async fn toggle_task_status(&self, id: &str) -> Result<Task, ApiError> {
        let response = self
            .send_authorized(&task_request(Method::PATCH, id))
            .await?;
        decode(response).await
    }
}
