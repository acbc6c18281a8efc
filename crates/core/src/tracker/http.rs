//! HTTP client for the task tracker REST API

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use tracing::{debug, trace};

use super::model::{
    Ack, AccessRequest, CreateWorkerRequest, Envelope, LogLevel, LogRequest, ProjectsContent,
    ReleaseRequest, SecretContent, TaskContent, WorkerContent,
};
use super::{TaskFetch, TaskTracker, NO_TASK_AVAILABLE};
use crate::error::Error;
use crate::project::{Project, ProjectId};
use crate::worker::WorkerIdentity;
use crate::Result;

/// Task tracker client speaking JSON over HTTP
#[derive(Clone)]
pub struct HttpTaskTracker {
    client: Client,
    base_url: String,
    worker: Option<Arc<WorkerIdentity>>,
}

impl HttpTaskTracker {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("task-tracker-drone/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            worker: None,
        }
    }

    /// Authenticate subsequent requests as `identity`
    pub fn with_worker(mut self, identity: WorkerIdentity) -> Self {
        self.worker = Some(Arc::new(identity));
        self
    }

    pub fn worker(&self) -> Option<&WorkerIdentity> {
        self.worker.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.worker {
            Some(worker) => request
                .header("X-Worker-Id", worker.id.to_string())
                .header("X-Secret", worker.encoded_secret()),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>> {
        debug!("GET {}", path);
        let response = self.authorize(self.client.get(self.url(path))).send().await?;
        decode(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>> {
        debug!("POST {}", path);
        let response = self
            .authorize(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await?;
        decode(response).await
    }
}

/// Parse the response envelope.
///
/// The tracker reports most refusals as `ok=false` envelopes, sometimes with
/// a non-2xx status, so the body wins whenever it parses.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<Envelope<T>> {
    let status = response.status();
    let body = response.text().await?;
    trace!(status = status.as_u16(), "tracker response: {}", body);

    match serde_json::from_str::<Envelope<T>>(&body) {
        Ok(envelope) => Ok(envelope),
        Err(_) if !status.is_success() => Err(Error::Http {
            status: status.as_u16(),
            message: body.trim().to_string(),
        }),
        Err(e) => Err(Error::Serialization(e)),
    }
}

#[async_trait]
impl TaskTracker for HttpTaskTracker {
    async fn register_worker(&self, alias: &str) -> Result<WorkerIdentity> {
        let envelope: Envelope<WorkerContent> = self
            .post("/worker/create", &CreateWorkerRequest { alias })
            .await?;
        Ok(envelope.into_content("worker")?.worker)
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let envelope: Envelope<ProjectsContent> = self.get("/project/list").await?;
        Ok(envelope.into_content("projects")?.projects)
    }

    async fn project_secret(&self, project: ProjectId) -> Result<String> {
        let envelope: Envelope<SecretContent> =
            self.get(&format!("/project/secret/{}", project)).await?;
        Ok(envelope.into_content("secret")?.secret)
    }

    async fn request_access(&self, request: AccessRequest) -> Result<Ack> {
        let envelope: Envelope<IgnoredAny> = self.post("/project/request_access", &request).await?;
        Ok(envelope.ack())
    }

    async fn fetch_task(&self, project: ProjectId) -> Result<TaskFetch> {
        let envelope: Envelope<TaskContent> = self.get(&format!("/task/get/{}", project)).await?;

        if !envelope.ok {
            if envelope.message == NO_TASK_AVAILABLE {
                return Ok(TaskFetch::Empty);
            }
            return Ok(TaskFetch::Rejected(envelope.message));
        }

        let task = envelope.into_content("task")?.task;
        Ok(TaskFetch::Assigned(task))
    }

    async fn release_task(&self, request: ReleaseRequest) -> Result<Ack> {
        let envelope: Envelope<IgnoredAny> = self.post("/task/release", &request).await?;
        Ok(envelope.ack())
    }

    async fn log(&self, level: LogLevel, message: &str) -> Result<Ack> {
        let request = LogRequest {
            message,
            timestamp: chrono::Utc::now().timestamp(),
        };
        let envelope: Envelope<IgnoredAny> = self
            .post(&format!("/log/{}", level.as_str()), &request)
            .await?;
        Ok(envelope.ack())
    }
}
