use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::Response;
use tokio::io::AsyncWriteExt;

use super::{record_path, ConsoleClient};
use crate::errors::ConsoleError;
use crate::models::{Page, PageRequest, Task, TaskFilter, TaskStatus};
use crate::sync::{ListSource, RecordSource};

#[derive(Clone)]
pub struct TasksApi {
    client: ConsoleClient,
}

impl TasksApi {
    pub(crate) fn new(client: ConsoleClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, filter: &TaskFilter, page: PageRequest) -> Result<Page<Task>, ConsoleError> {
        self.client.get_page("/tasks", filter, page).await
    }

    pub async fn get(&self, id: &str) -> Result<Task, ConsoleError> {
        self.client.get_json(&record_path("tasks", id, None)?).await
    }

    /// Video or image bytes of a completed task. Refused locally for any
    /// other status; the backend would answer 400.
    pub async fn content(&self, task: &Task) -> Result<Content, ConsoleError> {
        if task.status != TaskStatus::Completed {
            return Err(ConsoleError::InvalidState(format!(
                "task {} is {}, content is only available once completed",
                task.id,
                task.status.as_str()
            )));
        }
        let path = record_path("tasks", &task.id, Some("content"))?;
        let resp = self.client.get_content(&path).await?;
        Ok(Content::new(resp))
    }
}

#[async_trait]
impl ListSource for TasksApi {
    type Filter = TaskFilter;
    type Item = Task;

    async fn fetch_page(&self, filter: &TaskFilter, page: PageRequest) -> Result<Page<Task>, ConsoleError> {
        self.list(filter, page).await
    }
}

#[async_trait]
impl RecordSource for TasksApi {
    type Item = Task;

    async fn fetch_record(&self, id: &String) -> Result<Task, ConsoleError> {
        self.get(id).await
    }
}

/// A binary body (task content, character avatar) not yet read.
#[derive(Debug)]
pub struct Content {
    content_type: Option<String>,
    content_length: Option<u64>,
    response: Response,
}

impl Content {
    pub(crate) fn new(response: Response) -> Self {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Self {
            content_type,
            content_length: response.content_length(),
            response,
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub async fn bytes(self) -> Result<Bytes, ConsoleError> {
        Ok(self.response.bytes().await?)
    }

    /// Stream the body to `path` chunk by chunk. Returns the bytes written.
    ///
    /// The bytes land in a `.part` sibling that is renamed over `path` only
    /// once the whole body arrived; an interrupted download leaves nothing.
    pub async fn save(self, path: &Path) -> Result<u64, ConsoleError> {
        let partial = partial_path(path);
        let result = async {
            let written = self.stream_to(&partial).await?;
            tokio::fs::rename(&partial, path).await?;
            Ok::<_, ConsoleError>(written)
        }
        .await;

        match result {
            Ok(written) => {
                tracing::info!(path = %path.display(), bytes = written, "content saved");
                Ok(written)
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(path = %partial.display(), error = %cleanup, "could not remove partial download");
                    }
                }
                tracing::warn!(path = %path.display(), error = %e, "content download interrupted");
                Err(e)
            }
        }
    }

    async fn stream_to(self, path: &Path) -> Result<u64, ConsoleError> {
        let mut file = tokio::fs::File::create(path).await?;
        let mut stream = self.response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
