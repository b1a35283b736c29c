use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::page::ListFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Video,
    Image,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Video => "video",
            TaskKind::Image => "image",
        }
    }

    /// File extension used when content is saved without an explicit name.
    pub fn extension(self) -> &'static str {
        match self {
            TaskKind::Video => "mp4",
            TaskKind::Image => "png",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Queued,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

/// One generation job. `id` is the console id; `sora_task_id` is upstream's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub sora_task_id: String,
    #[serde(default)]
    pub account_id: i64,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub prompt: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub image_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TaskKind>,
}

impl ListFilter for TaskFilter {
    fn polls(&self) -> bool {
        matches!(
            self.status,
            None | Some(TaskStatus::Queued) | Some(TaskStatus::InProgress)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_decodes_type_field() {
        let task: Task = serde_json::from_str(
            r#"{"id":"task_01","sora_task_id":"st_9","account_id":3,"type":"image",
                "model":"gpt-image","prompt":"a fox","status":"in_progress","progress":40,
                "created_at":"2026-10-01T10:00:00Z","updated_at":"2026-10-01T10:00:05Z"}"#,
        )
        .unwrap();
        assert_eq!(task.kind, TaskKind::Image);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.progress, 40);
        assert!(task.completed_at.is_none());
        assert!(task.error_message.is_empty());
    }

    #[test]
    fn test_filter_polling() {
        assert!(TaskFilter::default().polls());
        for status in [TaskStatus::Queued, TaskStatus::InProgress] {
            let f = TaskFilter {
                status: Some(status),
                ..Default::default()
            };
            assert!(f.polls(), "{:?} should poll", status);
        }
        for status in [TaskStatus::Completed, TaskStatus::Failed] {
            let f = TaskFilter {
                status: Some(status),
                kind: Some(TaskKind::Video),
            };
            assert!(!f.polls(), "{:?} should not poll", status);
        }
    }

    #[test]
    fn test_filter_query_uses_type_key() {
        let f = TaskFilter {
            status: None,
            kind: Some(TaskKind::Video),
        };
        assert_eq!(serde_json::to_value(&f).unwrap(), serde_json::json!({"type": "video"}));
    }
}
