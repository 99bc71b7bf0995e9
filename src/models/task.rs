use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_SCAN_TYPE: &str = "active";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Running => "Running",
            TaskStatus::Completed => "Completed",
            TaskStatus::Failed => "Failed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub target: String,
    pub status: TaskStatus,
    #[serde(rename = "workerID", default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    #[serde(default = "default_scan_type")]
    pub scan_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
}

fn default_scan_type() -> String {
    DEFAULT_SCAN_TYPE.to_string()
}

impl Task {
    pub fn new(id: String, target: String, scan_type: String) -> Self {
        Self {
            id,
            target,
            status: TaskStatus::Pending,
            worker_id: None,
            scan_type,
            assigned_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_only_transitions() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Running));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Failed));

        assert!(!TaskStatus::Running.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Running));
        assert!(!TaskStatus::Failed.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
    }

    #[test]
    fn test_task_json_uses_worker_id_key() {
        let mut task = Task::new("task-1".into(), "http://test.local".into(), "active".into());
        task.status = TaskStatus::Running;
        task.worker_id = Some("worker-a".into());

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["id"], "task-1");
        assert_eq!(json["status"], "Running");
        assert_eq!(json["workerID"], "worker-a");
    }

    #[test]
    fn test_task_scan_type_defaults_to_active() {
        let task: Task =
            serde_json::from_str(r#"{"id":"task-7","target":"http://x","status":"Pending"}"#)
                .unwrap();
        assert_eq!(task.scan_type, DEFAULT_SCAN_TYPE);
        assert!(task.worker_id.is_none());
    }
}
