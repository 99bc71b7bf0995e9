use serde::{Deserialize, Serialize};

use crate::models::Finding;

pub const TASK_PATH: &str = "/task";
pub const SUBMIT_PATH: &str = "/submit";
pub const HEALTH_PATH: &str = "/health";

pub const WORKER_ID_HEADER: &str = "x-worker-id";
pub const UNKNOWN_WORKER: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub task_id: String,
    #[serde(default)]
    pub issues: Vec<Finding>,
    /// Set when the scan failed; moves the task to `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitRequest {
    pub fn completed(task_id: impl Into<String>, issues: Vec<Finding>) -> Self {
        Self {
            task_id: task_id.into(),
            issues,
            error: None,
        }
    }

    pub fn failed(task_id: impl Into<String>, issues: Vec<Finding>, error: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            issues,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(flatten)]
    pub counts: TaskCounts,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    #[test]
    fn test_submit_without_error_field() {
        let req: SubmitRequest = serde_json::from_str(r#"{"task_id":"task-1","issues":[]}"#).unwrap();
        assert_eq!(req, SubmitRequest::completed("task-1", vec![]));

        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_submit_issue_shape() {
        let req = SubmitRequest::completed(
            "task-3",
            vec![Finding::new("X", "d", Severity::High, "http://t/", "e")],
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["issues"][0]["severity"], "High");
        assert_eq!(json["task_id"], "task-3");
    }

    #[test]
    fn test_health_is_flat() {
        let health = HealthResponse {
            status: "ok".to_string(),
            counts: TaskCounts { pending: 2, ..Default::default() },
        };
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["pending"], 2);
        assert_eq!(json["status"], "ok");
    }
}
