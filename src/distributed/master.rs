use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::ProtocolError;
use crate::models::{Finding, Task, TaskStatus};
use crate::reporter::FindingsSink;

use super::protocol::TaskCounts;

#[derive(Default)]
struct TaskTable {
    tasks: Vec<Task>,
    next_id: u64,
}

/// Owns the task table and the session sink that collects submitted findings.
///
/// Every read-then-write on the table happens under one lock, so a pending
/// task is handed to at most one worker.
pub struct Master {
    table: Mutex<TaskTable>,
    sink: Arc<FindingsSink>,
    lease: Option<Duration>,
}

impl Master {
    pub fn new(sink: Arc<FindingsSink>) -> Self {
        Self {
            table: Mutex::new(TaskTable::default()),
            sink,
            lease: None,
        }
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = Some(lease);
        self
    }

    pub fn sink(&self) -> &Arc<FindingsSink> {
        &self.sink
    }

    pub fn lease(&self) -> Option<Duration> {
        self.lease
    }

    pub fn create_task(&self, target: impl Into<String>, scan_type: impl Into<String>) -> String {
        let mut table = self.table.lock();
        table.next_id += 1;
        let id = format!("task-{}", table.next_id);
        let task = Task::new(id.clone(), target.into(), scan_type.into());

        info!(task_id = %id, target = %task.target, scan_type = %task.scan_type, "Task created");
        table.tasks.push(task);
        id
    }

    pub fn assign_next(&self, worker: &str) -> Option<Task> {
        let mut table = self.table.lock();
        let task = table
            .tasks
            .iter_mut()
            .find(|t| t.status == TaskStatus::Pending)?;

        task.status = TaskStatus::Running;
        task.worker_id = Some(worker.to_string());
        task.assigned_at = Some(Utc::now());

        info!(task_id = %task.id, worker = %worker, "Task assigned");
        Some(task.clone())
    }

    /// Closes a running task and merges its findings into the session sink.
    ///
    /// Unknown ids and tasks that are not `Running` are rejected without
    /// touching the table or the sink. With a lease configured, only the
    /// worker currently holding the task may close it.
    pub fn submit_results(
        &self,
        worker: &str,
        task_id: &str,
        findings: Vec<Finding>,
        error: Option<String>,
    ) -> Result<TaskStatus, ProtocolError> {
        let next = if error.is_some() {
            TaskStatus::Failed
        } else {
            TaskStatus::Completed
        };

        {
            let mut table = self.table.lock();
            let task = table
                .tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or_else(|| ProtocolError::UnknownTask(task_id.to_string()))?;

            if !task.status.can_transition_to(next) {
                return Err(ProtocolError::TaskNotRunning {
                    id: task_id.to_string(),
                    status: task.status.to_string(),
                });
            }
            if self.lease.is_some() {
                let owner = task.worker_id.as_deref().unwrap_or_default();
                if owner != worker {
                    warn!(task_id = %task_id, owner = %owner, worker = %worker, "Submit from a worker that no longer holds the task");
                    return Err(ProtocolError::NotTaskOwner {
                        id: task_id.to_string(),
                        owner: owner.to_string(),
                        worker: worker.to_string(),
                    });
                }
            }
            task.status = next;
        }

        match &error {
            Some(reason) => warn!(task_id = %task_id, findings = findings.len(), error = %reason, "Task failed"),
            None => info!(task_id = %task_id, findings = findings.len(), "Task completed"),
        }

        self.sink.extend(findings);
        Ok(next)
    }

    /// Returns expired running tasks to `Pending`. This is the only backward
    /// transition, and it only happens with a lease configured.
    pub fn requeue_expired(&self, now: DateTime<Utc>) -> usize {
        let Some(lease) = self.lease else { return 0 };
        let lease = chrono::Duration::from_std(lease).unwrap_or(chrono::Duration::MAX);

        let mut table = self.table.lock();
        let mut requeued = 0;
        for task in table.tasks.iter_mut().filter(|t| t.status == TaskStatus::Running) {
            let expired = task.assigned_at.is_some_and(|at| now - at >= lease);
            if expired {
                warn!(task_id = %task.id, worker = ?task.worker_id, "Lease expired, re-queueing task");
                task.status = TaskStatus::Pending;
                task.worker_id = None;
                task.assigned_at = None;
                requeued += 1;
            }
        }
        requeued
    }

    /// Runs `requeue_expired` periodically until `cancel` fires. `None` when
    /// no lease is configured.
    pub fn spawn_reaper(self: &Arc<Self>, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        let lease = self.lease?;
        let master = self.clone();
        let period = (lease / 2).max(Duration::from_secs(1));

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        master.requeue_expired(Utc::now());
                    }
                }
            }
        }))
    }

    pub fn task(&self, task_id: &str) -> Option<Task> {
        self.table.lock().tasks.iter().find(|t| t.id == task_id).cloned()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.table.lock().tasks.clone()
    }

    pub fn counts(&self) -> TaskCounts {
        let table = self.table.lock();
        table.tasks.iter().fold(TaskCounts::default(), |mut counts, task| {
            match task.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::Running => counts.running += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
            counts
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn master() -> Master {
        Master::new(Arc::new(FindingsSink::new()))
    }

    fn finding() -> Finding {
        Finding::new("SQL Injection (Generic)", "d", Severity::High, "http://t/", "e")
    }

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let m = master();
        assert_eq!(m.create_task("http://a/", "active"), "task-1");
        assert_eq!(m.create_task("http://b/", "active"), "task-2");
    }

    #[test]
    fn test_assign_in_creation_order() {
        let m = master();
        let first = m.create_task("http://a/", "active");
        m.create_task("http://b/", "active");

        let task = m.assign_next("w1").unwrap();
        assert_eq!(task.id, first);
        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(task.worker_id.as_deref(), Some("w1"));
        assert!(task.assigned_at.is_some());
    }

    #[test]
    fn test_no_pending_task() {
        let m = master();
        assert!(m.assign_next("w1").is_none());
        m.create_task("http://a/", "active");
        assert!(m.assign_next("w1").is_some());
        assert!(m.assign_next("w2").is_none());
    }

    #[test]
    fn test_concurrent_assign_is_exclusive() {
        let m = Arc::new(master());
        let id = m.create_task("http://a/", "active");

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let m = m.clone();
                std::thread::spawn(move || m.assign_next(&format!("w{}", i)))
            })
            .collect();

        let winners: Vec<Task> = handles.into_iter().filter_map(|h| h.join().unwrap()).collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].id, id);
    }

    #[test]
    fn test_submit_completes_and_merges() {
        let m = master();
        let id = m.create_task("http://a/", "active");
        m.assign_next("w1");

        let status = m.submit_results("w1", &id, vec![finding()], None).unwrap();
        assert_eq!(status, TaskStatus::Completed);
        assert_eq!(m.sink().len(), 1);
        assert_eq!(m.counts().completed, 1);
    }

    #[test]
    fn test_submit_with_error_fails_task() {
        let m = master();
        let id = m.create_task("http://a/", "active");
        m.assign_next("w1");

        let status = m.submit_results("w1", &id, vec![], Some("boom".to_string())).unwrap();
        assert_eq!(status, TaskStatus::Failed);
        assert_eq!(m.task(&id).unwrap().status, TaskStatus::Failed);
    }

    #[test]
    fn test_submit_unknown_task_has_no_side_effects() {
        let m = master();
        m.create_task("http://a/", "active");
        let before = m.tasks();

        let result = m.submit_results("w1", "task-99", vec![finding()], None);
        assert!(matches!(result, Err(ProtocolError::UnknownTask(id)) if id == "task-99"));
        assert_eq!(m.tasks(), before);
        assert!(m.sink().is_empty());
    }

    #[test]
    fn test_submit_twice_is_rejected() {
        let m = master();
        let id = m.create_task("http://a/", "active");
        m.assign_next("w1");
        m.submit_results("w1", &id, vec![finding()], None).unwrap();

        let again = m.submit_results("w1", &id, vec![finding()], None);
        assert!(matches!(again, Err(ProtocolError::TaskNotRunning { .. })));
        assert_eq!(m.sink().len(), 1);
    }

    #[test]
    fn test_submit_pending_task_is_rejected() {
        let m = master();
        let id = m.create_task("http://a/", "active");
        assert!(m.submit_results("w1", &id, vec![], None).is_err());
        assert_eq!(m.task(&id).unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn test_late_submit_from_expired_holder_is_rejected() {
        let m = master().with_lease(Duration::from_secs(60));
        let id = m.create_task("http://a/", "active");
        m.assign_next("w1");
        m.requeue_expired(Utc::now() + chrono::Duration::seconds(61));
        m.assign_next("w2");

        let late = m.submit_results("w1", &id, vec![finding()], None);
        assert!(matches!(late, Err(ProtocolError::NotTaskOwner { owner, .. }) if owner == "w2"));
        assert!(m.sink().is_empty());
        assert_eq!(m.task(&id).unwrap().status, TaskStatus::Running);

        let status = m.submit_results("w2", &id, vec![finding()], None).unwrap();
        assert_eq!(status, TaskStatus::Completed);
        assert_eq!(m.sink().len(), 1);
    }

    #[test]
    fn test_owner_not_checked_without_lease() {
        let m = master();
        let id = m.create_task("http://a/", "active");
        m.assign_next("w1");
        assert!(m.submit_results("unknown", &id, vec![], None).is_ok());
    }

    #[tokio::test]
    async fn test_reaper_requeues_expired_task() {
        let m = Arc::new(master().with_lease(Duration::from_secs(1)));
        let id = m.create_task("http://a/", "active");
        m.assign_next("w1");

        let cancel = CancellationToken::new();
        let reaper = m.spawn_reaper(cancel.clone()).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while m.task(&id).unwrap().status == TaskStatus::Running {
            assert!(std::time::Instant::now() < deadline, "reaper never re-queued the task");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let task = m.task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.worker_id.is_none());

        cancel.cancel();
        reaper.await.unwrap();
    }

    #[test]
    fn test_reaper_not_spawned_without_lease() {
        let m = Arc::new(master());
        assert!(m.spawn_reaper(CancellationToken::new()).is_none());
    }

    #[test]
    fn test_requeue_without_lease_is_noop() {
        let m = master();
        m.create_task("http://a/", "active");
        m.assign_next("w1");
        assert_eq!(m.requeue_expired(Utc::now() + chrono::Duration::days(1)), 0);
        assert_eq!(m.counts().running, 1);
    }

    #[test]
    fn test_requeue_expired_lease() {
        let m = master().with_lease(Duration::from_secs(60));
        let id = m.create_task("http://a/", "active");
        m.assign_next("w1");

        assert_eq!(m.requeue_expired(Utc::now()), 0);
        assert_eq!(m.requeue_expired(Utc::now() + chrono::Duration::seconds(61)), 1);

        let task = m.task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.worker_id.is_none());
        assert_eq!(m.assign_next("w2").unwrap().id, id);
    }
}
