use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::error::{ProtocolError, ScanError};
use crate::models::{Finding, Task};
use crate::reporter::FindingsSink;
use crate::scanner::ScanRegistry;

use super::protocol::{HEALTH_PATH, HealthResponse, SUBMIT_PATH, SubmitRequest, TASK_PATH, WORKER_ID_HEADER};

pub struct WorkerAgent {
    id: String,
    master_url: String,
    client: Client,
    poll_interval: Duration,
    registry: Arc<ScanRegistry>,
}

impl WorkerAgent {
    pub fn new(config: &WorkerConfig, registry: Arc<ScanRegistry>) -> Result<Self, ProtocolError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        let id = config
            .worker_id
            .clone()
            .unwrap_or_else(|| format!("worker-{}", Uuid::new_v4()));

        Ok(Self {
            id,
            master_url: config.master_url.trim_end_matches('/').to_string(),
            client,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            registry,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.master_url, path)
    }

    /// Startup check against `/health`. Callers treat failure as fatal.
    pub async fn connect(&self) -> Result<HealthResponse, ProtocolError> {
        let url = self.endpoint(HEALTH_PATH);
        let unreachable = |reason: String| ProtocolError::MasterUnreachable {
            url: self.master_url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(unreachable(format!("health check returned {}", response.status())));
        }

        let health: HealthResponse = response.json().await.map_err(|e| unreachable(e.to_string()))?;
        info!(worker = %self.id, master = %self.master_url, pending = health.counts.pending, "Connected to master");
        Ok(health)
    }

    pub async fn fetch_task(&self) -> Result<Option<Task>, ProtocolError> {
        let response = self
            .client
            .get(self.endpoint(TASK_PATH))
            .header(WORKER_ID_HEADER, &self.id)
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            StatusCode::OK => {
                let task: Task = response
                    .json()
                    .await
                    .map_err(|e| ProtocolError::Malformed(e.to_string()))?;
                Ok(Some(task))
            }
            status => Err(ProtocolError::UnexpectedStatus {
                status: status.as_u16(),
                endpoint: TASK_PATH.to_string(),
            }),
        }
    }

    pub async fn execute(&self, task: &Task, cancel: &CancellationToken) -> SubmitRequest {
        info!(worker = %self.id, task_id = %task.id, target = %task.target, scan_type = %task.scan_type, "Executing task");

        let sink = Arc::new(FindingsSink::new());
        let result = self
            .registry
            .run(&task.scan_type, &task.target, sink.clone(), cancel)
            .await;

        match result {
            Ok(stats) if stats.cancelled => {
                SubmitRequest::failed(&task.id, sink.snapshot(), "scan cancelled before completion")
            }
            Ok(stats) => {
                debug!(task_id = %task.id, completed = stats.completed, skipped = stats.skipped, "Scan finished");
                SubmitRequest::completed(&task.id, sink.snapshot())
            }
            Err(ScanError::UnknownScanType(scan_type)) => {
                warn!(task_id = %task.id, scan_type = %scan_type, "Unknown scan type");
                sink.add(Finding::info(
                    "Unknown Scan Type",
                    format!("Worker received a task with unknown type: {}", scan_type),
                    &task.target,
                ));
                SubmitRequest::completed(&task.id, sink.snapshot())
            }
            Err(e) => {
                error!(task_id = %task.id, error = %e, "Scan failed");
                SubmitRequest::failed(&task.id, sink.snapshot(), e.to_string())
            }
        }
    }

    pub async fn submit(&self, request: &SubmitRequest) -> Result<(), ProtocolError> {
        let response = self
            .client
            .post(self.endpoint(SUBMIT_PATH))
            .header(WORKER_ID_HEADER, &self.id)
            .json(request)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                info!(worker = %self.id, task_id = %request.task_id, findings = request.issues.len(), "Results submitted");
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(ProtocolError::UnknownTask(request.task_id.clone())),
            StatusCode::CONFLICT => Err(ProtocolError::TaskNotRunning {
                id: request.task_id.clone(),
                status: "not Running or reassigned".to_string(),
            }),
            status => Err(ProtocolError::UnexpectedStatus {
                status: status.as_u16(),
                endpoint: SUBMIT_PATH.to_string(),
            }),
        }
    }

    pub async fn poll_once(&self, cancel: &CancellationToken) -> Result<Option<String>, ProtocolError> {
        let Some(task) = self.fetch_task().await? else {
            return Ok(None);
        };

        let submission = self.execute(&task, cancel).await;
        self.submit(&submission).await?;
        Ok(Some(task.id))
    }

    /// Connects, then polls every interval until `cancel` fires. Only the
    /// initial connection can fail; poll errors are logged and retried.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ProtocolError> {
        self.connect().await?;

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.poll_once(&cancel).await {
                warn!(worker = %self.id, error = %e, "Poll cycle failed, retrying next interval");
            }
        }

        info!(worker = %self.id, "Worker stopped");
        Ok(())
    }
}
