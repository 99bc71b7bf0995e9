use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ProtocolError, ScoutError};

use super::master::Master;
use super::protocol::{
    HEALTH_PATH, HealthResponse, SUBMIT_PATH, SubmitRequest, TASK_PATH, UNKNOWN_WORKER, WORKER_ID_HEADER,
};

impl ProtocolError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProtocolError::UnknownTask(_) => StatusCode::NOT_FOUND,
            ProtocolError::TaskNotRunning { .. } | ProtocolError::NotTaskOwner { .. } => StatusCode::CONFLICT,
            ProtocolError::Malformed(_) => StatusCode::BAD_REQUEST,
            ProtocolError::MasterUnreachable { .. }
            | ProtocolError::UnexpectedStatus { .. }
            | ProtocolError::Http(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProtocolError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

pub fn router(master: Arc<Master>) -> Router {
    Router::new()
        .route(TASK_PATH, get(get_task))
        .route(SUBMIT_PATH, post(submit_results))
        .route(HEALTH_PATH, get(health))
        .with_state(master)
}

fn worker_id(headers: &HeaderMap) -> &str {
    headers
        .get(WORKER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(UNKNOWN_WORKER)
}

async fn get_task(State(master): State<Arc<Master>>, headers: HeaderMap) -> Response {
    let worker = worker_id(&headers);

    match master.assign_next(worker) {
        Some(task) => Json(task).into_response(),
        None => {
            debug!(worker = %worker, "No pending task");
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

async fn submit_results(
    State(master): State<Arc<Master>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ProtocolError> {
    let request: SubmitRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Malformed submit body");
        ProtocolError::Malformed(e.to_string())
    })?;

    master.submit_results(worker_id(&headers), &request.task_id, request.issues, request.error)?;
    Ok(StatusCode::OK)
}

async fn health(State(master): State<Arc<Master>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        counts: master.counts(),
    })
}

pub struct MasterServer {
    listener: TcpListener,
    master: Arc<Master>,
}

impl MasterServer {
    pub async fn bind(addr: &str, master: Arc<Master>) -> Result<Self, ScoutError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, master })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ScoutError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until `cancel` fires, then drains open connections.
    pub async fn serve(self, cancel: CancellationToken) -> Result<(), ScoutError> {
        let addr = self.local_addr()?;
        let reaper = self.master.spawn_reaper(cancel.clone());

        info!(addr = %addr, lease = ?self.master.lease(), "Master listening");

        let shutdown = cancel.clone();
        axum::serve(self.listener, router(self.master))
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        if let Some(handle) = reaper {
            cancel.cancel();
            let _ = handle.await;
        }

        info!("Master stopped");
        Ok(())
    }
}
