mod master;
mod protocol;
mod server;
mod worker;

pub use master::Master;
pub use protocol::{
    HEALTH_PATH, HealthResponse, SUBMIT_PATH, SubmitRequest, TASK_PATH, TaskCounts, UNKNOWN_WORKER,
    WORKER_ID_HEADER,
};
pub use server::{MasterServer, router};
pub use worker::WorkerAgent;
