mod client;
mod rate_limit;
mod retry;

pub use client::HttpClient;
pub use rate_limit::AdmissionGate;
pub use retry::{RETRYABLE_STATUSES, RetryPolicy};
