pub mod analyzer;
pub mod cli;
pub mod config;
pub mod distributed;
pub mod error;
pub mod fuzzer;
pub mod http;
pub mod models;
pub mod reporter;
pub mod scanner;

pub use analyzer::{Detector, SignatureCatalog};
pub use config::ScoutConfig;
pub use distributed::{Master, MasterServer, WorkerAgent};
pub use error::ScoutError;
pub use fuzzer::{Payload, PayloadCatalog, mutate};
pub use http::HttpClient;
pub use models::{Finding, HttpResponse, Severity, Task, TaskStatus};
pub use reporter::{ConsoleReporter, FindingsSink, JsonExporter};
pub use scanner::{FuzzScheduler, ScanRegistry, ScanStats};
