mod middleware;
mod module;
mod passive;
mod scheduler;

pub use middleware::{DEFAULT_FINGERPRINTS, Fingerprint, MiddlewareScanner};
pub use module::{ActiveScan, MiddlewareScan, ScanModule, ScanRegistry};
pub use passive::PassiveInspector;
pub use scheduler::{FuzzJob, FuzzScheduler, PLACEHOLDER_PARAM, ScanStats, plan_jobs};
