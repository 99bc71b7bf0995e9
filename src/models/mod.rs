mod finding;
mod response;
mod task;

pub use finding::{Finding, Severity};
pub use response::HttpResponse;
pub use task::{DEFAULT_SCAN_TYPE, Task, TaskStatus};
