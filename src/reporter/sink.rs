use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::error;

use crate::models::{Finding, Severity};

pub type Observer = Arc<dyn Fn(&Finding) + Send + Sync>;

/// Observers run synchronously after each append, outside the findings lock,
/// in registration order. A panicking observer is logged and skipped; the
/// finding is already recorded by then.
#[derive(Default)]
pub struct FindingsSink {
    findings: Mutex<Vec<Finding>>,
    observers: Mutex<Vec<Observer>>,
}

static SESSION_SINK: OnceCell<Arc<FindingsSink>> = OnceCell::new();

impl FindingsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_default() -> Arc<FindingsSink> {
        SESSION_SINK.get_or_init(|| Arc::new(FindingsSink::new())).clone()
    }

    pub fn add(&self, finding: Finding) {
        self.findings.lock().push(finding.clone());

        let observers = self.observers.lock().clone();
        for (idx, observer) in observers.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| observer(&finding))).is_err() {
                error!(observer = idx, finding = %finding.name, "Findings observer panicked");
            }
        }
    }

    pub fn extend(&self, findings: impl IntoIterator<Item = Finding>) {
        for finding in findings {
            self.add(finding);
        }
    }

    pub fn snapshot(&self) -> Vec<Finding> {
        self.findings.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.findings.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.lock().is_empty()
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.findings
            .lock()
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    pub fn register_observer<F>(&self, observer: F)
    where
        F: Fn(&Finding) + Send + Sync + 'static,
    {
        self.observers.lock().push(Arc::new(observer));
    }
}
