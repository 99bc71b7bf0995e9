use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::analyzer::Detector;
use crate::config::FuzzConfig;
use crate::error::ScanError;
use crate::fuzzer::{Payload, PayloadCatalog};
use crate::http::HttpClient;
use crate::reporter::FindingsSink;

use super::middleware::MiddlewareScanner;
use super::scheduler::{FuzzScheduler, ScanStats};

/// A statically registered scan capability, selected by `Task::scan_type`.
#[async_trait]
pub trait ScanModule: Send + Sync {
    fn name(&self) -> &str;

    async fn run(
        &self,
        target: &str,
        sink: Arc<FindingsSink>,
        cancel: &CancellationToken,
    ) -> Result<ScanStats, ScanError>;
}

pub struct ActiveScan {
    scheduler: FuzzScheduler,
    payloads: Vec<Payload>,
}

impl ActiveScan {
    pub fn new(transport: Arc<HttpClient>, detector: Arc<Detector>, config: FuzzConfig) -> Self {
        Self::with_payloads(transport, detector, config, PayloadCatalog::default_payloads())
    }

    pub fn with_payloads(
        transport: Arc<HttpClient>,
        detector: Arc<Detector>,
        config: FuzzConfig,
        payloads: Vec<Payload>,
    ) -> Self {
        Self {
            scheduler: FuzzScheduler::new(transport, detector, config),
            payloads,
        }
    }
}

#[async_trait]
impl ScanModule for ActiveScan {
    fn name(&self) -> &str {
        "active"
    }

    async fn run(
        &self,
        target: &str,
        sink: Arc<FindingsSink>,
        cancel: &CancellationToken,
    ) -> Result<ScanStats, ScanError> {
        self.scheduler.start(target, &self.payloads, sink, cancel).await
    }
}

pub struct MiddlewareScan {
    scanner: MiddlewareScanner,
}

impl MiddlewareScan {
    pub fn new(transport: Arc<HttpClient>) -> Self {
        Self {
            scanner: MiddlewareScanner::new(transport),
        }
    }
}

#[async_trait]
impl ScanModule for MiddlewareScan {
    fn name(&self) -> &str {
        "middleware"
    }

    async fn run(
        &self,
        target: &str,
        sink: Arc<FindingsSink>,
        cancel: &CancellationToken,
    ) -> Result<ScanStats, ScanError> {
        self.scanner.scan(target, &sink, cancel).await
    }
}

#[derive(Default)]
pub struct ScanRegistry {
    modules: BTreeMap<String, Arc<dyn ScanModule>>,
}

impl ScanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(transport: Arc<HttpClient>, detector: Arc<Detector>, fuzz: FuzzConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ActiveScan::new(transport.clone(), detector, fuzz)));
        registry.register(Arc::new(MiddlewareScan::new(transport)));
        registry
    }

    pub fn register(&mut self, module: Arc<dyn ScanModule>) {
        self.modules.insert(module.name().to_string(), module);
    }

    pub fn get(&self, scan_type: &str) -> Option<Arc<dyn ScanModule>> {
        self.modules.get(scan_type).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    pub async fn run(
        &self,
        scan_type: &str,
        target: &str,
        sink: Arc<FindingsSink>,
        cancel: &CancellationToken,
    ) -> Result<ScanStats, ScanError> {
        let module = self
            .get(scan_type)
            .ok_or_else(|| ScanError::UnknownScanType(scan_type.to_string()))?;
        module.run(target, sink, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;
    use crate::models::{Finding, Severity};

    struct Canned;

    #[async_trait]
    impl ScanModule for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn run(
            &self,
            target: &str,
            sink: Arc<FindingsSink>,
            _cancel: &CancellationToken,
        ) -> Result<ScanStats, ScanError> {
            sink.add(Finding::new("Canned", "d", Severity::Low, target, ""));
            Ok(ScanStats {
                jobs_total: 1,
                completed: 1,
                findings: 1,
                ..Default::default()
            })
        }
    }

    fn registry() -> ScanRegistry {
        let transport = Arc::new(HttpClient::new(&TransportConfig::default()).unwrap());
        let detector = Arc::new(Detector::builtin().unwrap());
        ScanRegistry::with_defaults(transport, detector, FuzzConfig::default())
    }

    #[test]
    fn test_default_modules() {
        assert_eq!(registry().names(), vec!["active", "middleware"]);
    }

    #[tokio::test]
    async fn test_custom_module_dispatch() {
        let mut registry = registry();
        registry.register(Arc::new(Canned));

        let sink = Arc::new(FindingsSink::new());
        let stats = registry
            .run("canned", "http://t/", sink.clone(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(stats.findings, 1);
        assert_eq!(sink.snapshot()[0].url, "http://t/");
    }

    #[tokio::test]
    async fn test_unknown_scan_type() {
        let result = registry()
            .run("browser", "http://t/", Arc::new(FindingsSink::new()), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ScanError::UnknownScanType(t)) if t == "browser"));
    }
}
