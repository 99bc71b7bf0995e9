use std::sync::Arc;

use futures::future::join_all;
use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ScanError;
use crate::http::HttpClient;
use crate::models::{Finding, Severity};
use crate::reporter::FindingsSink;

use super::scheduler::{ScanStats, parse_target};

#[derive(Debug, Clone, Copy)]
pub struct Fingerprint {
    pub name: &'static str,
    pub path: &'static str,
    pub marker: &'static str,
    pub description: &'static str,
    pub severity: Severity,
}

pub const DEFAULT_FINGERPRINTS: &'static [Fingerprint] = &[
    Fingerprint {
        name: "Apache Tomcat Manager",
        path: "/manager/html",
        marker: "Tomcat Web Application Manager",
        description: "Tomcat Manager Application exposed",
        severity: Severity::High,
    },
    Fingerprint {
        name: "Jenkins",
        path: "/login",
        marker: "Jenkins",
        description: "Jenkins Login Page exposed",
        severity: Severity::Info,
    },
    Fingerprint {
        name: "Axis2 Web Admin",
        path: "/axis2/axis2-admin",
        marker: "Axis2 Administration",
        description: "Apache Axis2 Administration Console exposed",
        severity: Severity::High,
    },
    Fingerprint {
        name: "JBoss Web Console",
        path: "/jmx-console/",
        marker: "JBoss JMX Console",
        description: "JBoss JMX Console exposed",
        severity: Severity::Critical,
    },
    Fingerprint {
        name: "Actuator Info",
        path: "/actuator/info",
        marker: "git",
        description: "Spring Boot Actuator Info exposed (potential leak)",
        severity: Severity::Low,
    },
    Fingerprint {
        name: "Actuator Heapdump",
        path: "/actuator/heapdump",
        marker: "JAVA_PROFILE",
        description: "Spring Boot Actuator Heapdump exposed (Sensitive Data Leak)",
        severity: Severity::Critical,
    },
    Fingerprint {
        name: "WordPress Login",
        path: "/wp-login.php",
        marker: "Powered by WordPress",
        description: "WordPress Login Page",
        severity: Severity::Info,
    },
];

/// Appends `path` to the target's own path, dropping query and fragment, so
/// an application mounted under `/app` is probed at `/app/manager/html`.
fn probe_url(target: &Url, path: &str) -> String {
    let mut base = target.clone();
    base.set_query(None);
    base.set_fragment(None);
    format!("{}{}", base.as_str().trim_end_matches('/'), path)
}

enum ProbeOutcome {
    Matched(Finding),
    NoMatch,
    Failed,
}

pub struct MiddlewareScanner {
    transport: Arc<HttpClient>,
    fingerprints: Vec<Fingerprint>,
}

impl MiddlewareScanner {
    pub fn new(transport: Arc<HttpClient>) -> Self {
        Self::with_fingerprints(transport, DEFAULT_FINGERPRINTS.to_vec())
    }

    pub fn with_fingerprints(transport: Arc<HttpClient>, fingerprints: Vec<Fingerprint>) -> Self {
        Self {
            transport,
            fingerprints,
        }
    }

    pub async fn scan(
        &self,
        target: &str,
        sink: &FindingsSink,
        cancel: &CancellationToken,
    ) -> Result<ScanStats, ScanError> {
        let base = parse_target(target)?;
        info!(target = %target, probes = self.fingerprints.len(), "Starting middleware scan");

        let probes = self.fingerprints.iter().map(|fp| {
            let url = probe_url(&base, fp.path);
            async move { self.probe(fp, &url, cancel).await }
        });

        let mut stats = ScanStats {
            jobs_total: self.fingerprints.len(),
            ..Default::default()
        };

        for outcome in join_all(probes).await {
            match outcome {
                ProbeOutcome::Matched(finding) => {
                    stats.completed += 1;
                    stats.findings += 1;
                    sink.add(finding);
                }
                ProbeOutcome::NoMatch => stats.completed += 1,
                ProbeOutcome::Failed => stats.skipped += 1,
            }
        }
        stats.cancelled = cancel.is_cancelled();

        info!(target = %target, findings = stats.findings, "Middleware scan finished");
        Ok(stats)
    }

    async fn probe(&self, fp: &Fingerprint, url: &str, cancel: &CancellationToken) -> ProbeOutcome {
        let request = match self.transport.build_request(Method::GET, url) {
            Ok(r) => r,
            Err(e) => {
                warn!(url = %url, error = %e, "Middleware probe skipped");
                return ProbeOutcome::Failed;
            }
        };

        let response = match self.transport.execute_with_cancel(request, cancel).await {
            Ok(r) => r,
            Err(e) => {
                debug!(url = %url, error = %e, "Middleware probe failed");
                return ProbeOutcome::Failed;
            }
        };

        if response.status != 200 || !response.body.contains(fp.marker) {
            return ProbeOutcome::NoMatch;
        }

        info!(name = fp.name, url = %url, "Middleware detected");
        ProbeOutcome::Matched(Finding::new(
            format!("Middleware Detected: {}", fp.name),
            fp.description,
            fp.severity,
            url,
            format!("Matched string '{}' at {}", fp.marker, url),
        ))
    }
}
