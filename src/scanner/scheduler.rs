use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Method;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::analyzer::Detector;
use crate::config::FuzzConfig;
use crate::error::ScanError;
use crate::fuzzer::{Payload, mutate, mutation_label};
use crate::http::HttpClient;
use crate::reporter::FindingsSink;

pub const PLACEHOLDER_PARAM: &str = "fuzz_param";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzJob {
    pub url: String,
    pub param: String,
    pub payload: &'static str,
    pub mutation: usize,
}

impl FuzzJob {
    pub fn context(&self) -> String {
        format!(
            "param={}, payload={}, mutation={} ({})",
            self.param,
            self.payload,
            self.mutation,
            mutation_label(self.mutation)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub jobs_total: usize,
    pub completed: usize,
    pub skipped: usize,
    pub findings: usize,
    pub cancelled: bool,
}

impl ScanStats {
    pub fn merge(&mut self, other: &ScanStats) {
        self.jobs_total += other.jobs_total;
        self.completed += other.completed;
        self.skipped += other.skipped;
        self.findings += other.findings;
        self.cancelled |= other.cancelled;
    }
}

pub(crate) fn parse_target(target: &str) -> Result<Url, ScanError> {
    let url = Url::parse(target).map_err(|e| ScanError::InvalidTarget {
        target: target.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ScanError::InvalidTarget {
            target: target.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// Expands `target` into parameter × payload × mutation jobs.
///
/// Parameters are positional: a repeated name yields one job set per
/// occurrence, and only that occurrence is replaced.
pub fn plan_jobs(target: &str, payloads: &[Payload]) -> Result<Vec<FuzzJob>, ScanError> {
    let base = parse_target(target)?;

    let mut params: Vec<(String, String)> = base
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if params.is_empty() {
        params.push((PLACEHOLDER_PARAM.to_string(), String::new()));
    }

    let mut jobs = Vec::with_capacity(params.len() * payloads.len() * crate::fuzzer::MUTATION_COUNT);

    for position in 0..params.len() {
        for payload in payloads {
            for (mutation, value) in mutate(payload.content).into_iter().enumerate() {
                let mut url = base.clone();
                url.query_pairs_mut().clear().extend_pairs(
                    params.iter().enumerate().map(|(idx, (k, v))| {
                        if idx == position { (k.as_str(), value.as_str()) } else { (k.as_str(), v.as_str()) }
                    }),
                );

                jobs.push(FuzzJob {
                    url: url.to_string(),
                    param: params[position].0.clone(),
                    payload: payload.name,
                    mutation,
                });
            }
        }
    }

    Ok(jobs)
}

pub struct FuzzScheduler {
    transport: Arc<HttpClient>,
    detector: Arc<Detector>,
    config: FuzzConfig,
}

struct Counters {
    completed: AtomicUsize,
    skipped: AtomicUsize,
    findings: AtomicUsize,
}

impl FuzzScheduler {
    pub fn new(transport: Arc<HttpClient>, detector: Arc<Detector>, config: FuzzConfig) -> Self {
        Self {
            transport,
            detector,
            config,
        }
    }

    /// Runs a full scan of `target` into `sink`.
    ///
    /// Returns once every job is drained, or early after `cancel` fires; in
    /// the latter case requests already on the wire finish first.
    pub async fn start(
        &self,
        target: &str,
        payloads: &[Payload],
        sink: Arc<FindingsSink>,
        cancel: &CancellationToken,
    ) -> Result<ScanStats, ScanError> {
        let jobs = plan_jobs(target, payloads)?;
        let jobs_total = jobs.len();
        let workers = self.config.workers.max(1);

        info!(target = %target, jobs = jobs_total, workers = workers, "Starting fuzz scan");

        let counters = Arc::new(Counters {
            completed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            findings: AtomicUsize::new(0),
        });

        let baseline = Arc::new(self.probe_baseline(target, &sink, &counters, cancel).await);

        let pb = self.create_progress_bar(jobs_total);
        let (tx, rx) = mpsc::channel::<FuzzJob>(self.config.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let handles: Vec<_> = (0..workers)
            .map(|worker_id| {
                let rx = rx.clone();
                let transport = self.transport.clone();
                let detector = self.detector.clone();
                let sink = sink.clone();
                let counters = counters.clone();
                let cancel = cancel.clone();
                let pb = pb.clone();
                let baseline = baseline.clone();

                tokio::spawn(async move {
                    run_worker(worker_id, rx, transport, detector, sink, counters, baseline, cancel, pb).await
                })
            })
            .collect();

        for job in jobs {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = tx.send(job) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
        drop(tx);

        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!(error = %e, "Fuzz worker task failed");
            }
        }

        pb.finish_and_clear();

        let stats = ScanStats {
            jobs_total,
            completed: counters.completed.load(Ordering::SeqCst),
            skipped: counters.skipped.load(Ordering::SeqCst),
            findings: counters.findings.load(Ordering::SeqCst),
            cancelled: cancel.is_cancelled(),
        };

        info!(
            target = %target,
            completed = stats.completed,
            skipped = stats.skipped,
            findings = stats.findings,
            cancelled = stats.cancelled,
            "Fuzz scan finished"
        );

        Ok(stats)
    }

    /// Returns the names of signatures already present in the baseline body.
    /// Job findings for those names are dropped.
    async fn probe_baseline(
        &self,
        target: &str,
        sink: &FindingsSink,
        counters: &Counters,
        cancel: &CancellationToken,
    ) -> HashSet<String> {
        let request = match self.transport.build_request(Method::GET, target) {
            Ok(r) => r,
            Err(e) => {
                warn!(target = %target, error = %e, "Baseline request skipped");
                return HashSet::new();
            }
        };

        match self.transport.execute_with_cancel(request, cancel).await {
            Ok(response) => {
                let present: HashSet<String> = self
                    .detector
                    .catalog()
                    .match_document(&response.body)
                    .into_iter()
                    .map(|m| m.signature.name.clone())
                    .collect();

                let findings = self.detector.analyze_baseline(&response);
                counters.findings.fetch_add(findings.len(), Ordering::SeqCst);
                sink.extend(findings);

                if !present.is_empty() {
                    debug!(target = %target, signatures = ?present, "Baseline matches excluded from job findings");
                }
                present
            }
            Err(e) if e.is_cancelled() => HashSet::new(),
            Err(e) => {
                warn!(target = %target, error = %e, "Baseline request failed");
                HashSet::new()
            }
        }
    }

    fn create_progress_bar(&self, total: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} Fuzzing...")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_worker(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<FuzzJob>>>,
    transport: Arc<HttpClient>,
    detector: Arc<Detector>,
    sink: Arc<FindingsSink>,
    counters: Arc<Counters>,
    baseline: Arc<HashSet<String>>,
    cancel: CancellationToken,
    pb: ProgressBar,
) {
    loop {
        let job = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                job = rx.recv() => job,
            }
        };

        let Some(job) = job else { break };

        let request = match transport.build_request(Method::GET, &job.url) {
            Ok(r) => r,
            Err(e) => {
                warn!(worker = worker_id, url = %job.url, error = %e, "Skipping job");
                counters.skipped.fetch_add(1, Ordering::SeqCst);
                pb.inc(1);
                continue;
            }
        };

        match transport.execute_with_cancel(request, &cancel).await {
            Ok(response) => {
                let mut findings = detector.analyze_body(&response, &job.context());
                findings.retain(|f| !baseline.contains(&f.name));
                if !findings.is_empty() {
                    debug!(worker = worker_id, url = %job.url, count = findings.len(), "Signatures matched");
                }
                counters.findings.fetch_add(findings.len(), Ordering::SeqCst);
                sink.extend(findings);
                counters.completed.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) if e.is_cancelled() => {
                counters.skipped.fetch_add(1, Ordering::SeqCst);
                break;
            }
            Err(e) => {
                warn!(worker = worker_id, url = %job.url, error = %e, "Job failed, skipping");
                counters.skipped.fetch_add(1, Ordering::SeqCst);
            }
        }

        pb.inc(1);
    }

    debug!(worker = worker_id, "Fuzz worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzzer::{MUTATION_COUNT, PayloadCatalog, VulnClass};

    fn payload(content: &'static str) -> Payload {
        Payload {
            name: "test",
            content,
            class: VulnClass::Sqli,
        }
    }

    #[test]
    fn test_job_count() {
        let payloads = PayloadCatalog::default_payloads();
        let jobs = plan_jobs("http://t/p?a=1&b=2", &payloads).unwrap();
        assert_eq!(jobs.len(), 2 * payloads.len() * MUTATION_COUNT);
    }

    #[test]
    fn test_placeholder_param() {
        let jobs = plan_jobs("http://t/search", &[payload("'")]).unwrap();
        assert_eq!(jobs.len(), MUTATION_COUNT);
        assert!(jobs.iter().all(|j| j.param == PLACEHOLDER_PARAM));
        assert_eq!(jobs[0].url, "http://t/search?fuzz_param=%27");
    }

    #[test]
    fn test_other_params_preserved() {
        let jobs = plan_jobs("http://t/p?a=1&b=2", &[payload("x")]).unwrap();

        let first: Vec<_> = jobs.iter().filter(|j| j.param == "a").collect();
        assert_eq!(first[0].url, "http://t/p?a=x&b=2");

        let second: Vec<_> = jobs.iter().filter(|j| j.param == "b").collect();
        assert_eq!(second[0].url, "http://t/p?a=1&b=x");
    }

    #[test]
    fn test_repeated_param_is_positional() {
        let jobs = plan_jobs("http://t/p?id=1&id=2", &[payload("x")]).unwrap();
        let identity: Vec<_> = jobs.iter().filter(|j| j.mutation == 0).map(|j| j.url.as_str()).collect();
        assert_eq!(identity, vec!["http://t/p?id=x&id=2", "http://t/p?id=1&id=x"]);
    }

    #[test]
    fn test_invalid_target() {
        assert!(matches!(
            plan_jobs("not a url", &[payload("x")]),
            Err(ScanError::InvalidTarget { .. })
        ));
        assert!(matches!(
            plan_jobs("ftp://t/", &[payload("x")]),
            Err(ScanError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn test_job_context_names_mutation() {
        let job = FuzzJob {
            url: "http://t/".to_string(),
            param: "id".to_string(),
            payload: "SQLi Generic Error",
            mutation: 3,
        };
        assert_eq!(job.context(), "param=id, payload=SQLi Generic Error, mutation=3 (base64)");
    }
}
