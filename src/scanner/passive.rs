use std::sync::Arc;

use reqwest::Method;
use tracing::debug;
use url::Url;

use crate::analyzer::Detector;
use crate::models::HttpResponse;
use crate::reporter::FindingsSink;

pub struct PassiveInspector {
    detector: Arc<Detector>,
    sink: Arc<FindingsSink>,
}

impl PassiveInspector {
    pub fn new(detector: Arc<Detector>, sink: Arc<FindingsSink>) -> Self {
        Self { detector, sink }
    }

    pub fn sink(&self) -> &Arc<FindingsSink> {
        &self.sink
    }

    pub fn on_request(&self, method: &Method, url: &str) -> usize {
        let Ok(parsed) = Url::parse(url) else {
            debug!(method = %method, url = %url, "Unparseable request url");
            return 0;
        };

        let mut recorded = 0;
        for (key, value) in parsed.query_pairs() {
            let findings = self.detector.analyze_pair(url, &key, &value);
            recorded += findings.len();
            self.sink.extend(findings);
        }
        recorded
    }

    pub fn on_response(&self, response: &HttpResponse) -> usize {
        let findings = self.detector.analyze_baseline(response);
        let recorded = findings.len();
        self.sink.extend(findings);
        recorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::SECURITY_HEADERS;

    fn inspector() -> PassiveInspector {
        PassiveInspector::new(
            Arc::new(Detector::builtin().unwrap()),
            Arc::new(FindingsSink::new()),
        )
    }

    #[test]
    fn test_on_request_flags_params() {
        let inspector = inspector();
        let n = inspector.on_request(&Method::GET, "http://t/view?file=../../etc/passwd&page=2");

        assert!(n >= 2);
        let names: Vec<_> = inspector.sink().snapshot().into_iter().map(|f| f.name).collect();
        assert!(names.contains(&"LFI / Path Traversal (Basic)".to_string()));
        assert!(names.contains(&"LFI (System Files - Linux)".to_string()));
    }

    #[test]
    fn test_on_request_ignores_clean_traffic() {
        let inspector = inspector();
        assert_eq!(inspector.on_request(&Method::GET, "http://t/view?page=2"), 0);
        assert_eq!(inspector.on_request(&Method::GET, "::not a url::"), 0);
        assert!(inspector.sink().is_empty());
    }

    #[test]
    fn test_on_response_audits_headers() {
        let inspector = inspector();
        let resp = SECURITY_HEADERS
            .iter()
            .skip(1)
            .fold(HttpResponse::new("http://t/", 200), |r, (h, _)| r.with_header(h, "1"));

        assert_eq!(inspector.on_response(&resp), 1);
        assert_eq!(
            inspector.sink().snapshot()[0].name,
            "Missing Security Header: X-Frame-Options"
        );
    }
}
