use tracing::info;

use crate::models::HttpResponse;

const WAF_FINGERPRINTS: &'static [(&'static str, &'static str, &'static str)] = &[
    ("Server", "cloudflare", "Cloudflare"),
    ("CF-RAY", "", "Cloudflare"),
    ("Server", "AkamaiGHost", "Akamai"),
    ("X-Akamai-Transformed", "", "Akamai"),
    ("X-Cloud-Edge", "", "Cloud Edge"),
    ("X-Sucuri-ID", "", "Sucuri"),
    ("X-CDN", "Incapsula", "Imperva Incapsula"),
    ("Server", "BigIP", "F5 BIG-IP"),
    ("X-Powered-By", "AWS Lambda", "AWS"),
    ("Server", "awselb", "AWS ELB"),
];

const BLOCKING_STATUSES: &[u16] = &[403, 406];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WafSignal {
    Header { header: String, vendor: String },
    BlockingStatus(u16),
}

impl std::fmt::Display for WafSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WafSignal::Header { header, vendor } => write!(f, "{} via {}", vendor, header),
            WafSignal::BlockingStatus(status) => write!(f, "blocking status {}", status),
        }
    }
}

/// Heuristic WAF detection. Informational only: signals are logged, never
/// turned into findings.
pub struct WafDetector;

impl WafDetector {
    pub fn detect(response: &HttpResponse) -> Vec<WafSignal> {
        let mut signals: Vec<WafSignal> = WAF_FINGERPRINTS
            .iter()
            .filter(|(header, needle, _)| match response.header(header) {
                Some(value) => needle.is_empty() || value.to_lowercase().contains(&needle.to_lowercase()),
                None => false,
            })
            .map(|(header, _, vendor)| WafSignal::Header {
                header: header.to_string(),
                vendor: vendor.to_string(),
            })
            .collect();

        if BLOCKING_STATUSES.contains(&response.status) {
            signals.push(WafSignal::BlockingStatus(response.status));
        }

        for signal in &signals {
            info!(url = %response.url, signal = %signal, "Possible WAF detected");
        }

        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_response_has_no_signals() {
        let resp = HttpResponse::new("http://t/", 200).with_header("Server", "nginx");
        assert!(WafDetector::detect(&resp).is_empty());
    }

    #[test]
    fn test_cloudflare_fingerprint() {
        let resp = HttpResponse::new("http://t/", 200)
            .with_header("Server", "cloudflare")
            .with_header("CF-RAY", "7d1f-AMS");

        let signals = WafDetector::detect(&resp);
        assert_eq!(signals.len(), 2);
        assert!(signals.iter().all(|s| matches!(s, WafSignal::Header { vendor, .. } if vendor == "Cloudflare")));
    }

    #[test]
    fn test_blocking_status() {
        let resp = HttpResponse::new("http://t/", 406);
        assert_eq!(WafDetector::detect(&resp), vec![WafSignal::BlockingStatus(406)]);

        let resp = HttpResponse::new("http://t/", 404);
        assert!(WafDetector::detect(&resp).is_empty());
    }
}
