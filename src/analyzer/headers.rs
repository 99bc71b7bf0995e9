use crate::models::{Finding, HttpResponse, Severity};

pub const SECURITY_HEADERS: &'static [(&'static str, Severity)] = &[
    ("X-Frame-Options", Severity::Medium),
    ("Content-Security-Policy", Severity::High),
    ("Strict-Transport-Security", Severity::Medium),
    ("X-Content-Type-Options", Severity::Low),
    ("Referrer-Policy", Severity::Low),
];

pub struct HeaderAuditor;

impl HeaderAuditor {
    pub fn audit(response: &HttpResponse) -> Vec<Finding> {
        let evidence = format!("Host: {}", host_of(&response.url));

        SECURITY_HEADERS
            .iter()
            .filter(|(header, _)| response.header(header).is_none())
            .map(|(header, severity)| {
                Finding::new(
                    format!("Missing Security Header: {}", header),
                    format!("The response does not set the {} header.", header),
                    *severity,
                    response.url.clone(),
                    evidence.clone(),
                )
            })
            .collect()
    }
}

fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hardened(url: &str) -> HttpResponse {
        SECURITY_HEADERS
            .iter()
            .fold(HttpResponse::new(url, 200), |resp, (h, _)| resp.with_header(h, "x"))
    }

    #[test]
    fn test_all_headers_present() {
        assert!(HeaderAuditor::audit(&hardened("http://app.local/")).is_empty());
    }

    #[test]
    fn test_every_missing_header_reported() {
        let findings = HeaderAuditor::audit(&HttpResponse::new("http://app.local/login", 200));
        assert_eq!(findings.len(), SECURITY_HEADERS.len());

        let csp = findings
            .iter()
            .find(|f| f.name == "Missing Security Header: Content-Security-Policy")
            .unwrap();
        assert_eq!(csp.severity, Severity::High);
        assert_eq!(csp.evidence, "Host: app.local");
        assert_eq!(csp.url, "http://app.local/login");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let resp = HttpResponse::new("http://app.local/", 200)
            .with_header("x-frame-options", "DENY")
            .with_header("content-security-policy", "default-src 'self'")
            .with_header("strict-transport-security", "max-age=63072000")
            .with_header("x-content-type-options", "nosniff");

        let findings = HeaderAuditor::audit(&resp);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].name, "Missing Security Header: Referrer-Policy");
        assert_eq!(findings[0].severity, Severity::Low);
    }
}
