use std::path::Path;

use crate::error::CatalogError;
use crate::models::{Finding, HttpResponse};

use super::headers::HeaderAuditor;
use super::signatures::SignatureCatalog;
use super::waf::{WafDetector, WafSignal};

const MAX_EVIDENCE_MATCH: usize = 120;

pub struct Detector {
    catalog: SignatureCatalog,
}

impl Detector {
    pub fn new(catalog: SignatureCatalog) -> Self {
        Self { catalog }
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Ok(Self::new(SignatureCatalog::builtin()?))
    }

    pub fn load(rules_file: Option<&Path>) -> Result<Self, CatalogError> {
        match rules_file {
            Some(path) => Ok(Self::new(SignatureCatalog::from_rule_file(path)?)),
            None => Self::builtin(),
        }
    }

    pub fn catalog(&self) -> &SignatureCatalog {
        &self.catalog
    }

    pub fn analyze_pair(&self, url: &str, key: &str, value: &str) -> Vec<Finding> {
        self.catalog
            .match_pair(key, value)
            .into_iter()
            .map(|sig| {
                Finding::new(
                    sig.name.clone(),
                    sig.description.clone(),
                    sig.severity,
                    url,
                    format!("Key: {}, Value: {}", key, value),
                )
            })
            .collect()
    }

    pub fn analyze_body(&self, response: &HttpResponse, context: &str) -> Vec<Finding> {
        self.catalog
            .match_document(&response.body)
            .into_iter()
            .map(|m| {
                let evidence = if context.is_empty() {
                    format!("Matched: {}", clip(m.matched))
                } else {
                    format!("{}; Matched: {}", context, clip(m.matched))
                };
                Finding::new(
                    m.signature.name.clone(),
                    m.signature.description.clone(),
                    m.signature.severity,
                    response.url.clone(),
                    evidence,
                )
            })
            .collect()
    }

    pub fn audit_headers(&self, response: &HttpResponse) -> Vec<Finding> {
        HeaderAuditor::audit(response)
    }

    pub fn detect_waf(&self, response: &HttpResponse) -> Vec<WafSignal> {
        WafDetector::detect(response)
    }

    /// Baseline analysis for a single unmutated response: WAF hints are
    /// logged, then header gaps and body matches are returned.
    pub fn analyze_baseline(&self, response: &HttpResponse) -> Vec<Finding> {
        self.detect_waf(response);

        let mut findings = self.audit_headers(response);
        findings.extend(self.analyze_body(response, "baseline"));
        findings
    }
}

fn clip(text: &str) -> &str {
    match text.char_indices().nth(MAX_EVIDENCE_MATCH) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn detector() -> Detector {
        Detector::builtin().unwrap()
    }

    #[test]
    fn test_analyze_pair_evidence() {
        let findings = detector().analyze_pair("http://t/?q=x", "q", "<script>alert(1)</script>");
        assert!(!findings.is_empty());
        assert_eq!(findings[0].name, "Reflected XSS (Script Tag)");
        assert_eq!(findings[0].evidence, "Key: q, Value: <script>alert(1)</script>");
        assert_eq!(findings[0].url, "http://t/?q=x");
    }

    #[test]
    fn test_analyze_body_carries_context() {
        let resp = HttpResponse::new("http://t/?id=1", 500)
            .with_body(r#"You have an error in your SQL syntax; check the manual for MySQL"#);

        let findings = detector().analyze_body(&resp, "param=id, mutation=0");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
        assert!(findings[0].evidence.starts_with("param=id, mutation=0; Matched: "));
    }

    #[test]
    fn test_long_match_is_clipped() {
        let body = format!("<script>{}</script>", "é".repeat(500));
        let resp = HttpResponse::new("http://t/", 200).with_body(body);

        let findings = detector().analyze_body(&resp, "");
        let script = findings.iter().find(|f| f.name == "Reflected XSS (Script Tag)").unwrap();
        assert!(script.evidence.chars().count() <= "Matched: ".len() + MAX_EVIDENCE_MATCH);
    }

    #[test]
    fn test_baseline_combines_headers_and_body() {
        let resp = HttpResponse::new("http://t/", 200).with_body("Index of /backup");
        let findings = detector().analyze_baseline(&resp);

        assert_eq!(
            findings.iter().filter(|f| f.name.starts_with("Missing Security Header")).count(),
            5
        );
        assert!(findings.iter().any(|f| f.name == "Directory Listing"));
    }
}
