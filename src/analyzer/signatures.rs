use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CatalogError;
use crate::models::Severity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureRule {
    pub name: String,
    pub pattern: String,
    pub description: String,
    pub severity: Severity,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    signature: Vec<SignatureRule>,
}

#[derive(Debug, Clone)]
pub struct Signature {
    pub name: String,
    pub pattern: Regex,
    pub description: String,
    pub severity: Severity,
}

impl Signature {
    pub fn compile(rule: &SignatureRule) -> Result<Self, CatalogError> {
        let pattern = RegexBuilder::new(&rule.pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| CatalogError::InvalidPattern {
                name: rule.name.clone(),
                source,
            })?;

        Ok(Self {
            name: rule.name.clone(),
            pattern,
            description: rule.description.clone(),
            severity: rule.severity,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SignatureMatch<'a> {
    pub signature: &'a Signature,
    pub matched: &'a str,
}

#[derive(Debug, Clone)]
pub struct SignatureCatalog {
    signatures: Vec<Signature>,
}

impl SignatureCatalog {
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_rules(&builtin_rules())
    }

    pub fn from_rules(rules: &[SignatureRule]) -> Result<Self, CatalogError> {
        let signatures = rules
            .iter()
            .map(Signature::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { signatures })
    }

    /// Loads a TOML file of `[[signature]]` tables, replacing the built-in set.
    pub fn from_rule_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let rule_error = |reason: String| CatalogError::RuleFile {
            path: path.display().to_string(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| rule_error(e.to_string()))?;
        let file: RuleFile = toml::from_str(&content).map_err(|e| rule_error(e.to_string()))?;

        if file.signature.is_empty() {
            return Err(rule_error("no [[signature]] entries".to_string()));
        }

        Self::from_rules(&file.signature)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.signatures.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Signature> {
        self.signatures.iter().find(|s| s.name == name)
    }

    pub fn match_pair(&self, _key: &str, value: &str) -> Vec<&Signature> {
        self.signatures
            .iter()
            .filter(|s| s.pattern.is_match(value))
            .collect()
    }

    pub fn match_document<'a>(&'a self, document: &'a str) -> Vec<SignatureMatch<'a>> {
        self.signatures
            .iter()
            .filter_map(|signature| {
                signature.pattern.find(document).map(|m| SignatureMatch {
                    signature,
                    matched: m.as_str(),
                })
            })
            .collect()
    }
}

const BUILTIN_SIGNATURES: &[(&str, &str, &str, Severity)] = &[
    (
        "SQL Injection (Error Based - MySQL)",
        r"(SQL syntax.*MySQL|Warning.*mysql_.*|valid MySQL result|MySqlClient\.)",
        "MySQL error message detected",
        Severity::High,
    ),
    (
        "SQL Injection (Error Based - PostgreSQL)",
        r"(PostgreSQL.*ERROR|Warning.*\Wpg_.*|valid PostgreSQL result|Npgsql\.)",
        "PostgreSQL error message detected",
        Severity::High,
    ),
    (
        "SQL Injection (Error Based - MSSQL)",
        r"(Driver.* SQL[-_ ]*Server|OLE DB.* SQL Server|\bSQL Server.*Driver|Warning.*mssql_.*|\bSQL Server.*[0-9a-fA-F]{8}|Exception.*\bRoadhouse\b)",
        "Microsoft SQL Server error message detected",
        Severity::High,
    ),
    (
        "SQL Injection (Error Based - Oracle)",
        r"(ORA-[0-9]{4}|Oracle error|Oracle.*Driver|Warning.*\Woci_.*|Warning.*\Wora_.*)",
        "Oracle SQL error message detected",
        Severity::High,
    ),
    (
        "SQL Injection (Error Based - SQLite)",
        r"(SQLite/JDBCDriver|SQLite\.Exception|System\.Data\.SQLite\.SQLiteException|Warning.*sqlite_.*|Warning.*SQLite3::)",
        "SQLite error message detected",
        Severity::High,
    ),
    (
        "SQL Injection (Error Based - ODBC/Generic)",
        r"(ODBC SQL Server Driver|ODBC Driver|Microsoft Access Driver|CLI Driver.*DB2|DB2 SQL error)",
        "Generic/ODBC SQL error message detected",
        Severity::High,
    ),
    (
        "SQL Injection (Generic)",
        r##"(\bOR\s+['"]?1['"]?\s*=\s*['"]?1|'--|#|/\*|;\s*DROP\s+TABLE|UNION\s+ALL\s+SELECT|UNION\s+SELECT)"##,
        "Common SQL Injection payload signature",
        Severity::High,
    ),
    (
        "SQL Injection (Time Based)",
        r"(sleep\(\d+\)|benchmark\(\d+,\w+\)|pg_sleep\(\d+\)|waitfor delay|dbms_pipe\.receive_message)",
        "Potential time-based SQL injection",
        Severity::High,
    ),
    (
        "Reflected XSS (Script Tag)",
        r"(<script[^>]*>[\s\S]*?</script>|<script\b)",
        "Potential XSS via script tag",
        Severity::High,
    ),
    (
        "Reflected XSS (Event Handlers)",
        r##"(on\w+\s*=\s*['"][^'"]*alert|on\w+\s*=\s*['"][^'"]*prompt|on\w+\s*=\s*['"][^'"]*confirm)"##,
        "Potential XSS via event handler (onload, onerror, etc.)",
        Severity::High,
    ),
    (
        "Reflected XSS (Javascript Protocol)",
        r##"(href\s*=\s*['"]javascript:|action\s*=\s*['"]javascript:)"##,
        "Potential XSS via javascript: protocol",
        Severity::High,
    ),
    (
        "Reflected XSS (SVG/IMG)",
        r"(<img[^>]+onerror|<svg[^>]+onload|<iframe[^>]+onload)",
        "Potential XSS via SVG/IMG/IFRAME tags",
        Severity::High,
    ),
    (
        "XSS (Polyglot Signature)",
        r"(javascript://|expression\()",
        "Potential obfuscated/polyglot XSS",
        Severity::High,
    ),
    (
        "LFI / Path Traversal (Basic)",
        r"(\.\./\.\./|\.\.\\\.\.\\|%2e%2e%2f)",
        "Directory traversal detected (../)",
        Severity::High,
    ),
    (
        "LFI (System Files - Linux)",
        r"(/etc/passwd|/etc/shadow|/etc/group|/etc/hosts|/proc/self/environ)",
        "Sensitive Linux system file path detected",
        Severity::Critical,
    ),
    (
        "LFI (System Files - Windows)",
        r"(c:\\windows\\win\.ini|c:\\windows\\system32|c:\\boot\.ini)",
        "Sensitive Windows system file path detected",
        Severity::Critical,
    ),
    (
        "LFI (Wrappers)",
        r"(php://filter|php://input|data://|zip://|expect://)",
        "PHP wrapper usage detected (potential LFI/RCE)",
        Severity::High,
    ),
    (
        "SSRF (Localhost IPv4)",
        r"(127\.0\.0\.1|0\.0\.0\.0)",
        "Potential SSRF to localhost (IPv4)",
        Severity::High,
    ),
    (
        "SSRF (Localhost IPv6)",
        r"(::1|0:0:0:0:0:0:0:1)",
        "Potential SSRF to localhost (IPv6)",
        Severity::High,
    ),
    (
        "SSRF (Cloud Metadata - AWS/GCP/Azure)",
        r"(169\.254\.169\.254|metadata\.google\.internal|100\.100\.100\.200)",
        "Potential SSRF to Cloud Metadata Service",
        Severity::Critical,
    ),
    (
        "SSRF (Private IP Ranges)",
        r"(10\.\d{1,3}\.\d{1,3}\.\d{1,3}|192\.168\.\d{1,3}\.\d{1,3}|172\.(1[6-9]|2\d|3[0-1])\.\d{1,3}\.\d{1,3})",
        "Potential SSRF to private internal network",
        Severity::High,
    ),
    (
        "XXE (Entity Definition)",
        r"(<!ENTITY\s+\w+\s+SYSTEM|<!ENTITY\s+\w+\s+PUBLIC)",
        "External Entity definition detected",
        Severity::High,
    ),
    (
        "XXE (Specific Payloads)",
        r"(<!DOCTYPE.*SYSTEM|<!ELEMENT)",
        "Potential XXE payload structure",
        Severity::High,
    ),
    (
        "Command Injection (Unix)",
        r"(;.*ls|;.*cat|;.*id|;.*whoami|\|.*nc|\|.*netcat|\|.*wget|\|.*curl|\$\(.*\)|`.*`)",
        "Potential Unix OS command injection",
        Severity::Critical,
    ),
    (
        "Command Injection (Windows)",
        r"(&.*dir|&.*ipconfig|&.*net user|\|.*ver)",
        "Potential Windows OS command injection",
        Severity::Critical,
    ),
    (
        "RCE (Language Specific)",
        r"(eval\(|system\(|passthru\(|exec\(|popen\(|proc_open\()",
        "Potential Remote Code Execution via dangerous functions",
        Severity::Critical,
    ),
    (
        "AWS Access Key ID",
        r"AKIA[0-9A-Z]{16}",
        "Potential AWS Access Key ID leaked",
        Severity::Critical,
    ),
    (
        "AWS Secret Access Key",
        r##"(aws_?secret_?access_?key|aws_?key).*['"]?[0-9a-zA-Z/+]{40}['"]?"##,
        "Potential AWS Secret Access Key leaked",
        Severity::Critical,
    ),
    (
        "Private SSH/RSA Key",
        r"-----BEGIN (RSA|DSA|EC|OPENSSH|PGP) PRIVATE KEY-----",
        "Private cryptographic key exposed",
        Severity::Critical,
    ),
    (
        "Google API Key",
        r"AIza[0-9A-Za-z_\-]{35}",
        "Google API Key exposed",
        Severity::High,
    ),
    (
        "Stripe API Key",
        r"(?:r|s)k_(?:test|live)_[0-9a-zA-Z]{24}",
        "Stripe Secret Key exposed",
        Severity::Critical,
    ),
    (
        "Facebook Access Token",
        r"EAACEdEose0cBA[0-9A-Za-z]+",
        "Facebook Access Token exposed",
        Severity::High,
    ),
    (
        "Slack Token",
        r"xox[baprs]-([0-9a-zA-Z]{10,48})",
        "Slack Token exposed",
        Severity::Critical,
    ),
    (
        "GitHub Personal Access Token",
        r"ghp_[0-9a-zA-Z]{36}",
        "GitHub Personal Access Token exposed",
        Severity::Critical,
    ),
    (
        "Generic API Key",
        r##"(api[_-]?key|apikey|access[_-]?token|auth[_-]?token|bearer)[ \t]*[:=][ \t]*['"][\w.-]{20,}['"]"##,
        "Potential generic API key or token exposed",
        Severity::High,
    ),
    (
        "SSTI (Jinja2/Python)",
        r"\{\{.*?\}\}|\{% ?.*? ?%\}",
        "Potential Jinja2/Python Template Injection",
        Severity::High,
    ),
    (
        "SSTI (Java)",
        r"\$\{.*?\}",
        "Potential Java/SSTI Injection",
        Severity::High,
    ),
    (
        "PHP Object Injection",
        r#"O:\d+:""#,
        "Potential PHP Object Injection (serialized data)",
        Severity::Critical,
    ),
    (
        "Java Serialization Header",
        r"\xac\xed\x00\x05",
        "Java Serialized Data Header Detected",
        Severity::Critical,
    ),
    (
        "Open Redirect",
        r"(redirect|return|url|next|continue|dest)=http",
        "Potential open redirect parameter",
        Severity::Medium,
    ),
    (
        "Missing CSRF Token (Form)",
        r"<form[^>]*>",
        "HTML form found (check for CSRF token manually)",
        Severity::Medium,
    ),
    (
        "CRLF Injection",
        r"(%0d%0a|%0a%0d|\\r\\n|\\n\\r)",
        "Potential CRLF injection (Response Splitting)",
        Severity::Medium,
    ),
    (
        "Directory Listing",
        r"(index of /|directory listing for|parent directory)",
        "Directory listing enabled",
        Severity::Low,
    ),
    (
        "LDAP Injection",
        r"(cn=|uid=|ou=|dc=|\(&\(objectClass=|\(\|\(objectClass=)",
        "Potential LDAP Injection",
        Severity::High,
    ),
    (
        "XPath Injection",
        r"(//user\[|//password\[|' or '1'='1|' or 1=1)",
        "Potential XPath Injection",
        Severity::High,
    ),
    (
        "DOM Clobbering",
        r#"(id=["']?window["']?|name=["']?window["']?)"#,
        "Potential DOM Clobbering",
        Severity::Medium,
    ),
    (
        "Insecure Iframe",
        r#"<iframe\s+src=["']?http:"#,
        "Mixed content iframe",
        Severity::Low,
    ),
    (
        "Stack Trace (Java)",
        r"(java\.lang\.NullPointerException|at java\.lang\.|full stack trace|Java stack trace)",
        "Java stack trace exposed",
        Severity::Low,
    ),
    (
        "Stack Trace (PHP)",
        r"(Fatal error:|Parse error:|Uncaught exception|Stack trace:)",
        "PHP error/stack trace exposed",
        Severity::Low,
    ),
    (
        "Stack Trace (Python)",
        r#"(Traceback \(most recent call last\)|File ".*", line \d+, in)"#,
        "Python traceback exposed",
        Severity::Low,
    ),
];

pub fn builtin_rules() -> Vec<SignatureRule> {
    BUILTIN_SIGNATURES
        .iter()
        .map(|(name, pattern, description, severity)| SignatureRule {
            name: name.to_string(),
            pattern: pattern.to_string(),
            description: description.to_string(),
            severity: *severity,
        })
        .collect()
}
