mod detector;
mod headers;
mod signatures;
mod waf;

pub use detector::Detector;
pub use headers::{HeaderAuditor, SECURITY_HEADERS};
pub use signatures::{Signature, SignatureCatalog, SignatureMatch, SignatureRule, builtin_rules};
pub use waf::{WafDetector, WafSignal};
