#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("retryable status {status} from {url}")]
    RetryableStatus { status: u16, url: String },

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<TransportError>,
    },

    #[error("request cancelled")]
    Cancelled,

    #[error("request body cannot be replayed for retry")]
    UncloneableRequest,

    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl TransportError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            TransportError::Cancelled => true,
            TransportError::Exhausted { last, .. } => last.is_cancelled(),
            _ => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("signature '{name}' has an invalid pattern: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to load rule file {path}: {reason}")]
    RuleFile { path: String, reason: String },
}

/// Errors that end a whole scan. Per-job failures never become one of these.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("unknown scan type: {0}")]
    UnknownScanType(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error("task {id} is {status}, not Running")]
    TaskNotRunning { id: String, status: String },

    #[error("task {id} is held by {owner}, not {worker}")]
    NotTaskOwner { id: String, owner: String, worker: String },

    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("master unreachable at {url}: {reason}")]
    MasterUnreachable { url: String, reason: String },

    #[error("master returned unexpected status {status} for {endpoint}")]
    UnexpectedStatus { status: u16, endpoint: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_error_wraps_last_cause() {
        let err = TransportError::Exhausted {
            attempts: 3,
            last: Box::new(TransportError::RetryableStatus {
                status: 500,
                url: "http://t/".to_string(),
            }),
        };

        let msg = err.to_string();
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("500"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn cancellation_is_detected_through_exhaustion() {
        let err = TransportError::Exhausted {
            attempts: 1,
            last: Box::new(TransportError::Cancelled),
        };
        assert!(err.is_cancelled());
        assert!(!TransportError::UncloneableRequest.is_cancelled());
    }
}
