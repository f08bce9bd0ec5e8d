use thiserror::Error;

/// Server-level failures surfaced to the embedding code.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay configuration error: {0}")]
    Config(String),
    #[error("relay runtime error: {0}")]
    Runtime(String),
    #[error("relay IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-session failures. Everything before the grant reply is converted into
/// a SOCKS4 rejection and never escapes the session task.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("malformed SOCKS request: {0}")]
    Protocol(String),
    #[error("hostname resolution failed: {0}")]
    Resolution(String),
    #[error("upstream proxy rejected method negotiation")]
    UpstreamRejected,
    #[error("upstream connect failed with reply code {code:#04x}")]
    UpstreamConnectFailed { code: u8 },
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("timed out during {0}")]
    TimedOut(&'static str),
}
