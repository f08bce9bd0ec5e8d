use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayConfig {
    pub listen: EndpointConfig,
    pub upstream: EndpointConfig,
    pub resolution: ResolutionMode,
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
}

/// Where hostname targets from SOCKS4a requests are resolved.
///
/// `ResolveLocally` looks the name up before the upstream leg is opened;
/// `ResolveRemotely` forwards the name verbatim in the SOCKS5 CONNECT so the
/// upstream proxy performs the lookup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ResolutionMode {
    ResolveLocally,
    ResolveRemotely,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Bound on reading the client's SOCKS4 request, in milliseconds.
    pub request_ms: u64,
    /// Bound on the TCP connect and SOCKS5 handshake with the upstream proxy.
    pub handshake_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_ms: 10_000,
            handshake_ms: 10_000,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen: EndpointConfig {
                host: "127.0.0.1".to_string(),
                port: 1080,
            },
            upstream: EndpointConfig {
                host: "127.0.0.1".to_string(),
                port: 9050,
            },
            resolution: ResolutionMode::ResolveLocally,
            timeouts: TimeoutConfig::default(),
        }
    }
}
