use std::io;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};

/// Hostname lookup capability injected at server construction. Implementations
/// may block; the relay runs them on the blocking pool. Only consulted under
/// `ResolutionMode::ResolveLocally`.
pub trait DnsResolver: Send + Sync {
    fn resolve(&self, hostname: &str) -> io::Result<Ipv4Addr>;
}

/// Default resolver backed by the platform resolver.
pub struct SystemResolver;

impl DnsResolver for SystemResolver {
    fn resolve(&self, hostname: &str) -> io::Result<Ipv4Addr> {
        let addrs = (hostname, 0).to_socket_addrs()?;
        for addr in addrs {
            if let SocketAddr::V4(v4) = addr {
                return Ok(*v4.ip());
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no IPv4 address found for {hostname}"),
        ))
    }
}
