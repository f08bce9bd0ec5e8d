use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, broadcast};
use tokio_stream::wrappers::BroadcastStream;

use crate::config::{EndpointConfig, RelayConfig, ResolutionMode, TimeoutConfig};
use crate::dns::{DnsResolver, SystemResolver};
use crate::error::RelayError;
use crate::events::{RelayEvent, RelayEvents, event_channel};
use crate::session;

/// SOCKS4/4a front door relaying through a SOCKS5 upstream proxy.
///
/// Constructed with a config, optionally given a custom resolver, started
/// once. `stop` only closes the listener; sessions already relaying keep
/// their sockets and drain independently.
pub struct RelayServer {
    config: RelayConfig,
    resolver: Arc<dyn DnsResolver>,
    events: broadcast::Sender<RelayEvent>,
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
    local_addr: Option<SocketAddr>,
}

/// Read-only per-server state shared by all sessions.
pub(crate) struct RelayState {
    pub(crate) resolution: ResolutionMode,
    pub(crate) timeouts: TimeoutConfig,
    pub(crate) upstream_addr: SocketAddr,
    pub(crate) resolver: Arc<dyn DnsResolver>,
    events: broadcast::Sender<RelayEvent>,
}

impl RelayState {
    pub(crate) fn emit(&self, event: RelayEvent) {
        // Zero subscribers is fine; events are observation-only.
        let _ = self.events.send(event);
    }
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> (Self, RelayEvents) {
        let (events, stream) = event_channel();
        (
            Self {
                config,
                resolver: Arc::new(SystemResolver),
                events,
                shutdown: Arc::new(Notify::new()),
                running: Arc::new(AtomicBool::new(false)),
                local_addr: None,
            },
            stream,
        )
    }

    /// Replaces the local lookup step. Has no effect under
    /// `ResolutionMode::ResolveRemotely`.
    pub fn with_resolver(mut self, resolver: Arc<dyn DnsResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn subscribe(&self) -> RelayEvents {
        BroadcastStream::new(self.events.subscribe())
    }

    /// Bound listener address, available once `start` has returned.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Binds the listener and spawns the accept loop. Bind failures surface
    /// synchronously; a second `start` on a running instance is an error.
    pub async fn start(&mut self) -> Result<(), RelayError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(RelayError::Runtime(
                "relay server already started".to_string(),
            ));
        }

        let upstream_addr = lookup_endpoint(&self.config.upstream).await?;
        let listener = TcpListener::bind((
            self.config.listen.host.as_str(),
            self.config.listen.port,
        ))
        .await?;
        let local_addr = listener.local_addr()?;
        self.local_addr = Some(local_addr);
        // The flag flips only once the listener is up; a failed start stays
        // retryable.
        self.running.store(true, Ordering::SeqCst);

        let state = Arc::new(RelayState {
            resolution: self.config.resolution,
            timeouts: self.config.timeouts,
            upstream_addr,
            resolver: Arc::clone(&self.resolver),
            events: self.events.clone(),
        });
        state.emit(RelayEvent::Log {
            message: format!("relay listening on {local_addr}, upstream proxy {upstream_addr}"),
        });

        let shutdown = Arc::clone(&self.shutdown);
        let running = Arc::clone(&self.running);
        tokio::spawn(accept_loop(listener, state, shutdown, running));
        Ok(())
    }

    /// Stops accepting new connections. Safe to call from any thread; never
    /// waits on in-flight sessions, so it cannot deadlock.
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }
}

async fn lookup_endpoint(endpoint: &EndpointConfig) -> Result<SocketAddr, RelayError> {
    let mut addrs = tokio::net::lookup_host((endpoint.host.as_str(), endpoint.port))
        .await
        .map_err(|error| {
            RelayError::Config(format!(
                "cannot resolve upstream endpoint {}:{}: {error}",
                endpoint.host, endpoint.port
            ))
        })?;
    addrs.next().ok_or_else(|| {
        RelayError::Config(format!(
            "upstream endpoint {}:{} has no addresses",
            endpoint.host, endpoint.port
        ))
    })
}

async fn accept_loop(
    listener: TcpListener,
    state: Arc<RelayState>,
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => dispatch(Arc::clone(&state), stream, peer),
                Err(error) => {
                    // One failed accept does not take the listener down.
                    state.emit(RelayEvent::Log {
                        message: format!("accept failed: {error}"),
                    });
                }
            },
        }
    }
    running.store(false, Ordering::SeqCst);
    state.emit(RelayEvent::Log {
        message: "relay stopped accepting connections".to_string(),
    });
}

/// Single seam for session fan-out. Spawning is unbounded on purpose; a
/// bounded pool could be substituted here without touching handshake or pump
/// logic.
fn dispatch(state: Arc<RelayState>, stream: TcpStream, peer: SocketAddr) {
    tokio::spawn(session::handle_session(state, stream, peer));
}
