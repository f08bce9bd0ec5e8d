use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use sockbridge_net::{
    Socks4ParseStatus, Socks4Request, Socks4RequestParser, TargetAddr, encode_socks4_reply,
};

use crate::config::ResolutionMode;
use crate::error::SessionError;
use crate::events::RelayEvent;
use crate::relay::RelayState;
use crate::upstream::socks5_connect;

/// Services one accepted connection from request parse to teardown. Every
/// failure is absorbed here; nothing propagates to the accept loop.
pub(crate) async fn handle_session(state: Arc<RelayState>, client: TcpStream, peer: SocketAddr) {
    state.emit(RelayEvent::ClientAccepted { peer });
    if let Err(error) = serve(&state, client).await {
        state.emit(RelayEvent::Log {
            message: format!("session from {peer} failed: {error}"),
        });
    }
}

async fn serve(state: &RelayState, mut client: TcpStream) -> Result<(), SessionError> {
    let request_timeout = Duration::from_millis(state.timeouts.request_ms);
    let (request, pipelined) = match timeout(request_timeout, read_request(&mut client)).await {
        Ok(Ok(parsed)) => parsed,
        Ok(Err(error)) => return reject(&mut client, error).await,
        Err(_) => {
            return reject(&mut client, SessionError::TimedOut("SOCKS4 request read")).await;
        }
    };

    let port = request.port;
    let echo_ip = match &request.target {
        TargetAddr::Ipv4(ip) => *ip,
        TargetAddr::Domain(_) => Ipv4Addr::UNSPECIFIED,
    };

    let target = match resolve_target(state, request.target).await {
        Ok(target) => target,
        Err(error) => return reject(&mut client, error).await,
    };

    let handshake_timeout = Duration::from_millis(state.timeouts.handshake_ms);
    let mut upstream =
        match timeout(handshake_timeout, TcpStream::connect(state.upstream_addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(error)) => return reject(&mut client, SessionError::Transport(error)).await,
            Err(_) => {
                return reject(&mut client, SessionError::TimedOut("upstream TCP connect")).await;
            }
        };
    state.emit(RelayEvent::UpstreamConnected {
        upstream: state.upstream_addr,
    });

    match timeout(handshake_timeout, socks5_connect(&mut upstream, &target, port)).await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => return reject(&mut client, error).await,
        Err(_) => return reject(&mut client, SessionError::TimedOut("SOCKS5 handshake")).await,
    }

    client
        .write_all(&encode_socks4_reply(true, port, echo_ip))
        .await?;
    if !pipelined.is_empty() {
        upstream.write_all(&pipelined).await?;
    }

    pump(client, upstream).await;
    Ok(())
}

async fn read_request(client: &mut TcpStream) -> Result<(Socks4Request, Vec<u8>), SessionError> {
    let mut parser = Socks4RequestParser::new();
    let mut buffer = [0u8; 512];
    loop {
        let n = client.read(&mut buffer).await?;
        if n == 0 {
            return Err(SessionError::Protocol(
                "connection closed before a full SOCKS4 request".to_string(),
            ));
        }
        match parser.push(&buffer[..n]) {
            Socks4ParseStatus::NeedMore => continue,
            Socks4ParseStatus::Complete { request } => {
                return Ok((request, parser.into_remainder()));
            }
            Socks4ParseStatus::Error { error } => {
                return Err(SessionError::Protocol(format!("{error:?}")));
            }
        }
    }
}

async fn resolve_target(
    state: &RelayState,
    target: TargetAddr,
) -> Result<TargetAddr, SessionError> {
    match (state.resolution, target) {
        (ResolutionMode::ResolveLocally, TargetAddr::Domain(hostname)) => {
            let resolver = Arc::clone(&state.resolver);
            let resolved = tokio::task::spawn_blocking(move || resolver.resolve(&hostname))
                .await
                .map_err(|error| SessionError::Resolution(error.to_string()))?
                .map_err(|error| SessionError::Resolution(error.to_string()))?;
            Ok(TargetAddr::Ipv4(resolved))
        }
        (_, target) => Ok(target),
    }
}

async fn reject(client: &mut TcpStream, error: SessionError) -> Result<(), SessionError> {
    let _ = client
        .write_all(&encode_socks4_reply(false, 0, Ipv4Addr::UNSPECIFIED))
        .await;
    let _ = client.shutdown().await;
    Err(error)
}

/// Duplex pump: both copy directions run until the first one terminates, then
/// both streams are dropped. The hard close unblocks whichever side was still
/// reading or writing.
async fn pump(client: TcpStream, upstream: TcpStream) {
    let (mut client_read, mut client_write) = client.into_split();
    let (mut upstream_read, mut upstream_write) = upstream.into_split();
    tokio::select! {
        _ = tokio::io::copy(&mut client_read, &mut upstream_write) => {}
        _ = tokio::io::copy(&mut upstream_read, &mut client_write) => {}
    }
}
