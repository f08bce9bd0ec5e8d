use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use sockbridge_net::{
    ConnectResponseParser, Socks5ParseStatus, Socks5Reply, TargetAddr, encode_connect_request,
    encode_method_request, parse_method_response,
};

use crate::error::SessionError;

const METHOD_NO_AUTH: u8 = 0x00;

/// Runs the SOCKS5 client handshake over an already-open stream to the
/// upstream proxy: method negotiation, CONNECT, reply. On success the stream
/// is ready to carry relayed payload.
pub(crate) async fn socks5_connect(
    stream: &mut TcpStream,
    target: &TargetAddr,
    port: u16,
) -> Result<(), SessionError> {
    stream.write_all(&encode_method_request()).await?;

    let mut response = [0u8; 2];
    stream.read_exact(&mut response).await?;
    let method = parse_method_response(&response).map_err(|_| SessionError::UpstreamRejected)?;
    if method != METHOD_NO_AUTH {
        return Err(SessionError::UpstreamRejected);
    }

    let connect = encode_connect_request(target, port)
        .map_err(|error| SessionError::Protocol(format!("SOCKS5 CONNECT request: {error:?}")))?;
    stream.write_all(&connect).await?;

    let mut parser = ConnectResponseParser::new();
    let mut buffer = [0u8; 512];
    loop {
        let n = stream.read(&mut buffer).await?;
        if n == 0 {
            return Err(SessionError::Transport(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "upstream closed during CONNECT reply",
            )));
        }
        match parser.push(&buffer[..n]) {
            Socks5ParseStatus::NeedMore => continue,
            Socks5ParseStatus::Complete { response } => {
                return if response.reply == Socks5Reply::Succeeded {
                    Ok(())
                } else {
                    Err(SessionError::UpstreamConnectFailed {
                        code: response.reply.code(),
                    })
                };
            }
            Socks5ParseStatus::Error { error } => {
                return Err(SessionError::Transport(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("malformed SOCKS5 CONNECT reply: {error:?}"),
                )));
            }
        }
    }
}
