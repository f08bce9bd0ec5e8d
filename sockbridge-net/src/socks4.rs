use std::net::Ipv4Addr;

use super::types::{Socks4Request, SocksError, SocksErrorKind, TargetAddr};

const VERSION: u8 = 0x04;
const CMD_CONNECT: u8 = 0x01;

pub const REPLY_GRANTED: u8 = 0x5A;
pub const REPLY_REJECTED: u8 = 0x5B;

// Fixed header plus a NUL-terminated user id and hostname; anything past
// this is a client that will never terminate its strings.
const MAX_REQUEST_LEN: usize = 1024;

/// Parses one SOCKS4/4a CONNECT request from the front of `bytes`. Returns the
/// request and the number of bytes consumed; trailing bytes are payload the
/// client pipelined ahead of the grant reply.
pub fn parse_socks4_request(bytes: &[u8]) -> Result<(Socks4Request, usize), SocksError> {
    if bytes.is_empty() {
        return Err(SocksError {
            kind: SocksErrorKind::UnexpectedEof,
            offset: 0,
        });
    }
    if bytes[0] != VERSION {
        return Err(SocksError {
            kind: SocksErrorKind::InvalidVersion,
            offset: 0,
        });
    }
    if bytes.len() < 2 {
        return Err(SocksError {
            kind: SocksErrorKind::UnexpectedEof,
            offset: bytes.len(),
        });
    }
    if bytes[1] != CMD_CONNECT {
        return Err(SocksError {
            kind: SocksErrorKind::UnsupportedCommand,
            offset: 1,
        });
    }
    if bytes.len() < 8 {
        return Err(SocksError {
            kind: SocksErrorKind::UnexpectedEof,
            offset: bytes.len(),
        });
    }

    let port = u16::from_be_bytes([bytes[2], bytes[3]]);
    let ip = [bytes[4], bytes[5], bytes[6], bytes[7]];

    let Some(user_end) = bytes[8..].iter().position(|&b| b == 0x00) else {
        return Err(SocksError {
            kind: SocksErrorKind::UnexpectedEof,
            offset: bytes.len(),
        });
    };
    let user_id = String::from_utf8_lossy(&bytes[8..8 + user_end]).to_string();
    let mut consumed = 8 + user_end + 1;

    // SOCKS4a: 0.0.0.x with x != 0 means a NUL-terminated hostname follows.
    let is_socks4a = ip[0] == 0 && ip[1] == 0 && ip[2] == 0 && ip[3] != 0;
    let target = if is_socks4a {
        let Some(host_end) = bytes[consumed..].iter().position(|&b| b == 0x00) else {
            return Err(SocksError {
                kind: SocksErrorKind::UnexpectedEof,
                offset: bytes.len(),
            });
        };
        let hostname = String::from_utf8_lossy(&bytes[consumed..consumed + host_end]).to_string();
        consumed += host_end + 1;
        TargetAddr::Domain(hostname)
    } else {
        TargetAddr::Ipv4(Ipv4Addr::from(ip))
    };

    Ok((
        Socks4Request {
            target,
            port,
            user_id,
        },
        consumed,
    ))
}

/// Reply frame sent back to the SOCKS4 client. The address and port fields are
/// cosmetic echoes; clients only act on the status byte.
pub fn encode_socks4_reply(granted: bool, port: u16, ip: Ipv4Addr) -> [u8; 8] {
    let status = if granted { REPLY_GRANTED } else { REPLY_REJECTED };
    let port = port.to_be_bytes();
    let ip = ip.octets();
    [
        0x00, status, port[0], port[1], ip[0], ip[1], ip[2], ip[3],
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Socks4ParseStatus {
    NeedMore,
    Complete { request: Socks4Request },
    Error { error: SocksError },
}

#[derive(Debug, Default)]
pub struct Socks4RequestParser {
    buffer: Vec<u8>,
    consumed: usize,
}

impl Socks4RequestParser {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            consumed: 0,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) -> Socks4ParseStatus {
        self.buffer.extend_from_slice(bytes);
        match parse_socks4_request(&self.buffer) {
            Ok((request, consumed)) => {
                self.consumed = consumed;
                Socks4ParseStatus::Complete { request }
            }
            Err(error) => match error.kind {
                SocksErrorKind::UnexpectedEof if self.buffer.len() > MAX_REQUEST_LEN => {
                    Socks4ParseStatus::Error {
                        error: SocksError {
                            kind: SocksErrorKind::FrameTooLong,
                            offset: MAX_REQUEST_LEN,
                        },
                    }
                }
                SocksErrorKind::UnexpectedEof => Socks4ParseStatus::NeedMore,
                _ => Socks4ParseStatus::Error { error },
            },
        }
    }

    /// Bytes received beyond the request frame, owed to the upstream leg.
    pub fn into_remainder(mut self) -> Vec<u8> {
        self.buffer.split_off(self.consumed)
    }
}
