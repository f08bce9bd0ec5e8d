use std::net::{Ipv4Addr, Ipv6Addr};

use super::types::{ReplyAddr, Socks5Reply, Socks5Response, SocksError, SocksErrorKind, TargetAddr};

const VERSION: u8 = 0x05;
const CMD_CONNECT: u8 = 0x01;
const METHOD_NO_AUTH: u8 = 0x00;

/// Method negotiation offering "no authentication required" only.
pub fn encode_method_request() -> Vec<u8> {
    vec![VERSION, 0x01, METHOD_NO_AUTH]
}

/// Returns the method the server selected.
pub fn parse_method_response(bytes: &[u8]) -> Result<u8, SocksError> {
    if bytes.len() < 2 {
        return Err(SocksError {
            kind: SocksErrorKind::UnexpectedEof,
            offset: bytes.len(),
        });
    }
    if bytes[0] != VERSION {
        return Err(SocksError {
            kind: SocksErrorKind::InvalidVersion,
            offset: 0,
        });
    }
    Ok(bytes[1])
}

/// CONNECT request frame. Hostname targets go out as ATYP=0x03 so the
/// upstream proxy performs the resolution.
pub fn encode_connect_request(target: &TargetAddr, port: u16) -> Result<Vec<u8>, SocksError> {
    let mut buf = Vec::new();
    buf.push(VERSION);
    buf.push(CMD_CONNECT);
    buf.push(0x00);

    match target {
        TargetAddr::Ipv4(ip) => {
            buf.push(0x01);
            buf.extend_from_slice(&ip.octets());
        }
        TargetAddr::Domain(domain) => {
            if domain.len() > 255 {
                return Err(SocksError {
                    kind: SocksErrorKind::DomainTooLong,
                    offset: 4,
                });
            }
            buf.push(0x03);
            buf.push(domain.len() as u8);
            buf.extend_from_slice(domain.as_bytes());
        }
    }
    buf.extend_from_slice(&port.to_be_bytes());
    Ok(buf)
}

pub fn parse_connect_response(bytes: &[u8]) -> Result<Socks5Response, SocksError> {
    if bytes.len() < 5 {
        return Err(SocksError {
            kind: SocksErrorKind::UnexpectedEof,
            offset: bytes.len(),
        });
    }
    if bytes[0] != VERSION {
        return Err(SocksError {
            kind: SocksErrorKind::InvalidVersion,
            offset: 0,
        });
    }
    let reply = Socks5Reply::from_code(bytes[1]);
    let address_type = bytes[3];
    let mut cursor = 4;
    let bound = match address_type {
        0x01 => {
            if bytes.len() < cursor + 4 {
                return Err(SocksError {
                    kind: SocksErrorKind::UnexpectedEof,
                    offset: bytes.len(),
                });
            }
            let ip = Ipv4Addr::new(
                bytes[cursor],
                bytes[cursor + 1],
                bytes[cursor + 2],
                bytes[cursor + 3],
            );
            cursor += 4;
            ReplyAddr::Ipv4(ip)
        }
        0x03 => {
            if bytes.len() < cursor + 1 {
                return Err(SocksError {
                    kind: SocksErrorKind::UnexpectedEof,
                    offset: bytes.len(),
                });
            }
            let len = bytes[cursor] as usize;
            cursor += 1;
            if bytes.len() < cursor + len {
                return Err(SocksError {
                    kind: SocksErrorKind::UnexpectedEof,
                    offset: bytes.len(),
                });
            }
            let domain = String::from_utf8_lossy(&bytes[cursor..cursor + len]).to_string();
            cursor += len;
            ReplyAddr::Domain(domain)
        }
        0x04 => {
            if bytes.len() < cursor + 16 {
                return Err(SocksError {
                    kind: SocksErrorKind::UnexpectedEof,
                    offset: bytes.len(),
                });
            }
            let mut ip = [0u8; 16];
            ip.copy_from_slice(&bytes[cursor..cursor + 16]);
            cursor += 16;
            ReplyAddr::Ipv6(Ipv6Addr::from(ip))
        }
        _ => {
            return Err(SocksError {
                kind: SocksErrorKind::UnsupportedAddressType,
                offset: cursor,
            });
        }
    };

    if bytes.len() < cursor + 2 {
        return Err(SocksError {
            kind: SocksErrorKind::UnexpectedEof,
            offset: bytes.len(),
        });
    }
    let port = u16::from_be_bytes([bytes[cursor], bytes[cursor + 1]]);

    Ok(Socks5Response { reply, bound, port })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Socks5ParseStatus {
    NeedMore,
    Complete { response: Socks5Response },
    Error { error: SocksError },
}

#[derive(Debug, Default)]
pub struct ConnectResponseParser {
    buffer: Vec<u8>,
}

impl ConnectResponseParser {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn push(&mut self, bytes: &[u8]) -> Socks5ParseStatus {
        self.buffer.extend_from_slice(bytes);
        match parse_connect_response(&self.buffer) {
            Ok(response) => Socks5ParseStatus::Complete { response },
            Err(error) => match error.kind {
                SocksErrorKind::UnexpectedEof => Socks5ParseStatus::NeedMore,
                _ => Socks5ParseStatus::Error { error },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_method_request_no_auth() {
        assert_eq!(encode_method_request(), vec![0x05, 0x01, 0x00]);
    }

    #[test]
    fn parses_method_response() {
        assert_eq!(parse_method_response(&[0x05, 0x00]).unwrap(), 0x00);
        assert_eq!(parse_method_response(&[0x05, 0xFF]).unwrap(), 0xFF);
    }

    #[test]
    fn method_response_rejects_wrong_version() {
        let error = parse_method_response(&[0x04, 0x00]).unwrap_err();
        assert_eq!(error.kind, SocksErrorKind::InvalidVersion);
    }

    #[test]
    fn encodes_connect_request_ipv4() {
        let bytes =
            encode_connect_request(&TargetAddr::Ipv4(Ipv4Addr::new(127, 0, 0, 1)), 8080).unwrap();
        assert_eq!(
            bytes,
            vec![0x05, 0x01, 0x00, 0x01, 127, 0, 0, 1, 0x1f, 0x90]
        );
    }

    #[test]
    fn encodes_connect_request_domain() {
        let bytes =
            encode_connect_request(&TargetAddr::Domain("example.com".to_string()), 80).unwrap();
        assert_eq!(
            bytes,
            vec![
                0x05, 0x01, 0x00, 0x03, 11, b'e', b'x', b'a', b'm', b'p', b'l', b'e', b'.', b'c',
                b'o', b'm', 0x00, 0x50,
            ]
        );
    }

    #[test]
    fn refuses_overlong_domain() {
        let domain = "a".repeat(256);
        let error = encode_connect_request(&TargetAddr::Domain(domain), 80).unwrap_err();
        assert_eq!(error.kind, SocksErrorKind::DomainTooLong);
    }

    #[test]
    fn parses_connect_response_ipv4() {
        let bytes = [0x05, 0x00, 0x00, 0x01, 127, 0, 0, 1, 0x00, 0x50];
        let response = parse_connect_response(&bytes).unwrap();
        assert_eq!(response.reply, Socks5Reply::Succeeded);
        assert_eq!(response.bound, ReplyAddr::Ipv4(Ipv4Addr::new(127, 0, 0, 1)));
        assert_eq!(response.port, 80);
    }

    #[test]
    fn parses_connect_response_ipv6() {
        let mut bytes = vec![0x05, 0x00, 0x00, 0x04];
        bytes.extend_from_slice(&Ipv6Addr::LOCALHOST.octets());
        bytes.extend_from_slice(&[0x1f, 0x90]);
        let response = parse_connect_response(&bytes).unwrap();
        assert_eq!(response.bound, ReplyAddr::Ipv6(Ipv6Addr::LOCALHOST));
        assert_eq!(response.port, 8080);
    }

    #[test]
    fn parses_connect_response_domain() {
        let bytes = [
            0x05, 0x04, 0x00, 0x03, 4, b'h', b'o', b's', b't', 0x00, 0x50,
        ];
        let response = parse_connect_response(&bytes).unwrap();
        assert_eq!(response.reply, Socks5Reply::HostUnreachable);
        assert_eq!(response.bound, ReplyAddr::Domain("host".to_string()));
    }

    #[test]
    fn unknown_reply_codes_map_to_other() {
        let bytes = [0x05, 0xFF, 0x00, 0x01, 0, 0, 0, 0, 0x00, 0x00];
        let response = parse_connect_response(&bytes).unwrap();
        assert_eq!(response.reply, Socks5Reply::Other(0xFF));
        assert_eq!(response.reply.code(), 0xFF);
    }

    #[test]
    fn parses_response_across_buffers() {
        let mut parser = ConnectResponseParser::new();
        assert!(matches!(
            parser.push(&[0x05, 0x00, 0x00, 0x01]),
            Socks5ParseStatus::NeedMore
        ));
        match parser.push(&[127, 0, 0, 1, 0x00, 0x50]) {
            Socks5ParseStatus::Complete { response } => {
                assert_eq!(response.port, 80);
            }
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn unknown_address_type_is_an_error() {
        let bytes = [0x05, 0x00, 0x00, 0x09, 0, 0, 0, 0, 0, 0];
        let error = parse_connect_response(&bytes).unwrap_err();
        assert_eq!(error.kind, SocksErrorKind::UnsupportedAddressType);
    }
}
