mod socks4;
mod socks5;
mod types;

pub use socks4::{
    REPLY_GRANTED, REPLY_REJECTED, Socks4ParseStatus, Socks4RequestParser, encode_socks4_reply,
    parse_socks4_request,
};
pub use socks5::{
    ConnectResponseParser, Socks5ParseStatus, encode_connect_request, encode_method_request,
    parse_connect_response, parse_method_response,
};
pub use types::{
    ReplyAddr, Socks4Request, Socks5Reply, Socks5Response, SocksError, SocksErrorKind, TargetAddr,
};
