//! 内置协议模块
//!
//! 提供TLS（SNI）和HTTP（Host头）两种协议描述符。

#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "tls")]
pub mod tls;

#[cfg(feature = "http")]
pub use self::http::{http_protocol, HttpParser};
#[cfg(feature = "tls")]
pub use self::tls::{tls_protocol, TlsParser};

use crate::core::protocol::ProtocolDescriptor;

/// 按名称查找内置协议描述符
pub fn builtin_protocol(name: &str) -> Option<&'static ProtocolDescriptor> {
    match name {
        #[cfg(feature = "tls")]
        tls::TLS_PROTOCOL_NAME => Some(tls_protocol()),
        #[cfg(feature = "http")]
        self::http::HTTP_PROTOCOL_NAME => Some(http_protocol()),
        _ => None,
    }
}

/// 所有内置协议描述符，TLS在前
pub fn builtin_protocols() -> Vec<&'static ProtocolDescriptor> {
    let mut protocols = Vec::new();
    #[cfg(feature = "tls")]
    protocols.push(tls_protocol());
    #[cfg(feature = "http")]
    protocols.push(http_protocol());
    protocols
}
