//! TLS协议：从ClientHello的SNI扩展中提取主机名

use crate::core::protocol::{PacketParser, ParseOutcome, ProtocolDescriptor};
use crate::utils::hostname::normalize_hostname;
use bytes::Bytes;
use once_cell::sync::Lazy;
use tracing::debug;

/// TLS协议名称
pub const TLS_PROTOCOL_NAME: &str = "tls";

/// TLS默认端口
pub const TLS_DEFAULT_PORT: u16 = 443;

/// TLS记录头长度
pub const TLS_HEADER_LEN: usize = 5;

/// 致命handshake_failure警报
pub static TLS_HANDSHAKE_FAILURE_ALERT: [u8; 7] = [
    0x15, // 警报
    0x03, 0x01, // TLS 1.0
    0x00, 0x02, // 负载长度
    0x02, 0x28, // fatal, handshake_failure
];

/// TLS记录类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsRecordType {
    /// 改变密码规范
    ChangeCipherSpec = 0x14,
    /// 警报
    Alert = 0x15,
    /// 握手
    Handshake = 0x16,
    /// 应用数据
    ApplicationData = 0x17,
}

impl TlsRecordType {
    /// 从u8值创建TLS记录类型
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x14 => Some(TlsRecordType::ChangeCipherSpec),
            0x15 => Some(TlsRecordType::Alert),
            0x16 => Some(TlsRecordType::Handshake),
            0x17 => Some(TlsRecordType::ApplicationData),
            _ => None,
        }
    }
}

/// ClientHello握手类型
const HANDSHAKE_CLIENT_HELLO: u8 = 0x01;

/// server_name扩展类型
const EXTENSION_SERVER_NAME: u16 = 0x0000;

/// host_name名称类型
const SERVER_NAME_HOST_NAME: u8 = 0x00;

/// 握手头(4) + 版本(2) + 随机数(32)
const CLIENT_HELLO_FIXED_LEN: usize = 38;

fn be16(data: &[u8], pos: usize) -> usize {
    u16::from_be_bytes([data[pos], data[pos + 1]]) as usize
}

/// TLS SNI解析器
#[derive(Debug, Clone, Copy, Default)]
pub struct TlsParser;

impl TlsParser {
    /// 创建新的解析器
    pub fn new() -> Self {
        Self
    }

    fn parse_record(&self, data: &[u8]) -> ParseOutcome {
        if data.is_empty() {
            return ParseOutcome::Incomplete;
        }

        if data[0] != TlsRecordType::Handshake as u8 && data[0] & 0x80 == 0 {
            return ParseOutcome::NotThisProtocol;
        }

        if data.len() < TLS_HEADER_LEN {
            return ParseOutcome::Incomplete;
        }

        if data[0] & 0x80 != 0 && data[2] == 1 {
            debug!("Received SSL 2.0 Client Hello which can not support SNI");
            return ParseOutcome::NoHostname;
        }

        if TlsRecordType::from_u8(data[0]) != Some(TlsRecordType::Handshake) {
            return ParseOutcome::NotThisProtocol;
        }

        let version_major = data[1];
        let version_minor = data[2];
        if version_major < 3 {
            debug!(
                "Received SSL {}.{} handshake which can not support SNI",
                version_major, version_minor
            );
            return ParseOutcome::NoHostname;
        }

        let record_len = be16(data, 3) + TLS_HEADER_LEN;
        if data.len() < record_len {
            return ParseOutcome::Incomplete;
        }

        // 只检查第一条记录
        let record = &data[..record_len];
        self.parse_client_hello(record, version_major, version_minor)
    }

    fn parse_client_hello(&self, record: &[u8], major: u8, minor: u8) -> ParseOutcome {
        let mut pos = TLS_HEADER_LEN;

        if pos + 1 > record.len() {
            return ParseOutcome::malformed("empty handshake record");
        }
        if record[pos] != HANDSHAKE_CLIENT_HELLO {
            debug!("TLS handshake is not a ClientHello (type {})", record[pos]);
            return ParseOutcome::malformed("not a client hello");
        }

        pos += CLIENT_HELLO_FIXED_LEN;

        // 会话ID
        if pos + 1 > record.len() {
            return ParseOutcome::malformed("truncated session id");
        }
        pos += 1 + record[pos] as usize;

        // 密码套件
        if pos + 2 > record.len() {
            return ParseOutcome::malformed("truncated cipher suites");
        }
        pos += 2 + be16(record, pos);

        // 压缩方法
        if pos + 1 > record.len() {
            return ParseOutcome::malformed("truncated compression methods");
        }
        pos += 1 + record[pos] as usize;

        if pos == record.len() && major == 3 && minor == 0 {
            debug!("Received SSL 3.0 handshake without extensions");
            return ParseOutcome::NoHostname;
        }

        // 扩展
        if pos + 2 > record.len() {
            return ParseOutcome::malformed("truncated extensions length");
        }
        let extensions_len = be16(record, pos);
        pos += 2;

        if pos + extensions_len > record.len() {
            return ParseOutcome::malformed("extensions overrun record");
        }

        self.parse_extensions(&record[pos..pos + extensions_len])
    }

    fn parse_extensions(&self, extensions: &[u8]) -> ParseOutcome {
        let mut pos = 0;

        while pos + 4 <= extensions.len() {
            let extension_type = be16(extensions, pos) as u16;
            let extension_len = be16(extensions, pos + 2);

            if extension_type == EXTENSION_SERVER_NAME {
                if pos + 4 + extension_len > extensions.len() {
                    return ParseOutcome::malformed("server_name extension overruns block");
                }
                return self.parse_server_name(&extensions[pos + 4..pos + 4 + extension_len]);
            }

            pos += 4 + extension_len;
        }

        if pos != extensions.len() {
            return ParseOutcome::malformed("trailing bytes in extensions block");
        }

        ParseOutcome::NoHostname
    }

    fn parse_server_name(&self, extension: &[u8]) -> ParseOutcome {
        // 跳过名称列表长度
        let mut pos = 2;

        while pos + 3 < extension.len() {
            let name_len = be16(extension, pos + 1);
            if pos + 3 + name_len > extension.len() {
                return ParseOutcome::malformed("server name overruns extension");
            }

            match extension[pos] {
                SERVER_NAME_HOST_NAME => {
                    let name = &extension[pos + 3..pos + 3 + name_len];
                    return match normalize_hostname(name) {
                        Ok(hostname) => ParseOutcome::Parsed(hostname),
                        Err(e) => {
                            debug!("Rejecting SNI value: {}", e);
                            ParseOutcome::malformed("invalid hostname")
                        }
                    };
                }
                other => debug!("Unknown server name type {}", other),
            }

            pos += 3 + name_len;
        }

        if pos != extension.len() {
            return ParseOutcome::malformed("trailing bytes in server name list");
        }

        ParseOutcome::NoHostname
    }
}

impl PacketParser for TlsParser {
    fn parse_packet(&self, packet: &[u8]) -> ParseOutcome {
        self.parse_record(packet)
    }
}

static TLS_PROTOCOL: Lazy<ProtocolDescriptor> = Lazy::new(|| {
    ProtocolDescriptor::new(TLS_PROTOCOL_NAME, TLS_DEFAULT_PORT, TlsParser::new())
        .with_abort_message(Bytes::from_static(&TLS_HANDSHAKE_FAILURE_ALERT))
});

/// 内置TLS协议描述符
pub fn tls_protocol() -> &'static ProtocolDescriptor {
    &TLS_PROTOCOL
}

/// 构造测试用ClientHello记录
#[cfg(test)]
pub(crate) fn client_hello(server_name: Option<&[u8]>) -> Vec<u8> {
    let mut extensions = Vec::new();
    // 一个无关的扩展：supported_groups
    extensions.extend_from_slice(&[0x00, 0x0a, 0x00, 0x04, 0x00, 0x02, 0x00, 0x17]);
    if let Some(name) = server_name {
        let entry_len = 3 + name.len();
        let list_len = entry_len;
        let ext_len = 2 + list_len;
        extensions.extend_from_slice(&[0x00, 0x00]);
        extensions.extend_from_slice(&(ext_len as u16).to_be_bytes());
        extensions.extend_from_slice(&(list_len as u16).to_be_bytes());
        extensions.push(SERVER_NAME_HOST_NAME);
        extensions.extend_from_slice(&(name.len() as u16).to_be_bytes());
        extensions.extend_from_slice(name);
    }

    let mut body = Vec::new();
    body.extend_from_slice(&[0x03, 0x03]);
    body.extend_from_slice(&[0x11; 32]);
    body.push(0x00); // 会话ID长度
    body.extend_from_slice(&[0x00, 0x02, 0x13, 0x01]);
    body.extend_from_slice(&[0x01, 0x00]);
    body.extend_from_slice(&(extensions.len() as u16).to_be_bytes());
    body.extend_from_slice(&extensions);

    let mut handshake = vec![HANDSHAKE_CLIENT_HELLO];
    handshake.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
    handshake.extend_from_slice(&body);

    let mut record = vec![0x16, 0x03, 0x01];
    record.extend_from_slice(&(handshake.len() as u16).to_be_bytes());
    record.extend_from_slice(&handshake);
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &[u8]) -> ParseOutcome {
        TlsParser::new().parse_packet(data)
    }

    #[test]
    fn test_extracts_sni() {
        let record = client_hello(Some(b"Example.COM"));
        assert_eq!(parse(&record), ParseOutcome::Parsed("example.com".to_string()));
    }

    #[test]
    fn test_missing_sni() {
        let record = client_hello(None);
        assert_eq!(parse(&record), ParseOutcome::NoHostname);
    }

    #[test]
    fn test_every_prefix_is_incomplete() {
        let record = client_hello(Some(b"example.com"));
        for end in 0..record.len() {
            assert_eq!(parse(&record[..end]), ParseOutcome::Incomplete, "prefix {}", end);
        }
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut record = client_hello(Some(b"example.com"));
        record.extend_from_slice(&[0x17, 0x03, 0x03, 0x00, 0x01, 0xff]);
        assert_eq!(parse(&record), ParseOutcome::Parsed("example.com".to_string()));
    }

    #[test]
    fn test_not_tls() {
        assert_eq!(parse(b"GET / HTTP/1.1\r\n"), ParseOutcome::NotThisProtocol);
        assert_eq!(parse(&[0x17, 0x03, 0x03, 0x00, 0x01, 0x00]), ParseOutcome::NotThisProtocol);
    }

    #[test]
    fn test_sslv2_hello() {
        let hello = [0x80, 0x2e, 0x01, 0x00, 0x02, 0x00, 0x15];
        assert_eq!(parse(&hello), ParseOutcome::NoHostname);
    }

    #[test]
    fn test_ssl2_record_version() {
        assert_eq!(parse(&[0x16, 0x02, 0x00, 0x00, 0x10]), ParseOutcome::NoHostname);
    }

    #[test]
    fn test_not_client_hello() {
        let mut record = client_hello(Some(b"example.com"));
        record[5] = 0x02;
        assert!(matches!(parse(&record), ParseOutcome::Malformed(_)));
    }

    #[test]
    fn test_corrupt_extensions_length() {
        let mut record = client_hello(Some(b"example.com"));
        // 扩展长度位于 5 + 4 + 2 + 32 + 1 + 4 + 2
        let pos = 5 + 4 + 2 + 32 + 1 + 4 + 2;
        record[pos] = 0xff;
        assert!(matches!(parse(&record), ParseOutcome::Malformed(_)));
    }

    #[test]
    fn test_invalid_sni_value() {
        let record = client_hello(Some(b"bad host"));
        assert_eq!(parse(&record), ParseOutcome::malformed("invalid hostname"));
    }

    #[test]
    fn test_alpn_client_hello_without_sni() {
        // ClientHello只带ALPN和其他扩展
        let tls_h2_data = vec![
            0x16, 0x03, 0x01, 0x00, 0x49,
            0x01, 0x00, 0x00, 0x45,
            0x03, 0x03,
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
            0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10,
            0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18,
            0x19, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f, 0x20,
            0x00, // 会话ID长度
            0x00, 0x02, // 密码套件长度
            0x13, 0x01,
            0x01, 0x00, // 压缩方法
            0x00, 0x1a, // 扩展总长度
            0x00, 0x10, 0x00, 0x06, 0x00, 0x04, 0x03, 0x68, 0x32, 0x00,
            0x00, 0x0d, 0x00, 0x04, 0x00, 0x02, 0x04, 0x03,
            0x00, 0x0a, 0x00, 0x04, 0x00, 0x02, 0x00, 0x17,
        ];
        assert_eq!(parse(&tls_h2_data), ParseOutcome::NoHostname);
    }

    /// 在压缩方法之后结束的ClientHello
    fn hello_without_extensions(minor: u8) -> Vec<u8> {
        let mut body = vec![0x03, minor];
        body.extend_from_slice(&[0x22; 32]);
        body.push(0x00);
        body.extend_from_slice(&[0x00, 0x02, 0x00, 0x2f]);
        body.extend_from_slice(&[0x01, 0x00]);

        let mut handshake = vec![HANDSHAKE_CLIENT_HELLO, 0x00, 0x00, body.len() as u8];
        handshake.extend_from_slice(&body);

        let mut record = vec![0x16, 0x03, minor, 0x00, handshake.len() as u8];
        record.extend_from_slice(&handshake);
        record
    }

    #[test]
    fn test_ssl3_hello_without_extensions() {
        let record = hello_without_extensions(0);
        assert_eq!(record.len(), 5 + 4 + 41);
        assert_eq!(parse(&record), ParseOutcome::NoHostname);
    }

    #[test]
    fn test_tls1_hello_without_extensions() {
        for minor in 1..=3 {
            let record = hello_without_extensions(minor);
            assert_eq!(
                parse(&record),
                ParseOutcome::malformed("truncated extensions length"),
                "TLS 1.{}",
                minor - 1
            );
        }
    }

    #[test]
    fn test_descriptor() {
        let descriptor = tls_protocol();
        assert_eq!(descriptor.name(), "tls");
        assert_eq!(descriptor.default_port(), 443);
        assert_eq!(descriptor.abort_message().as_ref(), &TLS_HANDSHAKE_FAILURE_ALERT[..]);
    }
}
