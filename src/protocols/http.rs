//! HTTP协议：从请求头的Host字段中提取主机名

use crate::core::protocol::{PacketParser, ParseOutcome, ProtocolDescriptor};
use crate::utils::hostname::normalize_hostname;
use bytes::Bytes;
use http::header::HOST;
use http::Method;
use once_cell::sync::Lazy;
use tracing::{debug, trace};

/// HTTP协议名称
pub const HTTP_PROTOCOL_NAME: &str = "http";

/// HTTP默认端口
pub const HTTP_DEFAULT_PORT: u16 = 80;

/// 请求方法最大长度，超过即认为不是HTTP
pub const MAX_METHOD_LEN: usize = 32;

/// 无法路由时返回的503响应
pub static HTTP_SERVICE_UNAVAILABLE: &[u8] = concat!(
    "HTTP/1.1 503 Service Temporarily Unavailable\r\n",
    "Content-Type: text/html\r\n",
    "Content-Length: 83\r\n",
    "Connection: close\r\n",
    "\r\n",
    "<html><head></head><body><h1>503 Service Temporarily Unavailable</h1></body></html>",
)
.as_bytes();

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn find_crlf(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|i| from + i)
}

/// 请求行是否以" HTTP/x.y"结尾
fn has_http_version(line: &[u8]) -> bool {
    if line.len() < 9 {
        return false;
    }
    let suffix = &line[line.len() - 9..];
    suffix[0] == b' '
        && &suffix[1..6] == b"HTTP/"
        && suffix[6].is_ascii_digit()
        && suffix[7] == b'.'
        && suffix[8].is_ascii_digit()
}

/// 去掉Host值中的端口部分，保留IPv6字面量的方括号
fn strip_port(value: &[u8]) -> &[u8] {
    for i in (0..value.len()).rev() {
        match value[i] {
            b':' => return &value[..i],
            b'0'..=b'9' => continue,
            _ => break,
        }
    }
    value
}

fn trim_blank(value: &[u8]) -> &[u8] {
    let start = value
        .iter()
        .position(|&b| b != b' ' && b != b'\t')
        .unwrap_or(value.len());
    let end = value
        .iter()
        .rposition(|&b| b != b' ' && b != b'\t')
        .map_or(start, |i| i + 1);
    &value[start..end]
}

/// 如果是Host头则返回其值
fn host_value(line: &[u8]) -> Option<&[u8]> {
    let colon = line.iter().position(|&b| b == b':')?;
    let name = &line[..colon];
    if name.eq_ignore_ascii_case(HOST.as_str().as_bytes()) {
        Some(trim_blank(&line[colon + 1..]))
    } else {
        None
    }
}

/// HTTP Host解析器
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpParser;

impl HttpParser {
    /// 创建新的解析器
    pub fn new() -> Self {
        Self
    }

    fn parse_request(&self, data: &[u8]) -> ParseOutcome {
        if data.is_empty() {
            return ParseOutcome::Incomplete;
        }

        let line_end = find_crlf(data, 0);
        let request_line = match line_end {
            Some(end) => &data[..end],
            None => data,
        };

        match request_line.iter().position(|&b| b == b' ') {
            Some(0) => return ParseOutcome::NotThisProtocol,
            Some(end) => {
                if Method::from_bytes(&request_line[..end]).is_err() {
                    return ParseOutcome::NotThisProtocol;
                }
            }
            None => {
                let plausible = line_end.is_none()
                    && request_line.len() <= MAX_METHOD_LEN
                    && request_line.iter().all(|&b| is_token_byte(b));
                return if plausible {
                    ParseOutcome::Incomplete
                } else {
                    ParseOutcome::NotThisProtocol
                };
            }
        }

        let line_end = match line_end {
            Some(end) => end,
            None => return ParseOutcome::Incomplete,
        };

        if !has_http_version(request_line) {
            trace!("Request line does not end with an HTTP version");
            return ParseOutcome::NotThisProtocol;
        }

        let mut pos = line_end + 2;
        loop {
            match find_crlf(data, pos) {
                None => return ParseOutcome::Incomplete,
                Some(end) if end == pos => {
                    debug!("HTTP request has no Host header");
                    return ParseOutcome::NoHostname;
                }
                Some(end) => {
                    if let Some(value) = host_value(&data[pos..end]) {
                        return self.extract_host(value);
                    }
                    pos = end + 2;
                }
            }
        }
    }

    fn extract_host(&self, value: &[u8]) -> ParseOutcome {
        match normalize_hostname(strip_port(value)) {
            Ok(hostname) => ParseOutcome::Parsed(hostname),
            Err(e) => {
                debug!("Rejecting Host header: {}", e);
                ParseOutcome::malformed("invalid hostname")
            }
        }
    }
}

impl PacketParser for HttpParser {
    fn parse_packet(&self, packet: &[u8]) -> ParseOutcome {
        self.parse_request(packet)
    }
}

static HTTP_PROTOCOL: Lazy<ProtocolDescriptor> = Lazy::new(|| {
    ProtocolDescriptor::new(HTTP_PROTOCOL_NAME, HTTP_DEFAULT_PORT, HttpParser::new())
        .with_abort_message(Bytes::from_static(HTTP_SERVICE_UNAVAILABLE))
});

/// 内置HTTP协议描述符
pub fn http_protocol() -> &'static ProtocolDescriptor {
    &HTTP_PROTOCOL
}
