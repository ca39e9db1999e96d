//! 协议描述符模块
//!
//! 定义协议描述符、数据包解析能力以及解析结果。

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// 单次解析尝试的结果
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParseOutcome {
    /// 解析成功，携带已校验、已规范化的主机名
    Parsed(String),
    /// 数据是该协议的合法前缀，需要更多数据
    Incomplete,
    /// 完整且合法的请求，但其中没有主机名
    NoHostname,
    /// 数据不属于该协议
    NotThisProtocol,
    /// 数据属于该协议但格式错误
    Malformed(String),
}

impl ParseOutcome {
    /// 创建格式错误结果
    pub fn malformed<S: Into<String>>(reason: S) -> Self {
        Self::Malformed(reason.into())
    }

    /// 是否解析出了主机名
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }

    /// 是否需要更多数据
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::Incomplete)
    }

    /// 取出主机名
    pub fn into_hostname(self) -> Option<String> {
        match self {
            Self::Parsed(hostname) => Some(hostname),
            _ => None,
        }
    }
}

impl fmt::Display for ParseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed(hostname) => write!(f, "parsed({})", hostname),
            Self::Incomplete => write!(f, "incomplete"),
            Self::NoHostname => write!(f, "no hostname"),
            Self::NotThisProtocol => write!(f, "not this protocol"),
            Self::Malformed(reason) => write!(f, "malformed: {}", reason),
        }
    }
}

/// 数据包解析能力
///
/// 实现者检查调用方持有的字节缓冲区，从中提取用于路由的主机名。
/// 实现不得在调用结束后保留缓冲区，且必须可以被多个线程同时调用。
pub trait PacketParser: Send + Sync {
    /// 解析数据包
    fn parse_packet(&self, packet: &[u8]) -> ParseOutcome;
}

impl<F> PacketParser for F
where
    F: Fn(&[u8]) -> ParseOutcome + Send + Sync,
{
    fn parse_packet(&self, packet: &[u8]) -> ParseOutcome {
        self(packet)
    }
}

/// 协议描述符
///
/// 不可变的能力记录：协议名称、默认端口、解析能力和中止消息
/// 在构造时确定，之后不会改变。克隆共享同一个解析器实例。
///
/// # 示例
///
/// ```rust
/// use sni_detector::core::protocol::{ParseOutcome, ProtocolDescriptor};
///
/// let descriptor = ProtocolDescriptor::new("echo", 443, |_: &[u8]| ParseOutcome::Incomplete);
/// assert_eq!(descriptor.default_port(), 443);
/// assert_eq!(descriptor.parse_packet(b"\x16"), ParseOutcome::Incomplete);
/// ```
#[derive(Clone)]
pub struct ProtocolDescriptor {
    name: &'static str,
    default_port: u16,
    parser: Arc<dyn PacketParser>,
    abort_message: Bytes,
}

impl ProtocolDescriptor {
    /// 创建新的协议描述符
    pub fn new<P>(name: &'static str, default_port: u16, parser: P) -> Self
    where
        P: PacketParser + 'static,
    {
        Self::from_arc(name, default_port, Arc::new(parser))
    }

    /// 使用共享解析器创建协议描述符
    pub fn from_arc(name: &'static str, default_port: u16, parser: Arc<dyn PacketParser>) -> Self {
        Self {
            name,
            default_port,
            parser,
            abort_message: Bytes::new(),
        }
    }

    /// 设置中止消息
    pub fn with_abort_message(mut self, message: impl Into<Bytes>) -> Self {
        self.abort_message = message.into();
        self
    }

    /// 协议名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 协议的默认端口
    pub fn default_port(&self) -> u16 {
        self.default_port
    }

    /// 解析能力
    pub fn parser(&self) -> &Arc<dyn PacketParser> {
        &self.parser
    }

    /// 无法路由时回写给客户端的消息
    pub fn abort_message(&self) -> &Bytes {
        &self.abort_message
    }

    /// 端口是否为该协议的默认端口
    pub fn matches_port(&self, port: u16) -> bool {
        self.default_port == port
    }

    /// 解析数据包
    pub fn parse_packet(&self, packet: &[u8]) -> ParseOutcome {
        self.parser.parse_packet(packet)
    }
}

impl fmt::Debug for ProtocolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolDescriptor")
            .field("name", &self.name)
            .field("default_port", &self.default_port)
            .field("abort_message_len", &self.abort_message.len())
            .finish()
    }
}

impl fmt::Display for ProtocolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.default_port)
    }
}
