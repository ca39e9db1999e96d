//! 错误处理模块
//!
//! 定义SNI-Detector中使用的所有错误类型。

use thiserror::Error;

/// SNI-Detector的结果类型
pub type Result<T> = std::result::Result<T, DetectorError>;

/// 探测器错误类型
#[derive(Error, Debug)]
pub enum DetectorError {
    /// 需要更多数据才能得出结论
    #[error("Need more data for detection, {0} bytes buffered so far")]
    NeedMoreData(usize),

    /// 缓冲区已满但仍无法得出结论
    #[error("Buffer full: {limit} bytes buffered without a complete request")]
    BufferFull {
        /// 缓冲区上限
        limit: usize,
    },

    /// 没有任何已注册协议能识别该数据
    #[error("No protocol detected: {0}")]
    NoProtocolDetected(String),

    /// 协议识别成功但请求中没有主机名
    #[error("No hostname in {protocol} request")]
    NoHostname {
        /// 协议名称
        protocol: String,
    },

    /// 数据属于该协议但格式错误
    #[error("Malformed {protocol} packet: {reason}")]
    MalformedPacket {
        /// 协议名称
        protocol: String,
        /// 错误原因
        reason: String,
    },

    /// 未知协议名称
    #[error("Unknown protocol: {name}")]
    UnknownProtocol {
        /// 协议名称
        name: String,
    },

    /// 协议名称重复注册
    #[error("Protocol already registered: {name}")]
    DuplicateProtocol {
        /// 协议名称
        name: String,
    },

    /// 配置错误
    #[error("Configuration error: {message}")]
    ConfigError {
        /// 错误消息
        message: String,
    },

    /// 非法主机名
    #[error("Invalid hostname: {0}")]
    InvalidHostname(String),

    /// I/O错误
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// 内部错误
    #[error("Internal error: {message}")]
    InternalError {
        /// 错误消息
        message: String,
    },
}

impl DetectorError {
    /// 创建无主机名错误
    pub fn no_hostname<S: Into<String>>(protocol: S) -> Self {
        Self::NoHostname {
            protocol: protocol.into(),
        }
    }

    /// 创建格式错误
    pub fn malformed<S1, S2>(protocol: S1, reason: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::MalformedPacket {
            protocol: protocol.into(),
            reason: reason.into(),
        }
    }

    /// 创建未知协议错误
    pub fn unknown_protocol<S: Into<String>>(name: S) -> Self {
        Self::UnknownProtocol { name: name.into() }
    }

    /// 创建重复协议错误
    pub fn duplicate_protocol<S: Into<String>>(name: S) -> Self {
        Self::DuplicateProtocol { name: name.into() }
    }

    /// 创建配置错误
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// 创建内部错误
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// 检查是否为可恢复错误
    ///
    /// 可恢复意味着继续读取更多数据后重新探测可能成功。
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NeedMoreData(_))
    }

    /// 检查是否为配置相关错误
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigError { .. }
                | Self::UnknownProtocol { .. }
                | Self::DuplicateProtocol { .. }
        )
    }

    /// 获取错误代码
    pub fn error_code(&self) -> u32 {
        match self {
            Self::NeedMoreData(_) => 1001,
            Self::BufferFull { .. } => 1002,
            Self::NoProtocolDetected(_) => 1003,
            Self::NoHostname { .. } => 1004,
            Self::MalformedPacket { .. } => 1005,
            Self::UnknownProtocol { .. } => 1006,
            Self::DuplicateProtocol { .. } => 1007,
            Self::ConfigError { .. } => 1008,
            Self::InvalidHostname(_) => 1009,
            Self::IoError(_) => 1010,
            Self::InternalError { .. } => 1999,
        }
    }
}

/// 从anyhow::Error转换
impl From<anyhow::Error> for DetectorError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal_error(err.to_string())
    }
}

/// 从serde_json::Error转换
impl From<serde_json::Error> for DetectorError {
    fn from(err: serde_json::Error) -> Self {
        Self::config_error(format!("JSON error: {}", err))
    }
}
