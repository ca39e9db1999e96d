//! 工具模块
//!
//! 日志初始化与主机名处理。

pub mod hostname;
pub mod logger;

pub use hostname::{is_valid_hostname, normalize_hostname};
pub use logger::{init_logger, LogLevel, LogTarget, LoggerConfig, LoggerConfigBuilder};
