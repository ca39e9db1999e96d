//! # SNI-Detector: 协议描述符与主机名嗅探
//!
//! 从连接的首个数据包中提取用于路由的主机名。
//! 每种协议由一个不可变的协议描述符表示：协议名称、默认端口、
//! 解析能力以及无法路由时回写给客户端的中止消息。
//!
//! ## 特性
//!
//! - **TLS**: 从ClientHello的SNI扩展中提取主机名
//! - **HTTP**: 从请求头的Host字段中提取主机名
//! - **可扩展**: 任何实现`PacketParser`的类型或闭包都可以成为协议
//! - **增量嗅探**: 按连接累积数据，直到得出结论
//!
//! ## 快速开始
//!
//! ```rust
//! use sni_detector::{SnifferBuilder, SniffBuffer, SniffState};
//!
//! # #[cfg(all(feature = "tls", feature = "http"))]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sniffer = SnifferBuilder::new().enable_all().build()?;
//! let mut buffer = SniffBuffer::for_sniffer(&sniffer);
//!
//! buffer.extend(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n")?;
//! if let SniffState::Ready(result) = buffer.poll(&sniffer) {
//!     assert_eq!(result.protocol, "http");
//!     assert_eq!(result.hostname, "example.com");
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(all(feature = "tls", feature = "http")))]
//! # fn main() {}
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// 核心模块
pub mod core;
pub mod error;

// 工具模块
pub mod utils;

// 功能模块
pub mod protocols;
pub mod stream;

// 构造器
pub mod builder;

// 重新导出核心类型
pub use crate::core::{
    detector::{DetectionResult, DetectionStats, Sniffer, SnifferConfig},
    protocol::{PacketParser, ParseOutcome, ProtocolDescriptor},
    registry::ProtocolRegistry,
};

pub use crate::builder::SnifferBuilder;
pub use crate::error::{DetectorError, Result};
pub use crate::stream::{SniffBuffer, SniffState};

/// 库版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库名称
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// 库描述
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
