//! 核心抽象模块
//!
//! 包含协议描述符、协议注册表和嗅探器。

pub mod detector;
pub mod protocol;
pub mod registry;

pub use detector::{DetectionResult, DetectionStats, Sniffer, SnifferConfig};
pub use protocol::{PacketParser, ParseOutcome, ProtocolDescriptor};
pub use registry::ProtocolRegistry;
