//! 嗅探器构造器模块
//!
//! 提供流畅的链式API来构建和配置主机名嗅探器。

use crate::core::{
    detector::{Sniffer, SnifferConfig},
    protocol::ProtocolDescriptor,
    registry::ProtocolRegistry,
};
use crate::error::{DetectorError, Result};
use crate::protocols::builtin_protocol;

/// 嗅探器构造器
///
/// 内置协议按启用顺序注册，自定义协议注册在其后。
///
/// # 示例
///
/// ```rust
/// use sni_detector::SnifferBuilder;
///
/// # #[cfg(all(feature = "tls", feature = "http"))]
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let sniffer = SnifferBuilder::new()
///     .enable_tls()
///     .enable_http()
///     .with_max_buffer_size(8192)
///     .with_fallback_hostname("default.example.com")
///     .build()?;
///
/// let result = sniffer.sniff(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n")?;
/// assert_eq!(result.hostname, "example.com");
/// # Ok(())
/// # }
/// # #[cfg(not(all(feature = "tls", feature = "http")))]
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct SnifferBuilder {
    config: SnifferConfig,
    custom_protocols: Vec<ProtocolDescriptor>,
}

impl Default for SnifferBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnifferBuilder {
    /// 创建新的构造器，不启用任何协议
    pub fn new() -> Self {
        Self {
            config: SnifferConfig::default().with_protocols(Vec::<String>::new()),
            custom_protocols: Vec::new(),
        }
    }

    /// 从配置创建构造器
    pub fn from_config(config: SnifferConfig) -> Self {
        Self {
            config,
            custom_protocols: Vec::new(),
        }
    }

    fn enable(mut self, name: &str) -> Self {
        if !self.config.enabled_protocols.iter().any(|p| p == name) {
            self.config.enabled_protocols.push(name.to_string());
        }
        self
    }

    /// 启用TLS（SNI）嗅探
    #[cfg(feature = "tls")]
    pub fn enable_tls(self) -> Self {
        self.enable(crate::protocols::tls::TLS_PROTOCOL_NAME)
    }

    /// 启用HTTP（Host头）嗅探
    #[cfg(feature = "http")]
    pub fn enable_http(self) -> Self {
        self.enable(crate::protocols::http::HTTP_PROTOCOL_NAME)
    }

    /// 启用所有内置协议
    pub fn enable_all(mut self) -> Self {
        for descriptor in crate::protocols::builtin_protocols() {
            self = self.enable(descriptor.name());
        }
        self
    }

    /// 添加自定义协议
    pub fn with_protocol(mut self, descriptor: ProtocolDescriptor) -> Self {
        self.custom_protocols.push(descriptor);
        self
    }

    /// 设置缓冲区上限
    pub fn with_max_buffer_size(mut self, size: usize) -> Self {
        self.config.max_buffer_size = size;
        self
    }

    /// 设置回退主机名
    pub fn with_fallback_hostname<S: Into<String>>(mut self, hostname: S) -> Self {
        self.config.fallback_hostname = Some(hostname.into());
        self
    }

    /// 设置是否优先使用端口提示
    pub fn prefer_port_hint(mut self, prefer: bool) -> Self {
        self.config.prefer_port_hint = prefer;
        self
    }

    /// 构建嗅探器
    pub fn build(self) -> Result<Sniffer> {
        if self.config.enabled_protocols.is_empty() && self.custom_protocols.is_empty() {
            return Err(DetectorError::config_error("至少需要启用一个协议"));
        }
        self.config.validate()?;

        let mut registry = ProtocolRegistry::new();
        for name in &self.config.enabled_protocols {
            let descriptor = builtin_protocol(name)
                .ok_or_else(|| DetectorError::config_error(format!("未知协议: {}", name)))?;
            registry.register(descriptor.clone())?;
        }
        for descriptor in self.custom_protocols {
            registry.register(descriptor)?;
        }

        Sniffer::new(registry, self.config)
    }
}
