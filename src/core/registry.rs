//! 协议注册表模块
//!
//! 按注册顺序保存协议描述符，支持按名称和端口查找。

use crate::core::protocol::ProtocolDescriptor;
use crate::error::{DetectorError, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// 协议注册表
#[derive(Default, Clone)]
pub struct ProtocolRegistry {
    protocols: Vec<ProtocolDescriptor>,
    by_name: HashMap<&'static str, usize>,
}

impl std::fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolRegistry")
            .field("protocols", &self.names())
            .finish()
    }
}

static BUILTIN_REGISTRY: Lazy<ProtocolRegistry> = Lazy::new(|| {
    let mut registry = ProtocolRegistry::new();
    for descriptor in crate::protocols::builtin_protocols() {
        // 内置协议名称互不相同
        let registered = registry.register(descriptor.clone());
        debug_assert!(
            registered.is_ok(),
            "duplicate builtin protocol {}",
            descriptor.name()
        );
    }
    registry
});

impl ProtocolRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 包含所有内置协议的注册表
    pub fn builtin() -> &'static ProtocolRegistry {
        &BUILTIN_REGISTRY
    }

    /// 注册协议描述符
    ///
    /// 名称已存在时返回`DuplicateProtocol`错误，注册表保持不变。
    pub fn register(&mut self, descriptor: ProtocolDescriptor) -> Result<()> {
        let name = descriptor.name();
        if self.by_name.contains_key(name) {
            return Err(DetectorError::duplicate_protocol(name));
        }
        self.by_name.insert(name, self.protocols.len());
        self.protocols.push(descriptor);
        Ok(())
    }

    /// 按名称查找
    pub fn get(&self, name: &str) -> Option<&ProtocolDescriptor> {
        self.by_name.get(name).map(|&index| &self.protocols[index])
    }

    /// 按名称查找，未找到时返回错误
    pub fn require(&self, name: &str) -> Result<&ProtocolDescriptor> {
        self.get(name)
            .ok_or_else(|| DetectorError::unknown_protocol(name))
    }

    /// 默认端口为`port`的所有协议，按注册顺序
    pub fn by_port(&self, port: u16) -> Vec<&ProtocolDescriptor> {
        self.protocols
            .iter()
            .filter(|descriptor| descriptor.matches_port(port))
            .collect()
    }

    /// 是否包含指定协议
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// 所有协议名称，按注册顺序
    pub fn names(&self) -> Vec<&'static str> {
        self.protocols.iter().map(|descriptor| descriptor.name()).collect()
    }

    /// 按注册顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &ProtocolDescriptor> {
        self.protocols.iter()
    }

    /// 端口提示对应的协议排在前面，其余保持注册顺序
    pub fn dispatch_order(&self, port_hint: Option<u16>) -> Vec<&ProtocolDescriptor> {
        match port_hint {
            Some(port) => {
                let (mut preferred, rest): (Vec<_>, Vec<_>) = self
                    .protocols
                    .iter()
                    .partition(|descriptor| descriptor.matches_port(port));
                preferred.extend(rest);
                preferred
            }
            None => self.protocols.iter().collect(),
        }
    }

    /// 协议数量
    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }
}
