//! 嗅探缓冲区模块
//!
//! 按连接累积客户端发来的字节，每次追加后重新嗅探。

use crate::core::detector::{DetectionResult, Sniffer};
use crate::error::{DetectorError, Result};
use bytes::{Bytes, BytesMut};
use tracing::trace;

/// 嗅探状态
#[derive(Debug)]
pub enum SniffState {
    /// 已得出主机名
    Ready(DetectionResult),
    /// 需要继续读取
    Pending,
    /// 无法路由，调用方应发送中止消息并关闭连接
    Failed(DetectorError),
}

impl SniffState {
    /// 是否已得出结论
    pub fn is_settled(&self) -> bool {
        !matches!(self, SniffState::Pending)
    }
}

/// 嗅探缓冲区
#[derive(Debug)]
pub struct SniffBuffer {
    data: BytesMut,
    capacity: usize,
    chunks: usize,
}

impl SniffBuffer {
    /// 创建指定容量的缓冲区
    pub fn new(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            capacity,
            chunks: 0,
        }
    }

    /// 创建与嗅探器缓冲区上限一致的缓冲区
    pub fn for_sniffer(sniffer: &Sniffer) -> Self {
        Self::new(sniffer.max_buffer_size())
    }

    /// 追加数据
    ///
    /// 超过容量时返回`BufferFull`，缓冲区内容不变。
    pub fn extend(&mut self, chunk: &[u8]) -> Result<()> {
        if self.data.len() + chunk.len() > self.capacity {
            return Err(DetectorError::BufferFull {
                limit: self.capacity,
            });
        }

        self.data.extend_from_slice(chunk);
        self.chunks += 1;
        trace!(
            "Buffered chunk {} ({} bytes, {} total)",
            self.chunks,
            chunk.len(),
            self.data.len()
        );
        Ok(())
    }

    /// 使用当前数据嗅探
    pub fn poll(&self, sniffer: &Sniffer) -> SniffState {
        Self::settle(sniffer.sniff(&self.data))
    }

    /// 使用端口提示嗅探
    pub fn poll_with_port_hint(&self, sniffer: &Sniffer, port: u16) -> SniffState {
        Self::settle(sniffer.sniff_with_port_hint(&self.data, port))
    }

    fn settle(result: Result<DetectionResult>) -> SniffState {
        match result {
            Ok(detection) => SniffState::Ready(detection),
            Err(DetectorError::NeedMoreData(_)) => SniffState::Pending,
            Err(e) => SniffState::Failed(e),
        }
    }

    /// 已缓冲的数据
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// 交出已缓冲的数据，用于转发给后端
    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }

    /// 清空缓冲区
    pub fn clear(&mut self) {
        self.data.clear();
        self.chunks = 0;
    }

    /// 已缓冲字节数
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 剩余容量
    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    /// 是否已满
    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    /// 容量
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 已追加的数据块数量
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }
}
