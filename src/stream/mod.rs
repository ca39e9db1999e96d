//! 流处理模块
//!
//! 为单个连接累积首包数据，直到能够得出嗅探结论。

pub mod buffer;

pub use buffer::{SniffBuffer, SniffState};
