//! 统一错误类型定义.
//!
//! 比特流引擎与工具函数共用的错误类型, 解码管线会把它包装进更具体的错误中.

use std::fmt;

use thiserror::Error;

/// CRC 校验的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcKind {
    /// 帧头 CRC-8
    Header,
    /// 帧尾 CRC-16
    Frame,
}

impl fmt::Display for CrcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => f.write_str("帧头 CRC-8"),
            Self::Frame => f.write_str("帧尾 CRC-16"),
        }
    }
}

/// Yin 统一错误类型
#[derive(Debug, Error)]
pub enum YinError {
    /// 无效参数 (调用方用法错误)
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 不支持的码流特性
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 已到达输入末尾
    #[error("已到达输入末尾")]
    Eof,

    /// 在剩余输入中找不到同步点
    #[error("未找到同步点: {0}")]
    SyncNotFound(String),

    /// CRC 校验失败
    #[error("{kind} 不匹配: 读取=0x{expected:04X}, 计算=0x{actual:04X}")]
    CrcMismatch {
        kind: CrcKind,
        expected: u16,
        actual: u16,
    },

    /// 超出固定容量的缓冲区上限
    #[error("超出容量上限: {0}")]
    CapacityExceeded(String),
}

/// Yin 统一 Result 类型
pub type YinResult<T> = Result<T, YinError>;
