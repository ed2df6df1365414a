//! 解码管线错误类型.
//!
//! 所有错误都是致命的: 解码要么返回完整的波形, 要么返回其中一个错误,
//! 不会返回部分结果.

use thiserror::Error;
use yin_core::YinError;
use yin_flac::StreamInfoField;

/// 解码失败的原因
#[derive(Debug, Error)]
pub enum DecodeError {
    /// 输入为空
    #[error("输入为空")]
    EmptyInput,

    /// 找不到码流起点
    #[error("同步失败: {0}")]
    SyncFailure(#[source] YinError),

    /// 读取某个 STREAMINFO 字段失败
    #[error("读取 STREAMINFO 字段 {field} 失败: {source}")]
    StreamInfoExtraction {
        field: StreamInfoField,
        #[source]
        source: YinError,
    },

    /// STREAMINFO 中的参数超出支持范围
    #[error("无效的流参数: {field} = {value}")]
    InvalidStreamParameters { field: StreamInfoField, value: u64 },

    /// 元数据块中没有 STREAMINFO
    #[error("未找到 STREAMINFO 元数据块")]
    StreamInfoNotFound,

    /// 实际解码的采样数与声明的总数不一致
    #[error("采样数不匹配: 期望 {expected}, 实际 {decoded}")]
    SampleCountMismatch { expected: u64, decoded: u64 },

    /// 一帧都没有解码出来
    #[error("没有解码出任何音频帧")]
    NoFramesDecoded,

    /// 帧头参数与 STREAMINFO 不一致 (仅在启用逐帧校验时返回)
    #[error("第 {frame_index} 帧的 {field} 与 STREAMINFO 不一致: 期望 {expected}, 实际 {actual}")]
    FrameParameterMismatch {
        frame_index: u64,
        field: StreamInfoField,
        expected: u64,
        actual: u64,
    },

    /// 解码结果的 MD5 与 STREAMINFO 签名不一致 (仅在启用 MD5 校验时返回)
    #[error("MD5 不匹配: 期望 {}, 实际 {}", hex(.expected), hex(.actual))]
    Md5Mismatch { expected: [u8; 16], actual: [u8; 16] },
}

fn hex(bytes: &[u8; 16]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
