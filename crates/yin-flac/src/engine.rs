//! 比特流引擎 trait 定义.
//!
//! 解码管线只通过 [`BitstreamEngine`] 与引擎交互, 引擎实例由调用方显式传入,
//! 每次解码独占一个实例, 不存在全局状态.
//!
//! 所有读取类方法都接收"当前游标之后的剩余输入", 并返回本次消费的字节数;
//! 游标由调用方维护.

use std::fmt;

use yin_core::YinResult;

use crate::scratch::FrameScratch;

/// STREAMINFO 中可单独提取的字段
///
/// 字段在 STREAMINFO 中按声明顺序排列, 提取必须按顺序进行.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamInfoField {
    /// 最小块大小 (16 bits)
    MinBlockSize,
    /// 最大块大小 (16 bits)
    MaxBlockSize,
    /// 最小帧字节数 (24 bits, 0 表示未知)
    MinFrameSize,
    /// 最大帧字节数 (24 bits, 0 表示未知)
    MaxFrameSize,
    /// 采样率 (20 bits)
    SampleRate,
    /// 声道数 (3 bits, 存储值为声道数 - 1)
    ChannelCount,
    /// 位深 (5 bits, 存储值为位深 - 1)
    BitsPerSample,
    /// 每声道总采样数 (36 bits)
    TotalSamples,
}

impl fmt::Display for StreamInfoField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MinBlockSize => "最小块大小",
            Self::MaxBlockSize => "最大块大小",
            Self::MinFrameSize => "最小帧大小",
            Self::MaxFrameSize => "最大帧大小",
            Self::SampleRate => "采样率",
            Self::ChannelCount => "声道数",
            Self::BitsPerSample => "位深",
            Self::TotalSamples => "总采样数",
        };
        f.write_str(name)
    }
}

/// 声道分配模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAssignment {
    /// 独立声道, 参数为声道数 (1-8)
    Independent(u32),
    /// 左-侧: ch0 = left, ch1 = side
    LeftSide,
    /// 右-侧: ch0 = side, ch1 = right
    RightSide,
    /// 中-侧: ch0 = mid, ch1 = side
    MidSide,
}

impl ChannelAssignment {
    /// 该分配模式下的实际声道数
    pub fn channels(self) -> u32 {
        match self {
            Self::Independent(n) => n,
            _ => 2,
        }
    }
}

/// 帧头中的编号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameNumber {
    /// 固定块大小流: 帧序号
    Frame(u64),
    /// 可变块大小流: 首个采样的序号
    Sample(u64),
}

/// 已解码帧的帧头
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// 块大小 (每声道采样数)
    pub block_size: u32,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道分配模式
    pub channel_assignment: ChannelAssignment,
    /// 实际声道数
    pub channels: u32,
    /// 位深
    pub bits_per_sample: u32,
    /// 帧号或采样号
    pub number: FrameNumber,
}

/// FLAC 比特流引擎
///
/// 解码流程:
/// 1. `reset()` 初始化状态
/// 2. `sync()` 定位码流起点
/// 3. 通过 `is_at_metadata_block()` / `is_stream_info_block()` 遍历元数据块,
///    用 `extract_stream_info_field()` 读取 STREAMINFO 字段, 用 `sync()` 跳过其他块
/// 4. 反复调用 `decode_frame()`, 直到返回错误
pub trait BitstreamEngine {
    /// 重置为初始状态 (容器类型未知)
    fn reset(&mut self);

    /// 前进到下一个可识别的结构边界, 返回消费的字节数
    fn sync(&mut self, input: &[u8]) -> YinResult<usize>;

    /// 游标当前是否位于元数据块内
    fn is_at_metadata_block(&self) -> bool;

    /// 游标当前是否位于 STREAMINFO 块内
    fn is_stream_info_block(&self) -> bool;

    /// 提取一个 STREAMINFO 字段, 返回 (消费的字节数, 字段值)
    fn extract_stream_info_field(
        &mut self,
        input: &[u8],
        field: StreamInfoField,
    ) -> YinResult<(usize, u64)>;

    /// 提取 STREAMINFO 中的 MD5 签名, 必须在 [`StreamInfoField::TotalSamples`] 之后调用
    fn extract_md5_signature(&mut self, input: &[u8]) -> YinResult<(usize, [u8; 16])>;

    /// 解码一帧到 `scratch`, 返回 (消费的字节数, 帧头)
    ///
    /// 没有更多帧时返回 [`YinError::Eof`](yin_core::YinError::Eof).
    /// 成功后 `scratch` 中前 `channels` 个声道的前 `block_size` 个采样有效.
    fn decode_frame(
        &mut self,
        input: &[u8],
        scratch: &mut FrameScratch,
    ) -> YinResult<(usize, FrameHeader)>;

    /// 最近一次成功解码的帧头
    fn frame_header(&self) -> Option<&FrameHeader>;
}
