//! FLAC 元数据块.
//!
//! 原生 FLAC 流结构:
//! ```text
//! Magic:     "fLaC" (4 bytes)
//! Metadata:  一系列 metadata block, 每块 4 字节块头 + 块体
//!   块头:    is_last (1 bit) + block_type (7 bits) + length (24 bits)
//! Frames:    音频帧序列, 每帧以同步码 0xFFF8 或 0xFFF9 开头
//! ```
//!
//! STREAMINFO 块体 (34 bytes):
//! ```text
//! min_block_size:  16 bits
//! max_block_size:  16 bits
//! min_frame_size:  24 bits
//! max_frame_size:  24 bits
//! sample_rate:     20 bits
//! channels:        3 bits  (channels - 1)
//! bits_per_sample: 5 bits  (bits - 1)
//! total_samples:   36 bits
//! md5:             128 bits
//! ```

use yin_core::{YinError, YinResult};

use crate::engine::StreamInfoField;

/// 原生 FLAC 流标记
pub const STREAM_MARKER: &[u8; 4] = b"fLaC";

/// 元数据块头长度
pub const BLOCK_HEADER_LEN: usize = 4;

/// STREAMINFO 块体长度
pub const STREAM_INFO_LEN: usize = 34;

/// STREAMINFO 中 MD5 签名的起始位偏移
pub const MD5_BIT_OFFSET: usize = 144;

/// FLAC 元数据块类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataBlockType {
    StreamInfo,
    Padding,
    Application,
    SeekTable,
    VorbisComment,
    CueSheet,
    Picture,
    /// 保留类型 (7-126)
    Reserved(u8),
}

impl MetadataBlockType {
    /// 从块头中的 7 位类型码解析, 127 是禁止使用的类型码
    pub fn from_code(code: u8) -> YinResult<Self> {
        Ok(match code {
            0 => Self::StreamInfo,
            1 => Self::Padding,
            2 => Self::Application,
            3 => Self::SeekTable,
            4 => Self::VorbisComment,
            5 => Self::CueSheet,
            6 => Self::Picture,
            7..=126 => Self::Reserved(code),
            _ => {
                return Err(YinError::InvalidData(format!(
                    "无效的 metadata block 类型: {}",
                    code,
                )));
            }
        })
    }
}

/// 元数据块头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataBlockHeader {
    /// 是否为最后一个元数据块
    pub is_last: bool,
    /// 块类型
    pub block_type: MetadataBlockType,
    /// 块体长度 (字节)
    pub length: u32,
}

impl MetadataBlockHeader {
    /// 从 4 字节块头解析
    pub fn parse(data: &[u8]) -> YinResult<Self> {
        let &[first, l0, l1, l2, ..] = data else {
            return Err(YinError::Eof);
        };
        let block_type = MetadataBlockType::from_code(first & 0x7F)?;
        let length = u32::from_be_bytes([0, l0, l1, l2]);
        if block_type == MetadataBlockType::StreamInfo && (length as usize) < STREAM_INFO_LEN {
            return Err(YinError::InvalidData(format!(
                "STREAMINFO 块大小不足: {} < {}",
                length, STREAM_INFO_LEN,
            )));
        }
        Ok(Self {
            is_last: first & 0x80 != 0,
            block_type,
            length,
        })
    }
}

/// STREAMINFO 字段在块体中的位置: (起始位偏移, 位宽)
pub fn stream_info_field_bits(field: StreamInfoField) -> (usize, u32) {
    match field {
        StreamInfoField::MinBlockSize => (0, 16),
        StreamInfoField::MaxBlockSize => (16, 16),
        StreamInfoField::MinFrameSize => (32, 24),
        StreamInfoField::MaxFrameSize => (56, 24),
        StreamInfoField::SampleRate => (80, 20),
        StreamInfoField::ChannelCount => (100, 3),
        StreamInfoField::BitsPerSample => (103, 5),
        StreamInfoField::TotalSamples => (108, 36),
    }
}
