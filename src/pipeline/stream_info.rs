//! 流参数提取阶段.
//!
//! 依次检查每个元数据块: STREAMINFO 按顺序逐字段读取并校验, 其他块直接跳过.
//! 读到 STREAMINFO 后立即返回, 之后的元数据块由引擎在解码首帧前跳过.

use tracing::{debug, trace, warn};
use yin_flac::{BitstreamEngine, MAX_CHANNELS, StreamInfoField};

use super::Cursor;
use crate::error::DecodeError;

/// 支持的最小位深
pub const MIN_BITS_PER_SAMPLE: u32 = 4;
/// 支持的最大位深
pub const MAX_BITS_PER_SAMPLE: u32 = 32;

/// STREAMINFO 中与解码相关的参数, 提取后不再改变
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParameters {
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道数 (1-8)
    pub channels: u32,
    /// 位深 (4-32)
    pub bits_per_sample: u32,
    /// 每声道总采样数
    pub total_samples: u64,
}

impl StreamParameters {
    /// 从原始字段值构造并校验
    pub fn validate(
        sample_rate: u64,
        channels: u64,
        bits_per_sample: u64,
        total_samples: u64,
    ) -> Result<Self, DecodeError> {
        let invalid = |field, value| DecodeError::InvalidStreamParameters { field, value };

        let sample_rate = u32::try_from(sample_rate)
            .ok()
            .filter(|&rate| rate != 0)
            .ok_or_else(|| invalid(StreamInfoField::SampleRate, sample_rate))?;

        let channels = u32::try_from(channels)
            .ok()
            .filter(|&ch| (1..=MAX_CHANNELS as u32).contains(&ch))
            .ok_or_else(|| invalid(StreamInfoField::ChannelCount, channels))?;

        let bits_per_sample = u32::try_from(bits_per_sample)
            .ok()
            .filter(|bits| (MIN_BITS_PER_SAMPLE..=MAX_BITS_PER_SAMPLE).contains(bits))
            .ok_or_else(|| invalid(StreamInfoField::BitsPerSample, bits_per_sample))?;

        if total_samples == 0 {
            return Err(invalid(StreamInfoField::TotalSamples, total_samples));
        }

        Ok(Self {
            sample_rate,
            channels,
            bits_per_sample,
            total_samples,
        })
    }

    /// 输出缓冲区需要容纳的采样总数 (所有声道)
    pub fn output_len(&self) -> Option<u64> {
        self.total_samples.checked_mul(u64::from(self.channels))
    }
}

/// 提取结果
pub(crate) struct StreamInfo {
    pub params: StreamParameters,
    /// 仅在请求 MD5 校验且签名非全零时存在
    pub md5_signature: Option<[u8; 16]>,
}

/// 遍历元数据块, 找到 STREAMINFO 并提取流参数
pub(crate) fn extract<E>(
    engine: &mut E,
    cursor: &mut Cursor<'_>,
    want_md5: bool,
) -> Result<StreamInfo, DecodeError>
where
    E: BitstreamEngine + ?Sized,
{
    while engine.is_at_metadata_block() {
        if engine.is_stream_info_block() {
            return read_stream_info(engine, cursor, want_md5);
        }
        trace!("跳过非 STREAMINFO 元数据块");
        match engine.sync(cursor.remaining()) {
            Ok(consumed) => cursor.advance(consumed),
            Err(err) => {
                debug!("跳过元数据块失败: {}", err);
                break;
            }
        }
    }
    Err(DecodeError::StreamInfoNotFound)
}

fn read_stream_info<E>(
    engine: &mut E,
    cursor: &mut Cursor<'_>,
    want_md5: bool,
) -> Result<StreamInfo, DecodeError>
where
    E: BitstreamEngine + ?Sized,
{
    let mut read = |field| {
        let (consumed, value) = engine
            .extract_stream_info_field(cursor.remaining(), field)
            .map_err(|source| DecodeError::StreamInfoExtraction { field, source })?;
        cursor.advance(consumed);
        Ok::<_, DecodeError>(value)
    };

    let sample_rate = read(StreamInfoField::SampleRate)?;
    let channels = read(StreamInfoField::ChannelCount)?;
    let bits_per_sample = read(StreamInfoField::BitsPerSample)?;
    let total_samples = read(StreamInfoField::TotalSamples)?;
    let params = StreamParameters::validate(sample_rate, channels, bits_per_sample, total_samples)?;

    let md5_signature = if want_md5 {
        read_md5(engine, cursor)
    } else {
        None
    };

    Ok(StreamInfo {
        params,
        md5_signature,
    })
}

/// 读取 MD5 签名; 读取失败或签名全零时跳过校验
fn read_md5<E>(engine: &mut E, cursor: &mut Cursor<'_>) -> Option<[u8; 16]>
where
    E: BitstreamEngine + ?Sized,
{
    match engine.extract_md5_signature(cursor.remaining()) {
        Ok((consumed, signature)) => {
            cursor.advance(consumed);
            if signature == [0; 16] {
                debug!("STREAMINFO 未记录 MD5 签名, 跳过校验");
                None
            } else {
                Some(signature)
            }
        }
        Err(err) => {
            warn!("读取 MD5 签名失败, 跳过校验: {}", err);
            None
        }
    }
}
