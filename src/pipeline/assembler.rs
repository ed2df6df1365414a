//! 波形组装阶段.
//!
//! 输出缓冲区按 `total_samples × channels` 一次性预留, 之后只追加不扩容.
//! 一帧如果会写出预留容量之外, 立即报告采样数不匹配.

use yin_flac::{FrameHeader, FrameScratch, StreamInfoField};

use super::stream_info::StreamParameters;
use crate::error::DecodeError;

pub(crate) struct WaveformAssembler {
    samples: Vec<i32>,
    expected: usize,
}

impl WaveformAssembler {
    /// 按流参数预留输出缓冲区
    ///
    /// 声明的总数超出 `max_output_samples` 或无法分配时返回
    /// [`DecodeError::InvalidStreamParameters`].
    pub(crate) fn new(
        params: &StreamParameters,
        max_output_samples: Option<u64>,
    ) -> Result<Self, DecodeError> {
        let too_large = || DecodeError::InvalidStreamParameters {
            field: StreamInfoField::TotalSamples,
            value: params.total_samples,
        };

        let expected = params
            .output_len()
            .filter(|&len| max_output_samples.is_none_or(|max| len <= max))
            .and_then(|len| usize::try_from(len).ok())
            .ok_or_else(too_large)?;

        let mut samples = Vec::new();
        samples.try_reserve_exact(expected).map_err(|_| too_large())?;
        Ok(Self { samples, expected })
    }

    /// 把暂存区中的一帧按声道交错追加到输出
    pub(crate) fn push_frame(
        &mut self,
        header: &FrameHeader,
        scratch: &FrameScratch,
    ) -> Result<(), DecodeError> {
        let block_size = header.block_size as usize;
        let channels = header.channels as usize;
        let written = self.samples.len() + block_size * channels;
        if written > self.expected {
            return Err(DecodeError::SampleCountMismatch {
                expected: self.expected as u64,
                decoded: written as u64,
            });
        }

        for i in 0..block_size {
            for ch in 0..channels {
                self.samples.push(scratch.channel(ch)[i]);
            }
        }
        Ok(())
    }

    /// 核对采样总数, 返回交错采样
    pub(crate) fn finish(self) -> Result<Vec<i32>, DecodeError> {
        if self.samples.len() != self.expected {
            return Err(DecodeError::SampleCountMismatch {
                expected: self.expected as u64,
                decoded: self.samples.len() as u64,
            });
        }
        Ok(self.samples)
    }
}
