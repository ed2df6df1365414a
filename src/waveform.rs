//! 解码结果.

/// 解码后的完整波形
///
/// 采样按声道交错存放: `[c0s0, c1s0, ..., c0s1, c1s1, ...]`.
/// 采样值保持码流中的原始幅度, 不按位深缩放.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waveform {
    channels: u32,
    sample_rate: u32,
    source_bit_depth: u32,
    samples: Vec<i32>,
}

impl Waveform {
    pub(crate) fn new(
        channels: u32,
        sample_rate: u32,
        source_bit_depth: u32,
        samples: Vec<i32>,
    ) -> Self {
        Self {
            channels,
            sample_rate,
            source_bit_depth,
            samples,
        }
    }

    /// 声道数
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// 采样率 (Hz)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// 码流中声明的位深
    pub fn source_bit_depth(&self) -> u32 {
        self.source_bit_depth
    }

    /// 交错采样
    pub fn samples(&self) -> &[i32] {
        &self.samples
    }

    /// 每声道采样数
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// 取出交错采样
    pub fn into_samples(self) -> Vec<i32> {
        self.samples
    }
}
