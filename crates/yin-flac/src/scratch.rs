//! 帧级暂存缓冲区.
//!
//! 每次解码分配一次, 在所有帧之间复用, 避免逐帧分配堆内存.

use yin_core::{YinError, YinResult};

/// 最大声道数
pub const MAX_CHANNELS: usize = 8;

/// 每帧每声道的最大采样数
pub const MAX_BLOCK_SIZE: usize = 65_535;

/// 按声道划分的固定容量暂存区
///
/// 只有最近一帧的前 `channels` 个声道、前 `block_size` 个采样是有效数据,
/// 其余位置可能残留上一帧的内容.
pub struct FrameScratch {
    channels: Vec<Vec<i32>>,
}

impl FrameScratch {
    /// 分配 `MAX_CHANNELS` 个容量为 `MAX_BLOCK_SIZE` 的声道槽位
    pub fn new() -> Self {
        Self {
            channels: (0..MAX_CHANNELS).map(|_| vec![0; MAX_BLOCK_SIZE]).collect(),
        }
    }

    /// 检查一帧的尺寸能否放进暂存区
    pub fn ensure_fits(channels: u32, block_size: u32) -> YinResult<()> {
        if channels as usize > MAX_CHANNELS {
            return Err(YinError::CapacityExceeded(format!(
                "声道数 {} 超过上限 {}",
                channels, MAX_CHANNELS,
            )));
        }
        if block_size as usize > MAX_BLOCK_SIZE {
            return Err(YinError::CapacityExceeded(format!(
                "块大小 {} 超过上限 {}",
                block_size, MAX_BLOCK_SIZE,
            )));
        }
        Ok(())
    }

    /// 只读访问某个声道槽位
    pub fn channel(&self, index: usize) -> &[i32] {
        &self.channels[index]
    }

    /// 可写访问某个声道槽位
    pub fn channel_mut(&mut self, index: usize) -> &mut [i32] {
        &mut self.channels[index]
    }

    /// 同时可写访问前两个声道 (立体声去相关使用)
    pub fn stereo_mut(&mut self) -> (&mut [i32], &mut [i32]) {
        let (first, rest) = self.channels.split_at_mut(1);
        (&mut first[0], &mut rest[0])
    }
}

impl Default for FrameScratch {
    fn default() -> Self {
        Self::new()
    }
}
