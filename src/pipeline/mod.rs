//! 流式解码管线.
//!
//! 四个阶段顺序执行, 共用同一个输入游标和同一个引擎实例:
//!
//! 1. 同步 (`sync`): 定位码流起点
//! 2. 流参数提取 (`stream_info`): 遍历元数据块, 读取并校验 STREAMINFO
//! 3. 帧循环 (`frames`): 逐帧解码到暂存区, 直到无法再解码
//! 4. 波形组装 (`assembler`): 交错写入预分配的输出, 最后核对采样总数
//!
//! 每个阶段只消费剩余输入的前缀, 游标只前进不回退.

mod assembler;
mod checksum;
mod frames;
mod stream_info;
mod sync;

use tracing::debug;
use yin_flac::{BitstreamEngine, FrameScratch};

use crate::error::DecodeError;
use crate::options::DecodeOptions;
use crate::waveform::Waveform;

pub use stream_info::StreamParameters;

use assembler::WaveformAssembler;

/// 输入游标
pub(crate) struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// 游标之后的剩余输入
    pub(crate) fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// 前进 `n` 字节, 不会越过输入末尾
    pub(crate) fn advance(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n).min(self.input.len());
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }
}

/// 执行完整的解码管线
pub(crate) fn run<E>(
    engine: &mut E,
    input: &[u8],
    options: &DecodeOptions,
) -> Result<Waveform, DecodeError>
where
    E: BitstreamEngine + ?Sized,
{
    if input.is_empty() {
        return Err(DecodeError::EmptyInput);
    }

    engine.reset();
    let mut cursor = Cursor::new(input);

    sync::synchronize(engine, &mut cursor)?;

    let stream_info = stream_info::extract(engine, &mut cursor, options.verify_md5)?;
    let params = stream_info.params;
    debug!(
        "流参数: {} Hz, {} 声道, {} 位, 每声道 {} 采样",
        params.sample_rate, params.channels, params.bits_per_sample, params.total_samples,
    );

    let mut assembler = WaveformAssembler::new(&params, options.max_output_samples)?;
    let mut scratch = FrameScratch::new();
    let frame_count = frames::decode_frames(
        engine,
        &mut cursor,
        &mut scratch,
        &mut assembler,
        &params,
        options.check_frame_parameters,
    )?;
    if frame_count == 0 {
        return Err(DecodeError::NoFramesDecoded);
    }

    let samples = assembler.finish()?;
    debug!(
        "解码完成: {} 帧, {} 个采样, 消费 {} / {} 字节",
        frame_count,
        samples.len(),
        cursor.position(),
        input.len(),
    );

    if let Some(signature) = stream_info.md5_signature {
        checksum::verify(&signature, &samples, params.bits_per_sample)?;
    }

    Ok(Waveform::new(
        params.channels,
        params.sample_rate,
        params.bits_per_sample,
        samples,
    ))
}
