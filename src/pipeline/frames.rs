//! 帧循环阶段.
//!
//! 引擎的第一次解码失败即视为码流结束. 干净的结尾和损坏的结尾在这里无法区分,
//! 两者的差别交给组装阶段的采样总数核对来发现.

use tracing::{debug, trace};
use yin_flac::{BitstreamEngine, FrameHeader, FrameScratch, StreamInfoField};

use super::Cursor;
use super::assembler::WaveformAssembler;
use super::stream_info::StreamParameters;
use crate::error::DecodeError;

/// 逐帧解码并交给组装器, 返回成功解码的帧数
pub(crate) fn decode_frames<E>(
    engine: &mut E,
    cursor: &mut Cursor<'_>,
    scratch: &mut FrameScratch,
    assembler: &mut WaveformAssembler,
    params: &StreamParameters,
    check_parameters: bool,
) -> Result<u64, DecodeError>
where
    E: BitstreamEngine + ?Sized,
{
    let mut frame_count = 0u64;
    loop {
        let (consumed, header) = match engine.decode_frame(cursor.remaining(), scratch) {
            Ok(decoded) => decoded,
            Err(err) => {
                debug!(
                    "帧循环结束: 偏移 {}, 已解码 {} 帧, 原因: {}",
                    cursor.position(),
                    frame_count,
                    err,
                );
                break;
            }
        };
        cursor.advance(consumed);
        if let Err(err) = FrameScratch::ensure_fits(header.channels, header.block_size) {
            debug!("帧循环结束: 帧头超出暂存区容量: {}", err);
            break;
        }
        trace!(
            "帧 {}: {} 采样, 消费 {} 字节",
            frame_count, header.block_size, consumed,
        );

        if check_parameters {
            check_frame_parameters(frame_count, &header, params)?;
        }
        assembler.push_frame(&header, scratch)?;
        frame_count += 1;
    }
    Ok(frame_count)
}

/// 帧头的采样率、声道数、位深必须与 STREAMINFO 一致
fn check_frame_parameters(
    frame_index: u64,
    header: &FrameHeader,
    params: &StreamParameters,
) -> Result<(), DecodeError> {
    let checks = [
        (StreamInfoField::SampleRate, params.sample_rate, header.sample_rate),
        (StreamInfoField::ChannelCount, params.channels, header.channels),
        (
            StreamInfoField::BitsPerSample,
            params.bits_per_sample,
            header.bits_per_sample,
        ),
    ];
    for (field, expected, actual) in checks {
        if expected != actual {
            return Err(DecodeError::FrameParameterMismatch {
                frame_index,
                field,
                expected: u64::from(expected),
                actual: u64::from(actual),
            });
        }
    }
    Ok(())
}
